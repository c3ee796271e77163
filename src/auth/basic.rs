use super::{Authentication, Authenticator, Principal};
use crate::error::Error;
use crate::transport::Request;
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;
use tracing::debug;

/// Credential lookup: username + password to a principal, or `None` when the
/// pair is rejected.
pub type CredentialCheck = Arc<dyn Fn(&str, &str) -> Option<Principal> + Send + Sync>;

/// HTTP Basic checker.
///
/// Reads `Authorization: Basic <base64(user:pass)>` and hands the decoded
/// pair to the configured lookup. A present-but-rejected pair is a
/// definitive failure; a malformed header is no opinion.
pub struct BasicAuthenticator {
    realm: String,
    check: CredentialCheck,
}

impl BasicAuthenticator {
    /// Create a Basic checker for the given realm.
    pub fn new(realm: impl Into<String>, check: CredentialCheck) -> Self {
        Self {
            realm: realm.into(),
            check,
        }
    }

    fn extract_pair(&self, request: &Request) -> Option<(String, String)> {
        let header = request.header("authorization")?;
        let encoded = header.strip_prefix("Basic ")?;
        let decoded = match general_purpose::STANDARD.decode(encoded.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(error = %e, "Basic credentials: invalid base64");
                return None;
            }
        };
        let text = match String::from_utf8(decoded) {
            Ok(t) => t,
            Err(e) => {
                debug!(error = %e, "Basic credentials: invalid UTF-8");
                return None;
            }
        };
        let (user, pass) = text.split_once(':')?;
        Some((user.to_string(), pass.to_string()))
    }
}

impl Authenticator for BasicAuthenticator {
    fn authenticate(&self, request: &Request) -> Authentication {
        match self.extract_pair(request) {
            Some((user, pass)) => match (self.check)(&user, &pass) {
                Some(principal) => Authentication::Principal(principal),
                None => Authentication::Anonymous,
            },
            // Missing or malformed header: swallowed, next checker decides.
            None => Authentication::NoOpinion,
        }
    }

    fn unauthenticated_error(&self) -> Error {
        Error::Unauthorized {
            challenge: Some(format!("Basic realm=\"{}\"", self.realm)),
        }
    }
}
