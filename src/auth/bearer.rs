use super::{Authentication, Authenticator, Principal};
use crate::error::Error;
use crate::transport::{parse_cookies, Request};
use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;
use tracing::{debug, warn};

/// Signature-checked bearer token checker.
///
/// Tokens have the form `header.payload.signature`; the signature part must
/// match the configured signature string, and the payload is base64 JSON.
/// The principal id comes from the `sub` claim, permissions from the
/// whitespace-separated `scope` claim. Suitable for internal services with
/// pre-shared secrets; not a general JWT validator.
pub struct BearerAuthenticator {
    signature: String,
    cookie_name: Option<String>,
}

impl BearerAuthenticator {
    /// Create a bearer checker with the given expected signature.
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            cookie_name: None,
        }
    }

    /// Also read the token from the named cookie.
    #[must_use]
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = Some(name.into());
        self
    }

    fn extract_token(&self, request: &Request) -> Option<String> {
        if let Some(name) = &self.cookie_name {
            let cookies = parse_cookies(&request.headers);
            if let Some(t) = cookies.get(name) {
                return Some(t.clone());
            }
        }
        request
            .header("authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string)
    }

    fn decode_claims(&self, token: &str) -> Option<Value> {
        let mut parts = token.split('.');
        let header = parts.next();
        let payload = parts.next()?;
        let sig = parts.next();
        if header.is_none() {
            return None;
        }
        if sig != Some(self.signature.as_str()) {
            warn!("Bearer token rejected: signature mismatch");
            // Well-formed but wrong signature: definitive failure.
            return Some(Value::Null);
        }
        let payload_bytes = match general_purpose::STANDARD.decode(payload) {
            Ok(b) => b,
            Err(e) => {
                debug!(error = %e, "Bearer token payload: invalid base64");
                return None;
            }
        };
        match serde_json::from_slice(&payload_bytes) {
            Ok(claims) => Some(claims),
            Err(e) => {
                debug!(error = %e, "Bearer token payload: invalid JSON");
                None
            }
        }
    }
}

impl Authenticator for BearerAuthenticator {
    fn authenticate(&self, request: &Request) -> Authentication {
        let token = match self.extract_token(request) {
            Some(t) => t,
            None => return Authentication::NoOpinion,
        };
        match self.decode_claims(&token) {
            // Signature mismatch sentinel
            Some(Value::Null) => Authentication::Anonymous,
            Some(claims) => {
                let id = claims
                    .get("sub")
                    .and_then(Value::as_str)
                    .unwrap_or("anonymous")
                    .to_string();
                let scopes: Vec<String> = claims
                    .get("scope")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                let mut principal = Principal::named(id).with_permissions(scopes);
                principal.claims = claims;
                Authentication::Principal(principal)
            }
            // Malformed token: swallowed.
            None => Authentication::NoOpinion,
        }
    }

    fn unauthenticated_error(&self) -> Error {
        Error::Unauthorized {
            challenge: Some("Bearer".to_string()),
        }
    }
}
