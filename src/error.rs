//! Domain error taxonomy.
//!
//! Every failure the framework produces carries an HTTP status and an
//! optional structured body and headers. Errors propagate with `?` through
//! the dispatch pipeline and are converted to a [`crate::transport::Response`]
//! exactly once, at the dispatch boundary.

use crate::transport::HeaderVec;
use http::Method;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The discriminated failure hierarchy.
///
/// All variants are terminal for the current request; the framework never
/// retries. Unexpected failures travel as [`Error::Internal`] and map to a
/// generic 500 unless debug mode asks for the detail.
pub enum Error {
    /// Malformed input: bad body, failed validation, bad filter or range.
    /// `errors` is a structured detail object, typically field-keyed.
    BadRequest { errors: Value },
    /// Authentication failed and a credential challenge is appropriate.
    Unauthorized { challenge: Option<String> },
    /// Authenticated but not permitted.
    Forbidden { detail: Option<String> },
    /// Unknown identifier, unknown sub-resource field, or empty single read.
    NotFound,
    /// Verb understood but not permitted at this access granularity.
    MethodNotAllowed { allow: Vec<Method> },
    /// No encoder satisfies the Accept header / format override.
    NotAcceptable { available: Vec<String> },
    /// No decoder matches the request Content-Type.
    UnsupportedMediaType,
    /// Verb or operation recognized but unsupported by this resource.
    NotImplemented { what: String },
    /// Anything unexpected. Carried for the catch-all at the boundary.
    Internal(anyhow::Error),
}

impl Error {
    /// A `BadRequest` with a single detail message.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest {
            errors: json!({ "detail": [message.into()] }),
        }
    }

    /// A `BadRequest` carrying field-level validation detail.
    #[must_use]
    pub fn validation(errors: Value) -> Self {
        Error::BadRequest { errors }
    }

    /// A `Forbidden` with a detail message.
    #[must_use]
    pub fn forbidden(detail: impl Into<String>) -> Self {
        Error::Forbidden {
            detail: Some(detail.into()),
        }
    }

    /// A `NotImplemented` naming the missing verb or operation.
    #[must_use]
    pub fn not_implemented(what: impl Into<String>) -> Self {
        Error::NotImplemented { what: what.into() }
    }

    /// HTTP status code for this failure.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Error::BadRequest { .. } => 400,
            Error::Unauthorized { .. } => 401,
            Error::Forbidden { .. } => 403,
            Error::NotFound => 404,
            Error::MethodNotAllowed { .. } => 405,
            Error::NotAcceptable { .. } => 406,
            Error::UnsupportedMediaType => 415,
            Error::Internal(_) => 500,
            Error::NotImplemented { .. } => 501,
        }
    }

    /// Structured response body, if this failure carries one.
    ///
    /// `debug` controls whether an internal error exposes its cause chain
    /// instead of the generic message.
    #[must_use]
    pub fn body(&self, debug: bool) -> Option<Value> {
        match self {
            Error::BadRequest { errors } => Some(errors.clone()),
            Error::Unauthorized { .. } => Some(json!({ "error": "unauthorized" })),
            Error::Forbidden { detail } => Some(match detail {
                Some(d) => json!({ "error": d }),
                None => json!({ "error": "forbidden" }),
            }),
            Error::NotFound => Some(json!({ "error": "not found" })),
            Error::MethodNotAllowed { allow } => Some(json!({
                "error": "method not allowed",
                "allow": allow.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
            })),
            Error::NotAcceptable { available } => Some(json!({
                "error": "no matching encoder",
                "available": available,
            })),
            Error::UnsupportedMediaType => Some(json!({ "error": "no matching decoder" })),
            Error::NotImplemented { what } => Some(json!({ "error": format!("{what} is not implemented") })),
            Error::Internal(cause) => Some(if debug {
                json!({ "error": format!("{cause:#}") })
            } else {
                json!({ "error": "internal server error" })
            }),
        }
    }

    /// Response headers this failure mandates (`Allow`, `WWW-Authenticate`).
    #[must_use]
    pub fn headers(&self) -> HeaderVec {
        let mut headers = HeaderVec::new();
        match self {
            Error::MethodNotAllowed { allow } => {
                let list = allow
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                headers.push((Arc::from("allow"), list));
            }
            Error::Unauthorized {
                challenge: Some(ch),
            } => {
                headers.push((Arc::from("www-authenticate"), ch.clone()));
            }
            _ => {}
        }
        headers
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadRequest { errors } => write!(f, "bad request: {errors}"),
            Error::Unauthorized { .. } => write!(f, "unauthorized"),
            Error::Forbidden { detail } => match detail {
                Some(d) => write!(f, "forbidden: {d}"),
                None => write!(f, "forbidden"),
            },
            Error::NotFound => write!(f, "not found"),
            Error::MethodNotAllowed { allow } => {
                write!(f, "method not allowed (allow: {allow:?})")
            }
            Error::NotAcceptable { available } => {
                write!(f, "not acceptable (available: {available:?})")
            }
            Error::UnsupportedMediaType => write!(f, "unsupported media type"),
            Error::NotImplemented { what } => write!(f, "{what} is not implemented"),
            Error::Internal(cause) => write!(f, "internal error: {cause}"),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self} [{}]", self.status())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Internal(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(cause: anyhow::Error) -> Self {
        Error::Internal(cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::bad_request("x").status(), 400);
        assert_eq!(Error::NotFound.status(), 404);
        assert_eq!(Error::UnsupportedMediaType.status(), 415);
        assert_eq!(Error::not_implemented("TRACE").status(), 501);
    }

    #[test]
    fn test_method_not_allowed_carries_allow_header() {
        let err = Error::MethodNotAllowed {
            allow: vec![Method::GET, Method::POST],
        };
        let headers = err.headers();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].1, "GET, POST");
    }

    #[test]
    fn test_internal_body_respects_debug() {
        let err = Error::Internal(anyhow::anyhow!("boom"));
        let opaque = err.body(false).unwrap();
        assert_eq!(opaque["error"], "internal server error");
        let detailed = err.body(true).unwrap();
        assert!(detailed["error"].as_str().unwrap().contains("boom"));
    }
}
