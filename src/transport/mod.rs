//! # Transport Module
//!
//! Narrow request/response wrapper types for the web-server boundary.
//!
//! The framework does not ship an HTTP server; the embedding server (or a
//! test) builds a [`Request`] from whatever it parsed off the wire and gets a
//! [`Response`] back from [`crate::api::Api::dispatch`]. Header keys are
//! lowercased on construction so lookups are case-insensitive per RFC 7230.

mod request;
mod response;

pub use request::{parse_cookies, parse_query_params, Request};
pub use response::{status_reason, HeaderVec, Response, MAX_INLINE_HEADERS};
