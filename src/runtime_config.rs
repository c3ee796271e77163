//! # Runtime Configuration Module
//!
//! Environment variable-based configuration for runtime behavior.
//!
//! ## Environment Variables
//!
//! ### `DECLAREST_DEBUG`
//!
//! When set to `1` or `true`, unexpected failures put their cause chain into
//! the 500 response body instead of a generic message. Never enable in
//! production.
//!
//! ### `DECLAREST_PAGE_LENGTH`
//!
//! Default pagination window length used when a request carries no `Range`
//! header. Default: `20`.
//!
//! ### `DECLAREST_RANGE_WORD`
//!
//! The range unit word accepted in `Range` headers and advertised in
//! `Accept-Ranges`. Default: `objects`.

use std::env;

/// Runtime configuration loaded from environment variables.
///
/// Load this at startup using [`RuntimeConfig::from_env()`]; the value is
/// then read-only for the life of the process.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Expose unexpected-error detail in 500 bodies (default: false)
    pub debug: bool,
    /// Default pagination window length (default: 20)
    pub page_length: usize,
    /// Pagination range unit word (default: "objects")
    pub range_word: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            debug: false,
            page_length: 20,
            range_word: "objects".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = RuntimeConfig::default();
        let debug = match env::var("DECLAREST_DEBUG") {
            Ok(val) => val == "1" || val.eq_ignore_ascii_case("true"),
            Err(_) => defaults.debug,
        };
        let page_length = env::var("DECLAREST_PAGE_LENGTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.page_length);
        let range_word = env::var("DECLAREST_RANGE_WORD").unwrap_or(defaults.range_word);
        RuntimeConfig {
            debug,
            page_length,
            range_word,
        }
    }
}
