//! # Codec Module
//!
//! Paired encoder/decoders keyed by MIME type, with content negotiation.
//!
//! ## Overview
//!
//! A [`Codec`] owns one wire format: the MIME types it answers to, a format
//! suffix for URL overrides (`.json`, `.yaml`), and the encode/decode pair.
//! The [`CodecRegistry`] is populated once at startup and read-only during
//! request handling: process-wide shared state safe for unsynchronized
//! concurrent reads.
//!
//! ## Negotiation
//!
//! Encoder precedence: explicit format override (URL suffix) > `Accept`
//! header > the resource's default format > the registry default (JSON).
//! Accept entries are ranked by q-value then specificity; `type/*` and
//! `*/*` wildcards match after exact types. A decoder is chosen purely from
//! `Content-Type`; a body with no usable Content-Type is an
//! `UnsupportedMediaType` failure.

mod form;
mod json;
mod yaml;

pub use form::FormCodec;
pub use json::JsonCodec;
pub use yaml::YamlCodec;

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Paired encoder/decoder for one wire format.
pub trait Codec: Send + Sync {
    /// MIME types this codec answers to. The first entry is canonical.
    fn mimetypes(&self) -> &[&'static str];

    /// Format suffix used for URL overrides (e.g. `json`).
    fn format(&self) -> &'static str;

    /// Content-Type emitted with encoded payloads.
    fn content_type(&self) -> &'static str {
        self.mimetypes()[0]
    }

    /// Whether this codec handles the given MIME type (no wildcards here;
    /// `Content-Type` is always concrete).
    fn can_handle(&self, mimetype: &str) -> bool {
        self.mimetypes()
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mimetype))
    }

    /// Serialize a prepared payload.
    fn encode(&self, payload: &Value) -> Result<Vec<u8>>;

    /// Parse a request body into a value. Malformed input is a `BadRequest`.
    fn decode(&self, body: &[u8]) -> Result<Value>;
}

/// Registry of codecs, initialized once and read-only afterwards.
pub struct CodecRegistry {
    codecs: Vec<Arc<dyn Codec>>,
    default: usize,
}

impl CodecRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        CodecRegistry {
            codecs: Vec::new(),
            default: 0,
        }
    }

    /// Registry with the stock codecs: JSON (default), YAML, form.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = CodecRegistry::new();
        registry.register(Arc::new(JsonCodec));
        registry.register(Arc::new(YamlCodec));
        registry.register(Arc::new(FormCodec));
        registry
    }

    /// Register a codec. The first registered codec is the default.
    pub fn register(&mut self, codec: Arc<dyn Codec>) {
        debug!(format = codec.format(), "Codec registered");
        self.codecs.push(codec);
    }

    /// Make the codec with the given format suffix the registry default.
    pub fn set_default(&mut self, format: &str) {
        if let Some(idx) = self.codecs.iter().position(|c| c.format() == format) {
            self.default = idx;
        }
    }

    /// The registry default codec.
    ///
    /// # Panics
    ///
    /// Panics if the registry is empty; `with_defaults()` never is.
    #[must_use]
    pub fn default_codec(&self) -> Arc<dyn Codec> {
        Arc::clone(&self.codecs[self.default])
    }

    /// Format suffixes of every registered codec.
    #[must_use]
    pub fn formats(&self) -> Vec<String> {
        self.codecs.iter().map(|c| c.format().to_string()).collect()
    }

    /// Look up a codec by its format suffix.
    #[must_use]
    pub fn by_format(&self, format: &str) -> Option<Arc<dyn Codec>> {
        self.codecs
            .iter()
            .find(|c| c.format() == format)
            .map(Arc::clone)
    }

    /// Choose a decoder from a `Content-Type` header value.
    pub fn find_decoder(&self, content_type: &str) -> Result<Arc<dyn Codec>> {
        let mimetype = content_type.split(';').next().unwrap_or("").trim();
        self.codecs
            .iter()
            .find(|c| c.can_handle(mimetype))
            .map(Arc::clone)
            .ok_or(Error::UnsupportedMediaType)
    }

    /// Choose an encoder.
    ///
    /// Precedence: explicit `format` override, then the `Accept` header,
    /// then `default_format`, then the registry default.
    pub fn find_encoder(
        &self,
        format: Option<&str>,
        accept: Option<&str>,
        default_format: Option<&str>,
    ) -> Result<Arc<dyn Codec>> {
        if let Some(fmt) = format {
            return self.by_format(fmt).ok_or_else(|| Error::NotAcceptable {
                available: self.formats(),
            });
        }
        if let Some(accept) = accept.filter(|a| !a.trim().is_empty()) {
            return self.negotiate(accept).ok_or_else(|| Error::NotAcceptable {
                available: self.formats(),
            });
        }
        if let Some(fmt) = default_format {
            if let Some(codec) = self.by_format(fmt) {
                return Ok(codec);
            }
        }
        Ok(self.default_codec())
    }

    /// Best-match negotiation against an `Accept` header.
    fn negotiate(&self, accept: &str) -> Option<Arc<dyn Codec>> {
        let mut entries: Vec<(String, f32)> = accept
            .split(',')
            .filter_map(|entry| {
                let mut parts = entry.split(';');
                let mimetype = parts.next()?.trim().to_ascii_lowercase();
                if mimetype.is_empty() {
                    return None;
                }
                let q = parts
                    .filter_map(|p| p.trim().strip_prefix("q="))
                    .find_map(|v| v.parse::<f32>().ok())
                    .unwrap_or(1.0);
                Some((mimetype, q))
            })
            .collect();
        // q-value first, exact types ahead of wildcards on ties
        entries.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| specificity(&b.0).cmp(&specificity(&a.0)))
        });

        for (pattern, q) in &entries {
            if *q <= 0.0 {
                continue;
            }
            for codec in &self.codecs {
                if codec.mimetypes().iter().any(|m| mime_match(pattern, m)) {
                    return Some(Arc::clone(codec));
                }
            }
        }
        None
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn specificity(pattern: &str) -> u8 {
    if pattern == "*/*" {
        0
    } else if pattern.ends_with("/*") {
        1
    } else {
        2
    }
}

fn mime_match(pattern: &str, mimetype: &str) -> bool {
    if pattern == "*/*" {
        return true;
    }
    if let Some(main) = pattern.strip_suffix("/*") {
        return mimetype
            .split('/')
            .next()
            .is_some_and(|m| m.eq_ignore_ascii_case(main));
    }
    pattern.eq_ignore_ascii_case(mimetype)
}

/// The process-wide default registry (JSON, YAML, form), initialized on
/// first use and never mutated afterwards.
#[must_use]
pub fn default_registry() -> &'static CodecRegistry {
    static REGISTRY: Lazy<CodecRegistry> = Lazy::new(CodecRegistry::with_defaults);
    &REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_override_beats_accept() {
        let registry = CodecRegistry::with_defaults();
        let codec = registry
            .find_encoder(Some("yaml"), Some("application/json"), None)
            .unwrap();
        assert_eq!(codec.format(), "yaml");
    }

    #[test]
    fn test_accept_q_values_rank_entries() {
        let registry = CodecRegistry::with_defaults();
        let codec = registry
            .find_encoder(None, Some("application/json;q=0.2, application/yaml;q=0.9"), None)
            .unwrap();
        assert_eq!(codec.format(), "yaml");
    }

    #[test]
    fn test_wildcard_accept_matches_first_registered() {
        let registry = CodecRegistry::with_defaults();
        let codec = registry.find_encoder(None, Some("*/*"), None).unwrap();
        assert_eq!(codec.format(), "json");
    }

    #[test]
    fn test_unmatched_accept_is_not_acceptable() {
        let registry = CodecRegistry::with_defaults();
        let err = registry
            .find_encoder(None, Some("image/png"), None)
            .err()
            .unwrap();
        assert_eq!(err.status(), 406);
    }

    #[test]
    fn test_decoder_from_content_type_with_params() {
        let registry = CodecRegistry::with_defaults();
        let codec = registry
            .find_decoder("application/json; charset=utf-8")
            .unwrap();
        assert_eq!(codec.format(), "json");
    }

    #[test]
    fn test_unknown_content_type_is_unsupported() {
        let registry = CodecRegistry::with_defaults();
        let err = registry.find_decoder("application/msgpack").err().unwrap();
        assert_eq!(err.status(), 415);
    }
}
