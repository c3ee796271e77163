//! Range-header pagination.
//!
//! Requests window collections with `Range: <word>=<spec>` where `<spec>` is
//! a single index (`objects=4`), a suffix (`objects=4-`), a prefix
//! (`objects=-4`, the first four), or an inclusive range (`objects=2-4`).
//! Responses carry `Content-Range: start-end/total` and
//! `Accept-Ranges: <word>`. Multiple comma-separated ranges are not
//! implemented and raise the 501-class failure.

use crate::error::{Error, Result};
use crate::transport::HeaderVec;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Windowing of collection reads driven by the `Range` header.
#[derive(Debug, Clone)]
pub struct Paginator {
    /// Range unit word accepted and advertised (default: `objects`)
    pub word: String,
    /// Window length when no `Range` header is present
    pub default_length: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Paginator {
            word: "objects".to_string(),
            default_length: 20,
        }
    }
}

impl Paginator {
    /// Create a paginator with the given range word and default length.
    #[must_use]
    pub fn new(word: impl Into<String>, default_length: usize) -> Self {
        Paginator {
            word: word.into(),
            default_length,
        }
    }

    /// Window `items` per the optional `Range` header.
    ///
    /// Returns the window and the response headers describing it.
    pub fn paginate(
        &self,
        items: Vec<Value>,
        range_header: Option<&str>,
    ) -> Result<(Vec<Value>, HeaderVec)> {
        let total = items.len();
        let (start, end) = match range_header {
            Some(header) => self.parse(header, total)?,
            None => (0, self.default_length.saturating_sub(1)),
        };

        let window: Vec<Value> = items
            .into_iter()
            .skip(start)
            .take(end.saturating_sub(start) + 1)
            .collect();

        let reported_end = if total == 0 {
            0
        } else {
            end.min(total - 1)
        };
        let mut headers = HeaderVec::new();
        headers.push((
            Arc::from("content-range"),
            format!("{start}-{reported_end}/{total}"),
        ));
        headers.push((Arc::from("accept-ranges"), self.word.clone()));

        debug!(
            start = start,
            end = reported_end,
            total = total,
            window = window.len(),
            "Collection paginated"
        );
        Ok((window, headers))
    }

    /// Parse `word=spec` into an inclusive `(start, end)` window.
    fn parse(&self, header: &str, total: usize) -> Result<(usize, usize)> {
        let (word, spec) = header
            .split_once('=')
            .ok_or_else(|| Error::bad_request("malformed range header"))?;
        if word.trim() != self.word {
            return Err(Error::bad_request(format!(
                "unsupported range unit `{}`",
                word.trim()
            )));
        }
        let spec = spec.trim();
        if spec.contains(',') {
            return Err(Error::not_implemented("multiple ranges"));
        }

        let parse_index = |s: &str| -> Result<usize> {
            s.parse()
                .map_err(|_| Error::bad_request(format!("malformed range spec `{spec}`")))
        };

        if let Some(prefix) = spec.strip_prefix('-') {
            // -N: the first N items
            let n = parse_index(prefix)?;
            if n == 0 {
                return Err(Error::bad_request("zero-length range"));
            }
            return Ok((0, n - 1));
        }
        if let Some(suffix) = spec.strip_suffix('-') {
            // N-: from N to the end
            let start = parse_index(suffix)?;
            return Ok((start, total.saturating_sub(1).max(start)));
        }
        if let Some((lo, hi)) = spec.split_once('-') {
            let start = parse_index(lo)?;
            let end = parse_index(hi)?;
            if end < start {
                return Err(Error::bad_request("descending range"));
            }
            return Ok((start, end));
        }
        // Single index
        let idx = parse_index(spec)?;
        Ok((idx, idx))
    }
}
