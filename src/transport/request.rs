use http::Method;
use std::collections::HashMap;
use tracing::debug;

/// Parsed inbound HTTP request handed to [`crate::api::Api::dispatch`].
///
/// The embedding server extracts method, target, headers, and body from the
/// wire and builds one of these. Header keys are stored lowercase; query
/// parameters keep their arrival order (filter combination depends on it).
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method (GET, POST, ...)
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    /// HTTP headers (lowercase keys)
    pub headers: HashMap<String, String>,
    /// Parsed query string parameters, in arrival order
    pub query_params: Vec<(String, String)>,
    /// Raw request body; empty when the request carries none
    pub body: Vec<u8>,
}

impl Request {
    /// Build a request from a method and a target (`/path?query=string`).
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let path = target.split('?').next().unwrap_or("/").to_string();
        let query_params = parse_query_params(target);
        Self {
            method,
            path,
            headers: HashMap::new(),
            query_params,
            body: Vec::new(),
        }
    }

    /// Attach a header. The key is lowercased for case-insensitive lookup.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Attach a raw body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Get a header by name (case-insensitive).
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Get a query parameter by name.
    ///
    /// Uses "last write wins" semantics: if duplicate query parameter names
    /// exist (e.g., `?limit=10&limit=20`), returns the last occurrence.
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the request carries a body.
    #[inline]
    #[must_use]
    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }
}

/// Parse query string parameters from a request target.
///
/// Extracts everything after the `?` character and URL-decodes parameter
/// names and values, preserving arrival order.
#[must_use]
pub fn parse_query_params(target: &str) -> Vec<(String, String)> {
    if let Some(pos) = target.find('?') {
        let query_str = &target[pos + 1..];
        let params: Vec<(String, String)> = url::form_urlencoded::parse(query_str.as_bytes())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        debug!(param_count = params.len(), "Query params parsed");
        params
    } else {
        Vec::new()
    }
}

/// Parse cookies out of a lowercase-keyed header map.
#[must_use]
pub fn parse_cookies(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .get("cookie")
        .map(|c| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim().to_string();
                    let value = parts.next().unwrap_or("").trim().to_string();
                    Some((name, value))
                })
                .collect()
        })
        .unwrap_or_default()
}
