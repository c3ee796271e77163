//! # Api Module
//!
//! The name-keyed resource registry and dispatch entry point.
//!
//! ## Overview
//!
//! An [`Api`] owns the registered [`ResourceType`]s, the codec registry, the
//! middleware chain, and the runtime configuration. It parses the address
//! scheme
//!
//! ```text
//! {resource-name}[/{identifier}][/{component}[/{sub-component}...]][.{format}]
//! ```
//!
//! hands the parsed target to a per-request [`Dispatch`], and converts the
//! outcome, or any domain error, into a [`Response`] using the negotiated
//! (or best-effort default) encoder. The registry doubles as the indirection
//! table relation descriptors resolve their targets against.
//!
//! Registration happens once at startup; dispatch never mutates the `Api`,
//! so a single instance serves concurrent requests without locks.

use crate::codec::{default_registry, Codec, CodecRegistry};
use crate::error::{Error, Result};
use crate::middleware::Middleware;
use crate::resource::{Dispatch, Outcome, ResourceType};
use crate::runtime_config::RuntimeConfig;
use crate::transport::{Request, Response};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

struct Target {
    resource: String,
    identifier: Option<String>,
    components: Vec<String>,
    format: Option<String>,
}

/// Registry of resources plus the dispatch boundary.
pub struct Api {
    base_path: String,
    resources: HashMap<String, Arc<ResourceType>>,
    codecs: &'static CodecRegistry,
    middlewares: Vec<Arc<dyn Middleware>>,
    config: RuntimeConfig,
}

impl Api {
    /// An empty registry with configuration from the environment.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::from_env())
    }

    /// An empty registry with explicit configuration.
    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        Api {
            base_path: String::new(),
            resources: HashMap::new(),
            codecs: default_registry(),
            middlewares: Vec::new(),
            config,
        }
    }

    /// Mount every resource under a path prefix (e.g. `/api/v1`).
    #[must_use]
    pub fn base_path(mut self, prefix: impl Into<String>) -> Self {
        self.base_path = prefix.into();
        self
    }

    /// Register a resource type under its name.
    ///
    /// A repeated name replaces the earlier registration.
    pub fn register(&mut self, ty: Arc<ResourceType>) {
        if self.resources.contains_key(&ty.name) {
            warn!(resource = %ty.name, "Replaced existing resource registration");
        }
        info!(
            resource = %ty.name,
            total_resources = self.resources.len() + 1,
            "Resource registered"
        );
        self.resources.insert(ty.name.clone(), ty);
    }

    /// Look up a registered resource type by name.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<Arc<ResourceType>> {
        self.resources.get(name).map(Arc::clone)
    }

    /// Add middleware to the processing pipeline. Middleware runs in the
    /// order it was added.
    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    /// The codec registry used for negotiation.
    #[must_use]
    pub fn codecs(&self) -> &CodecRegistry {
        self.codecs
    }

    /// The runtime configuration.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Reverse a resource address from an identifier.
    #[must_use]
    pub fn reverse(&self, resource: &str, identifier: &str) -> String {
        format!("{}/{}/{}", self.base_path, resource, identifier)
    }

    /// Handle one inbound request to completion.
    ///
    /// Never returns an error: every failure, expected or not, becomes a
    /// response here.
    pub fn dispatch(&self, request: &Request) -> Response {
        let start = Instant::now();

        let mut early: Option<Response> = None;
        for mw in &self.middlewares {
            if early.is_none() {
                early = mw.before(request);
            } else {
                mw.before(request);
            }
        }

        let mut response = match early {
            Some(r) => r,
            None => match self.dispatch_inner(request) {
                Ok(outcome) => self.write_outcome(outcome),
                Err(err) => self.error_response(request, err),
            },
        };

        let latency = start.elapsed();
        for mw in &self.middlewares {
            mw.after(request, &mut response, latency);
        }
        response
    }

    fn dispatch_inner(&self, request: &Request) -> Result<Outcome> {
        let target = self.parse_target(&request.path)?;
        let ty = self.resource(&target.resource).ok_or(Error::NotFound)?;
        debug!(
            resource = %target.resource,
            method = %request.method,
            identifier = ?target.identifier,
            components = ?target.components,
            "Dispatch begin"
        );
        Dispatch::new(
            self,
            ty,
            request,
            target.identifier,
            target.components,
            target.format,
        )
        .run()
    }

    /// Split a request path into resource, identifier, traversal
    /// components, and the optional format suffix.
    fn parse_target(&self, path: &str) -> Result<Target> {
        let path = path.strip_prefix(self.base_path.as_str()).unwrap_or(path);
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Err(Error::NotFound);
        }

        let mut segments = Vec::new();
        for raw in trimmed.split('/') {
            let decoded = urlencoding::decode(raw)
                .map_err(|_| Error::bad_request("invalid percent-encoding in path"))?;
            segments.push(decoded.into_owned());
        }

        // A known format suffix on the final segment is an explicit
        // encoder override.
        let mut format = None;
        if let Some(last) = segments.last_mut() {
            if let Some((stem, ext)) = last.rsplit_once('.') {
                if !stem.is_empty() && self.codecs.by_format(ext).is_some() {
                    format = Some(ext.to_string());
                    *last = stem.to_string();
                }
            }
        }

        let resource = segments.remove(0);
        let identifier = if segments.is_empty() {
            None
        } else {
            Some(segments.remove(0))
        };
        Ok(Target {
            resource,
            identifier,
            components: segments,
            format,
        })
    }

    fn write_outcome(&self, outcome: Outcome) -> Response {
        let mut headers = outcome.headers;
        let body = match &outcome.payload {
            Some(payload) => match outcome.codec.encode(payload) {
                Ok(bytes) => {
                    headers.push((
                        Arc::from("content-type"),
                        outcome.codec.content_type().to_string(),
                    ));
                    bytes
                }
                Err(err) => return self.error_response_with_codec(err, self.codecs.default_codec()),
            },
            None => Vec::new(),
        };
        Response::new(outcome.status, headers, body)
    }

    fn error_response(&self, request: &Request, err: Error) -> Response {
        // Best-effort negotiation for the error body; fall back to the
        // registry default when the Accept header itself is the problem.
        let codec = self
            .codecs
            .find_encoder(None, request.header("accept"), None)
            .unwrap_or_else(|_| self.codecs.default_codec());
        self.error_response_with_codec(err, codec)
    }

    fn error_response_with_codec(&self, err: Error, codec: Arc<dyn Codec>) -> Response {
        let status = err.status();
        if status >= 500 {
            error!(status = status, error = %err, "Request failed");
        } else {
            debug!(status = status, error = %err, "Request rejected");
        }
        let mut headers = err.headers();
        let body = err
            .body(self.config.debug)
            .and_then(|payload| codec.encode(&payload).ok())
            .unwrap_or_default();
        if !body.is_empty() {
            headers.push((Arc::from("content-type"), codec.content_type().to_string()));
        }
        Response::new(status, headers, body)
    }
}

impl Default for Api {
    fn default() -> Self {
        Self::new()
    }
}
