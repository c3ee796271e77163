use std::time::Duration;

use tracing::{debug, info};

use super::Middleware;
use crate::transport::{Request, Response};

/// Logs one structured event per handled request.
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn before(&self, req: &Request) -> Option<Response> {
        debug!(method = %req.method, path = %req.path, "Request received");
        None
    }

    fn after(&self, req: &Request, res: &mut Response, latency: Duration) {
        info!(
            method = %req.method,
            path = %req.path,
            status = res.status,
            latency_ms = latency.as_millis() as u64,
            "Request handled"
        );
    }
}
