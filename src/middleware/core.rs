use std::time::Duration;

use crate::transport::{Request, Response};

/// Hooks run around every dispatch. `before` may short-circuit with an
/// early response; `after` sees the final response and its latency.
pub trait Middleware: Send + Sync {
    fn before(&self, _req: &Request) -> Option<Response> {
        None
    }
    fn after(&self, _req: &Request, _res: &mut Response, _latency: Duration) {}
}
