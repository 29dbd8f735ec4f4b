//! Message routing for the dispatch boundary

use super::{RequestEnvelope, ResponseEnvelope};

/// Maps a request envelope to its response.
///
/// Implementations are built once at worker startup and never mutated; every
/// failure must be folded into an error response carrying the request id.
pub trait MessageRouter: Send + 'static {
    /// Route a request to its handler and produce the response
    fn route(&self, request: RequestEnvelope) -> ResponseEnvelope;

    /// Router name for diagnostics
    fn name(&self) -> &str {
        "router"
    }

    /// Whether `kind` is a request type this router serves. Metrics for
    /// unserved types are pooled under [`UNKNOWN_KIND`](super::UNKNOWN_KIND).
    fn serves(&self, _kind: &str) -> bool {
        true
    }
}

impl<F> MessageRouter for F
where
    F: Fn(RequestEnvelope) -> ResponseEnvelope + Send + 'static,
{
    fn route(&self, request: RequestEnvelope) -> ResponseEnvelope {
        self(request)
    }
}
