//! Request dispatch for isolated calculation workers
//!
//! A caller hands [`RequestEnvelope`]s to a [`WorkerHandle`] and resumes
//! immediately; a dedicated worker thread runs each request to completion
//! through a [`MessageRouter`] and the response is delivered back keyed by
//! the request's correlation id. Nothing is shared with the worker except
//! the two channels.

pub mod message;
pub mod metrics;
pub mod router;
pub mod worker;

// Re-export main types
pub use message::{RequestEnvelope, RequestState, ResponseEnvelope, ResponseStatus, decode_request};
pub use metrics::{DispatchMetrics, KindCounters, MAX_TRACKED_KINDS, MetricsSnapshot, UNKNOWN_KIND};
pub use router::MessageRouter;
pub use worker::{PendingResponse, Worker, WorkerHandle};
