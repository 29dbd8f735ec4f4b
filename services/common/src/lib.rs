//! Common plumbing shared by calculation services
//!
//! Provides the request/response envelopes, the router seam, an isolated
//! single-threaded worker with a correlation-id aware client handle,
//! dispatch metrics and layered configuration loading.

pub mod config;
pub mod dispatch;
pub mod errors;

pub use config::*;
pub use dispatch::*;
pub use errors::*;
