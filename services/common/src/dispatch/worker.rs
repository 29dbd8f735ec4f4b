//! Isolated single-threaded worker and its client handle

use super::{DispatchMetrics, MessageRouter, RequestEnvelope, RequestState, ResponseEnvelope, UNKNOWN_KIND};
use crate::config::WorkerConfig;
use crate::errors::{ServiceError, ServiceResult};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, info_span, warn};

/// Outstanding requests keyed by correlation id
type PendingMap = Arc<Mutex<FxHashMap<String, oneshot::Sender<ResponseEnvelope>>>>;

/// Spawns routers onto their own worker thread
#[derive(Debug)]
pub struct Worker;

impl Worker {
    /// Start `router` on a dedicated thread and return a handle to it.
    ///
    /// Requests are processed strictly one at a time in arrival order. Must be
    /// called from within a Tokio runtime, which hosts the response
    /// demultiplexer. The worker stops once every handle has been dropped.
    pub fn spawn<R: MessageRouter>(router: R, config: &WorkerConfig) -> ServiceResult<WorkerHandle> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ServiceError::WorkerUnavailable(format!("no async runtime: {e}")))?;

        let (request_tx, request_rx) = mpsc::channel(config.channel_capacity);
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let metrics = Arc::new(DispatchMetrics::new());
        let pending: PendingMap = Arc::default();

        let worker_metrics = Arc::clone(&metrics);
        let thread_name = format!("{}-worker", router.name());
        std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || run_worker(&router, request_rx, &response_tx, &worker_metrics))
            .map_err(|e| ServiceError::WorkerUnavailable(format!("failed to start worker thread: {e}")))?;

        runtime.spawn(demultiplex(response_rx, Arc::clone(&pending)));

        Ok(WorkerHandle {
            request_tx,
            pending,
            metrics,
        })
    }
}

fn run_worker<R: MessageRouter>(
    router: &R,
    mut requests: mpsc::Receiver<RequestEnvelope>,
    responses: &mpsc::UnboundedSender<ResponseEnvelope>,
    metrics: &DispatchMetrics,
) {
    info!(router = router.name(), "Worker started");

    while let Some(request) = requests.blocking_recv() {
        let id = request.id.clone();
        let kind = request.kind.clone();
        let span = info_span!("dispatch", id = %id, kind = %kind);
        let _entered = span.enter();

        let bucket = if router.serves(&kind) { kind.as_str() } else { UNKNOWN_KIND };
        metrics.record_received(bucket);
        let started = Instant::now();

        let mut response = panic::catch_unwind(AssertUnwindSafe(|| router.route(request)))
            .unwrap_or_else(|_| {
                error!("Handler panicked");
                ResponseEnvelope::error(id.clone(), "Internal error while processing request")
            });
        if response.id != id {
            response.id = id;
        }

        match response.state() {
            RequestState::Resolved => {
                debug!(elapsed_us = started.elapsed().as_micros(), "Request resolved");
                metrics.record_resolved(bucket, started.elapsed());
            }
            _ => {
                warn!(error = response.error.as_deref().unwrap_or_default(), "Request rejected");
                metrics.record_rejected(bucket, started.elapsed());
            }
        }

        if responses.send(response).is_err() {
            debug!("Response channel closed, stopping worker");
            break;
        }
    }

    info!(router = router.name(), "Worker stopped");
}

async fn demultiplex(mut responses: mpsc::UnboundedReceiver<ResponseEnvelope>, pending: PendingMap) {
    while let Some(response) = responses.recv().await {
        let waiter = pending.lock().remove(&response.id);
        match waiter {
            Some(tx) => {
                if tx.send(response).is_err() {
                    debug!("Caller discarded its response");
                }
            }
            None => warn!(id = %response.id, "Response without a pending request"),
        }
    }

    // Dropping the senders wakes any remaining waiters with an error
    pending.lock().clear();
}

/// Client side of a worker; cheap to clone
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    request_tx: mpsc::Sender<RequestEnvelope>,
    pending: PendingMap,
    metrics: Arc<DispatchMetrics>,
}

impl WorkerHandle {
    /// Queue a request and return immediately with a future-like handle to
    /// its response.
    pub async fn submit(&self, request: RequestEnvelope) -> ServiceResult<PendingResponse> {
        let id = request.id.clone();
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock();
            if pending.contains_key(&id) {
                return Err(ServiceError::DuplicateRequestId(id));
            }
            pending.insert(id.clone(), tx);
        }

        if self.request_tx.send(request).await.is_err() {
            self.pending.lock().remove(&id);
            return Err(ServiceError::WorkerUnavailable("worker has shut down".to_string()));
        }

        Ok(PendingResponse { id, rx })
    }

    /// Submit a request and wait for its response
    pub async fn call(&self, request: RequestEnvelope) -> ServiceResult<ResponseEnvelope> {
        self.submit(request).await?.wait().await
    }

    /// `Some(Pending)` while a request with this id is in flight
    pub fn state(&self, id: &str) -> Option<RequestState> {
        self.pending
            .lock()
            .contains_key(id)
            .then_some(RequestState::Pending)
    }

    /// Number of requests awaiting a response
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Shared dispatch metrics of this worker
    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.metrics)
    }
}

/// A response that has not arrived yet
#[derive(Debug)]
pub struct PendingResponse {
    id: String,
    rx: oneshot::Receiver<ResponseEnvelope>,
}

impl PendingResponse {
    /// Correlation id of the request
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the worker's response
    pub async fn wait(self) -> ServiceResult<ResponseEnvelope> {
        self.rx
            .await
            .map_err(|_| ServiceError::WorkerUnavailable(format!("worker dropped request {}", self.id)))
    }
}
