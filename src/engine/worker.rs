//! Message-passing worker that owns an [`EngineState`].
//!
//! The caller talks to the worker only through two channels: requests in,
//! responses out. The worker runs on a dedicated blocking thread and handles
//! one message at a time to completion, so responses arrive in the order they
//! were produced: `INDEXES_BUILT`, then `PROGRESS` messages in increasing
//! order, then `BATCH_COMPLETED`.
//!
//! # Flow
//!
//! 1. Caller sends `BUILD_INDEXES` with the wirelist, connectors and splices
//! 2. Worker answers `INDEXES_BUILT` (or `ERROR` when the build fails)
//! 3. Caller sends `FIND_CONNECTORS` / `BATCH_FIND` queries
//! 4. Dropping the handle's sender (see [`WorkerHandle::shutdown`]) stops the worker

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::batch::{BatchCoordinator, BatchItemOutcome, BatchProgress, BatchRequest, CancelFlag};
use super::{BuildStats, Dataset, EngineState};
use crate::config::EngineConfig;
use crate::error::{Result, WireGraphError};
use crate::observability::EngineMetrics;

/// Request kinds the worker understands, as they appear on the wire.
const KNOWN_KINDS: &[&str] = &["BUILD_INDEXES", "FIND_CONNECTORS", "BATCH_FIND"];

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindRequest {
    #[serde(alias = "startNode")]
    pub start_code: String,
    #[serde(default)]
    pub start_pin: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFindRequest {
    pub requests: Vec<BatchRequest>,
}

/// Messages accepted by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerRequest {
    BuildIndexes(Dataset),
    FindConnectors(FindRequest),
    BatchFind(BatchFindRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSummary {
    pub from_index_size: usize,
    pub to_index_size: usize,
    pub wire_count: usize,
    pub connector_count: usize,
    pub splice_pairs: usize,
    pub time_ms: f64,
}

impl From<&BuildStats> for IndexSummary {
    fn from(stats: &BuildStats) -> Self {
        Self {
            from_index_size: stats.from_index_size,
            to_index_size: stats.to_index_size,
            wire_count: stats.wire_count,
            connector_count: stats.connector_count,
            splice_pairs: stats.splice_pairs,
            time_ms: stats.elapsed.as_secs_f64() * 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub results: Vec<BatchItemOutcome>,
    pub time_ms: f64,
    pub cancelled: bool,
}

/// Messages produced by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerResponse {
    IndexesBuilt(IndexSummary),
    #[serde(rename_all = "camelCase")]
    ConnectorsFound {
        start_code: String,
        connectors: Vec<String>,
    },
    Progress(BatchProgress),
    BatchCompleted(BatchSummary),
    Error {
        message: String,
    },
}

impl WorkerResponse {
    fn error(err: impl std::fmt::Display) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }
}

/// Decode a raw JSON message, naming the kind when it is not supported.
fn decode(message: serde_json::Value) -> std::result::Result<WorkerRequest, String> {
    let kind = match message.get("type").and_then(serde_json::Value::as_str) {
        Some(kind) => kind.to_string(),
        None => return Err("message has no request type".to_string()),
    };
    if !KNOWN_KINDS.contains(&kind.as_str()) {
        return Err(format!("unsupported request kind: {kind}"));
    }
    serde_json::from_value(message).map_err(|e| format!("malformed {kind} request: {e}"))
}

/// What travels on the inbound channel.
#[derive(Debug)]
enum Inbound {
    Typed(WorkerRequest),
    Raw(serde_json::Value),
}

// ---------------------------------------------------------------------------
// Worker loop
// ---------------------------------------------------------------------------

struct EngineWorker {
    config: EngineConfig,
    state: Option<EngineState>,
    coordinator: BatchCoordinator,
    metrics: EngineMetrics,
    responses: mpsc::UnboundedSender<WorkerResponse>,
}

impl EngineWorker {
    fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Inbound>) -> EngineMetrics {
        while let Some(inbound) = inbox.blocking_recv() {
            match inbound {
                Inbound::Typed(request) => self.handle(request),
                Inbound::Raw(message) => match decode(message) {
                    Ok(request) => self.handle(request),
                    Err(message) => {
                        tracing::warn!("Rejected worker message: {message}");
                        self.emit(WorkerResponse::Error { message });
                    }
                },
            }
        }
        tracing::debug!("Worker inbox closed, stopping");
        self.metrics
    }

    fn handle(&mut self, request: WorkerRequest) {
        match request {
            WorkerRequest::BuildIndexes(dataset) => self.build(dataset),
            WorkerRequest::FindConnectors(find) => self.find(find),
            WorkerRequest::BatchFind(batch) => self.batch(batch.requests),
        }
    }

    fn build(&mut self, dataset: Dataset) {
        // The previous index belongs to the previous dataset.
        self.state = None;
        match EngineState::build(dataset, &self.config) {
            Ok((state, stats)) => {
                self.metrics.record_build(
                    stats.wire_count,
                    stats.from_index_size,
                    stats.to_index_size,
                    stats.elapsed,
                );
                self.state = Some(state);
                self.emit(WorkerResponse::IndexesBuilt(IndexSummary::from(&stats)));
            }
            Err(err) => {
                tracing::warn!("Index build failed: {err}");
                self.emit(WorkerResponse::error(err));
            }
        }
    }

    fn find(&mut self, find: FindRequest) {
        let Some(state) = self.state.as_ref() else {
            self.emit(WorkerResponse::error(WireGraphError::IndexNotBuilt));
            return;
        };
        let connectors = state
            .find_connected_terminals(&find.start_code, &find.start_pin)
            .into_labels();
        self.metrics.record_query();
        self.emit(WorkerResponse::ConnectorsFound {
            start_code: find.start_code,
            connectors,
        });
    }

    fn batch(&mut self, requests: Vec<BatchRequest>) {
        let responses = self.responses.clone();
        let outcome = self.coordinator.run(self.state.as_ref(), &requests, |progress| {
            let _ = responses.send(WorkerResponse::Progress(progress));
        });
        // A cancel applies to the batch in flight or, if none, the next one.
        self.coordinator.cancel_flag().reset();

        match outcome {
            Ok(report) => {
                self.metrics.record_batch(report.succeeded(), report.failed());
                self.emit(WorkerResponse::BatchCompleted(BatchSummary {
                    time_ms: report.elapsed.as_secs_f64() * 1000.0,
                    cancelled: report.cancelled,
                    results: report.outcomes,
                }));
            }
            Err(err) => self.emit(WorkerResponse::error(err)),
        }
    }

    fn emit(&self, response: WorkerResponse) {
        // The caller may have dropped its receiver; nothing to do then.
        let _ = self.responses.send(response);
    }
}

// ---------------------------------------------------------------------------
// WorkerHandle
// ---------------------------------------------------------------------------

/// Caller side of a running worker.
pub struct WorkerHandle {
    requests: mpsc::UnboundedSender<Inbound>,
    responses: mpsc::UnboundedReceiver<WorkerResponse>,
    cancel: CancelFlag,
    join: JoinHandle<EngineMetrics>,
}

impl WorkerHandle {
    /// Start a worker on the blocking pool of the current tokio runtime.
    pub fn spawn(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let cancel = CancelFlag::new();

        let worker = EngineWorker {
            coordinator: BatchCoordinator::new(config.batch.progress_interval)
                .with_cancel_flag(cancel.clone()),
            config,
            state: None,
            metrics: EngineMetrics::new(),
            responses: response_tx,
        };
        let join = tokio::task::spawn_blocking(move || worker.run(request_rx));

        Ok(Self {
            requests: request_tx,
            responses: response_rx,
            cancel,
            join,
        })
    }

    pub fn send(&self, request: WorkerRequest) -> Result<()> {
        self.push(Inbound::Typed(request))
    }

    /// Send an untyped JSON message; unknown kinds come back as `ERROR`.
    pub fn send_json(&self, message: serde_json::Value) -> Result<()> {
        self.push(Inbound::Raw(message))
    }

    fn push(&self, inbound: Inbound) -> Result<()> {
        self.requests
            .send(inbound)
            .map_err(|_| WireGraphError::Other("worker has stopped".into()))
    }

    /// Next response, or `None` once the worker has stopped and the queue
    /// is drained.
    pub async fn recv(&mut self) -> Option<WorkerResponse> {
        self.responses.recv().await
    }

    /// Ask the running (or next) batch to stop between items.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop accepting requests, wait for queued work to finish, and return
    /// the worker's metrics.
    pub async fn shutdown(self) -> Result<EngineMetrics> {
        let Self { requests, join, .. } = self;
        drop(requests);
        join.await
            .map_err(|e| WireGraphError::Other(format!("worker thread failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_format() {
        let request = WorkerRequest::FindConnectors(FindRequest {
            start_code: "PFB".into(),
            start_pin: "F3".into(),
        });
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"type": "FIND_CONNECTORS", "data": {"startCode": "PFB", "startPin": "F3"}})
        );
    }

    #[test]
    fn response_wire_format() {
        let response = WorkerResponse::ConnectorsFound {
            start_code: "PFB".into(),
            connectors: vec!["IP01-3".into()],
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({"type": "CONNECTORS_FOUND", "data": {"startCode": "PFB", "connectors": ["IP01-3"]}})
        );

        let progress = serde_json::to_value(WorkerResponse::Progress(BatchProgress::new(100, 400))).unwrap();
        assert_eq!(
            progress,
            json!({"type": "PROGRESS", "data": {"processed": 100, "total": 400, "percentage": 25}})
        );
    }

    #[test]
    fn decode_known_kind() {
        let request = decode(json!({
            "type": "BATCH_FIND",
            "data": {"requests": [{"wireId": "W1", "startCode": "PFB", "startPin": "1"}]}
        }))
        .unwrap();
        assert_eq!(
            request,
            WorkerRequest::BatchFind(BatchFindRequest {
                requests: vec![BatchRequest::new("W1", "PFB", "1")],
            })
        );
    }

    #[test]
    fn decode_names_unsupported_kind() {
        let err = decode(json!({"type": "EXPORT_XLSX", "data": {}})).unwrap_err();
        assert_eq!(err, "unsupported request kind: EXPORT_XLSX");
    }

    #[test]
    fn decode_without_type() {
        assert!(decode(json!({"data": {}})).is_err());
    }

    #[test]
    fn decode_malformed_payload() {
        let err = decode(json!({"type": "FIND_CONNECTORS", "data": {"startPin": "1"}})).unwrap_err();
        assert!(err.starts_with("malformed FIND_CONNECTORS request"));
    }
}
