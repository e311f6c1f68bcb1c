//! Batch coordinator: runs many same-circuit queries against one
//! [`EngineState`], reporting progress and isolating per-item failures.
//!
//! # Lifecycle
//!
//! `Idle -> Running -> Completed`, or `Idle -> Failed` when there is no
//! index to query. Failing items never leave `Running`; they are recorded
//! as `success = false` and the batch moves on, so the outcome list always
//! has exactly one entry per request, in request order.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::EngineState;
use crate::config::schema::DEFAULT_PROGRESS_INTERVAL;
use crate::error::{Result, WireGraphError};

// ---------------------------------------------------------------------------
// Request / outcome types
// ---------------------------------------------------------------------------

/// One query in a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    /// Caller's correlation id (the wire id in the fuse review tool).
    #[serde(default, alias = "wireId")]
    pub request_id: String,
    #[serde(default, alias = "startCode")]
    pub start_node: Option<String>,
    #[serde(default)]
    pub start_pin: Option<String>,
}

impl BatchRequest {
    pub fn new(request_id: &str, start_node: &str, start_pin: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            start_node: Some(start_node.to_string()),
            start_pin: Some(start_pin.to_string()),
        }
    }
}

/// Result of one batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemOutcome {
    pub request_id: String,
    pub start_node: Option<String>,
    pub connectors: Vec<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemOutcome {
    fn succeeded(request: &BatchRequest, connectors: Vec<String>) -> Self {
        Self {
            request_id: request.request_id.clone(),
            start_node: request.start_node.clone(),
            connectors,
            success: true,
            error: None,
        }
    }

    fn failed(request: &BatchRequest, error: String) -> Self {
        Self {
            request_id: request.request_id.clone(),
            start_node: request.start_node.clone(),
            connectors: Vec::new(),
            success: false,
            error: Some(error),
        }
    }
}

/// Advisory progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub processed: usize,
    pub total: usize,
    /// `processed / total` as a rounded percentage.
    pub percentage: u8,
}

impl BatchProgress {
    pub fn new(processed: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            100
        } else {
            ((processed as f64 / total as f64) * 100.0).round() as u8
        };
        Self {
            processed,
            total,
            percentage,
        }
    }
}

/// Everything a finished batch produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<BatchItemOutcome>,
    pub elapsed: Duration,
    /// Whether the batch was cut short by its cancel flag.
    pub cancelled: bool,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

// ---------------------------------------------------------------------------
// CancelFlag
// ---------------------------------------------------------------------------

/// Shared cancellation signal, checked between batch items.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// BatchCoordinator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Idle,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct BatchCoordinator {
    progress_interval: usize,
    cancel: CancelFlag,
    phase: BatchPhase,
}

impl Default for BatchCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_INTERVAL)
    }
}

impl BatchCoordinator {
    /// `progress_interval` of zero is treated as one.
    pub fn new(progress_interval: usize) -> Self {
        Self {
            progress_interval: progress_interval.max(1),
            cancel: CancelFlag::new(),
            phase: BatchPhase::Idle,
        }
    }

    /// Share an externally owned cancel flag.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn phase(&self) -> BatchPhase {
        self.phase
    }

    /// Run `requests` in order, calling `on_progress` every
    /// `progress_interval` processed items.
    ///
    /// Returns [`WireGraphError::IndexNotBuilt`] (and moves to `Failed`) when
    /// `engine` is `None`. Once the cancel flag is set, the remaining items
    /// are reported as failed and the report is marked cancelled.
    pub fn run(
        &mut self,
        engine: Option<&EngineState>,
        requests: &[BatchRequest],
        mut on_progress: impl FnMut(BatchProgress),
    ) -> Result<BatchReport> {
        let Some(engine) = engine else {
            self.phase = BatchPhase::Failed;
            return Err(WireGraphError::IndexNotBuilt);
        };

        self.phase = BatchPhase::Running;
        let total = requests.len();
        tracing::info!(total, "Starting batch connector search");
        let started = Instant::now();

        let mut outcomes = Vec::with_capacity(total);
        let mut cancelled = false;

        for (i, request) in requests.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!(processed = i, total, "Batch cancelled");
                cancelled = true;
                let reason = WireGraphError::Cancelled.to_string();
                outcomes.extend(
                    requests[i..]
                        .iter()
                        .map(|r| BatchItemOutcome::failed(r, reason.clone())),
                );
                break;
            }

            outcomes.push(process_one(engine, request));

            let processed = i + 1;
            if processed % self.progress_interval == 0 {
                on_progress(BatchProgress::new(processed, total));
            }
        }

        let report = BatchReport {
            outcomes,
            elapsed: started.elapsed(),
            cancelled,
        };
        tracing::info!(
            ok = report.succeeded(),
            failed = report.failed(),
            "Batch finished in {:.2}ms",
            report.elapsed.as_secs_f64() * 1000.0
        );
        self.phase = BatchPhase::Completed;
        Ok(report)
    }

    /// Same outcomes as [`Self::run`], computed on the rayon pool. No
    /// progress notifications and no cancellation.
    pub fn run_parallel(&self, engine: &EngineState, requests: &[BatchRequest]) -> Vec<BatchItemOutcome> {
        requests
            .par_iter()
            .map(|request| process_one(engine, request))
            .collect()
    }
}

/// Run one request, turning errors and panics into a failed outcome.
fn process_one(engine: &EngineState, request: &BatchRequest) -> BatchItemOutcome {
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
        engine.try_find(request.start_node.as_deref(), request.start_pin.as_deref())
    }));

    match attempt {
        Ok(Ok(result)) => BatchItemOutcome::succeeded(request, result.into_labels()),
        Ok(Err(err)) => {
            tracing::warn!(request = %request.request_id, "Batch item failed: {err}");
            BatchItemOutcome::failed(request, err.to_string())
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "traversal panicked".to_string());
            tracing::warn!(request = %request.request_id, "Batch item panicked: {message}");
            BatchItemOutcome::failed(request, message)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
