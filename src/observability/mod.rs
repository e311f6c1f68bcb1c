//! Structured logging and lightweight engine metrics.
//!
//! - [`init_logging`]: one-time structured logging setup with `RUST_LOG` support
//! - [`EngineMetrics`]: counters for index builds, queries and batch outcomes

use std::time::Duration;

use tracing_subscriber::EnvFilter;

/// Initialize structured logging with `RUST_LOG` environment variable support.
///
/// Defaults to `wiregraph=info` when `RUST_LOG` is not set. Subsequent calls
/// are silently ignored by `tracing_subscriber`.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wiregraph=info"));

    // try_init so double-init in tests doesn't panic
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Counters for one engine session. Serializable via [`EngineMetrics::to_json`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineMetrics {
    pub index_build_ms: Option<f64>,
    pub wires_indexed: usize,
    pub from_buckets: usize,
    pub to_buckets: usize,
    pub queries: u64,
    pub batches: u64,
    pub batch_items_ok: u64,
    pub batch_items_failed: u64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_build(&mut self, wires: usize, from: usize, to: usize, elapsed: Duration) {
        self.index_build_ms = Some(elapsed.as_secs_f64() * 1000.0);
        self.wires_indexed = wires;
        self.from_buckets = from;
        self.to_buckets = to;
    }

    pub fn record_query(&mut self) {
        self.queries += 1;
    }

    pub fn record_batch(&mut self, ok: usize, failed: usize) {
        self.batches += 1;
        self.queries += (ok + failed) as u64;
        self.batch_items_ok += ok as u64;
        self.batch_items_failed += failed as u64;
    }

    /// Share of batch items that failed, `0.0` when none ran.
    pub fn failure_rate(&self) -> f64 {
        let total = self.batch_items_ok + self.batch_items_failed;
        if total == 0 {
            return 0.0;
        }
        self.batch_items_failed as f64 / total as f64
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "index_build_ms": self.index_build_ms,
            "wires_indexed": self.wires_indexed,
            "from_buckets": self.from_buckets,
            "to_buckets": self.to_buckets,
            "queries": self.queries,
            "batches": self.batches,
            "batch_items_ok": self.batch_items_ok,
            "batch_items_failed": self.batch_items_failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_does_not_panic() {
        init_logging();
        // Second call should also not panic (try_init ignores re-init).
        init_logging();
    }

    #[test]
    fn metrics_start_empty() {
        let m = EngineMetrics::new();
        assert_eq!(m.index_build_ms, None);
        assert_eq!(m.queries, 0);
        assert_eq!(m.failure_rate(), 0.0);
    }

    #[test]
    fn metrics_accumulate() {
        let mut m = EngineMetrics::new();
        m.record_build(10, 4, 6, Duration::from_millis(2));
        m.record_query();
        m.record_batch(3, 1);
        assert_eq!(m.wires_indexed, 10);
        assert_eq!(m.queries, 5);
        assert_eq!(m.batches, 1);
        assert!((m.failure_rate() - 0.25).abs() < f64::EPSILON);
        assert!(m.index_build_ms.unwrap() > 1.9);
    }

    #[test]
    fn metrics_to_json() {
        let mut m = EngineMetrics::new();
        m.record_batch(2, 0);
        let json = m.to_json();
        assert_eq!(json["batches"], 1);
        assert_eq!(json["batch_items_ok"], 2);
        assert!(json["index_build_ms"].is_null());
    }
}
