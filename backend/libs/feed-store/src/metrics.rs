//! Store metrics for observability

use prometheus::{CounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<StoreMetricsInner> = OnceLock::new();

struct StoreMetricsInner {
    reads: CounterVec,
    writes: CounterVec,
    errors: CounterVec,
}

impl StoreMetricsInner {
    fn new() -> Self {
        Self {
            reads: CounterVec::new(
                Opts::new("feed_store_reads_total", "Total feed store reads"),
                &["op"],
            )
            .expect("valid metric definition"),
            writes: CounterVec::new(
                Opts::new("feed_store_writes_total", "Total feed store writes"),
                &["op"],
            )
            .expect("valid metric definition"),
            errors: CounterVec::new(
                Opts::new("feed_store_errors_total", "Total feed store errors"),
                &["op"],
            )
            .expect("valid metric definition"),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.reads.clone()))?;
        registry.register(Box::new(self.writes.clone()))?;
        registry.register(Box::new(self.errors.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static StoreMetricsInner {
    METRICS.get_or_init(StoreMetricsInner::new)
}

/// Store metrics wrapper
#[derive(Clone, Default)]
pub struct StoreMetrics;

impl StoreMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_read(&self, op: &str) {
        get_metrics().reads.with_label_values(&[op]).inc();
    }

    pub fn record_write(&self, op: &str) {
        get_metrics().writes.with_label_values(&[op]).inc();
    }

    /// Count a failed operation and hand the error back for `map_err`
    pub fn record_error<E>(&self, op: &str, error: E) -> E {
        get_metrics().errors.with_label_values(&[op]).inc();
        error
    }
}
