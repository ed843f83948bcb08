//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `wallet_operations_total` - Committed operations by kind
//! - `wallet_operation_failures_total` - Failed operations by kind
//! - `wallet_commit_duration_seconds` - Histogram of commit latencies
//! - `wallet_reconcile_mismatches` - Mismatched currencies in the last
//!   reconciliation

use prometheus::{Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
///
/// Uses its own registry rather than the process-global one, so multiple
/// ledgers (tests, embedding) never collide on metric names.
#[derive(Clone)]
pub struct Metrics {
    /// Committed operations by kind
    pub operations_total: IntCounterVec,

    /// Failed operations by kind
    pub operation_failures_total: IntCounterVec,

    /// Commit duration histogram
    pub commit_duration: Histogram,

    /// Mismatched currencies in the last reconciliation
    pub reconcile_mismatches: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let operations_total = IntCounterVec::new(
            Opts::new("wallet_operations_total", "Committed operations by kind"),
            &["kind"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let operation_failures_total = IntCounterVec::new(
            Opts::new(
                "wallet_operation_failures_total",
                "Failed operations by kind",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(operation_failures_total.clone()))?;

        let commit_duration = Histogram::with_opts(
            HistogramOpts::new(
                "wallet_commit_duration_seconds",
                "Histogram of commit latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500]),
        )?;
        registry.register(Box::new(commit_duration.clone()))?;

        let reconcile_mismatches = IntGauge::new(
            "wallet_reconcile_mismatches",
            "Mismatched currencies in the last reconciliation",
        )?;
        registry.register(Box::new(reconcile_mismatches.clone()))?;

        Ok(Self {
            operations_total,
            operation_failures_total,
            commit_duration,
            reconcile_mismatches,
            registry,
        })
    }

    /// Record a committed operation
    pub fn record_operation(&self, kind: &str) {
        self.operations_total.with_label_values(&[kind]).inc();
    }

    /// Record a failed operation
    pub fn record_failure(&self, kind: &str) {
        self.operation_failures_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Record commit duration
    pub fn record_commit_duration(&self, duration_seconds: f64) {
        self.commit_duration.observe(duration_seconds);
    }

    /// Update the reconciliation mismatch gauge
    pub fn set_reconcile_mismatches(&self, count: i64) {
        self.reconcile_mismatches.set(count);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.reconcile_mismatches.get(), 0);
    }

    #[test]
    fn test_independent_registries() {
        // Two collectors must not collide on names
        let _a = Metrics::new().unwrap();
        let _b = Metrics::new().unwrap();
    }

    #[test]
    fn test_record_operation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_operation("fund");
        metrics.record_operation("fund");
        metrics.record_operation("convert");
        assert_eq!(
            metrics.operations_total.with_label_values(&["fund"]).get(),
            2
        );
        assert_eq!(
            metrics
                .operations_total
                .with_label_values(&["convert"])
                .get(),
            1
        );
    }

    #[test]
    fn test_reconcile_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.set_reconcile_mismatches(3);
        assert_eq!(metrics.reconcile_mismatches.get(), 3);
        metrics.set_reconcile_mismatches(0);
        assert_eq!(metrics.reconcile_mismatches.get(), 0);
    }
}
