//! Operation metrics
//!
//! One registry per server instance holding a duration histogram plus
//! success and failure counters, all keyed by operation name. Recording
//! never fails the caller: a label error is logged and the sample dropped.

use prometheus::proto::Metric;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

pub const DURATION_METRIC: &str = "tally_operation_duration_seconds";
pub const SUCCESS_METRIC: &str = "tally_operation_success_total";
pub const FAILURE_METRIC: &str = "tally_operation_failure_total";

#[derive(Clone)]
pub struct OperationMetrics {
    registry: Registry,
    duration: HistogramVec,
    success: IntCounterVec,
    failure: IntCounterVec,
}

impl std::fmt::Debug for OperationMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationMetrics").finish_non_exhaustive()
    }
}

impl OperationMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let duration = HistogramVec::new(
            HistogramOpts::new(DURATION_METRIC, "Operation duration in seconds.").buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["operation"],
        )?;
        let success = IntCounterVec::new(
            Opts::new(SUCCESS_METRIC, "Operations that completed successfully."),
            &["operation"],
        )?;
        let failure = IntCounterVec::new(
            Opts::new(FAILURE_METRIC, "Operations that failed, by error kind."),
            &["operation", "failure_type"],
        )?;

        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(success.clone()))?;
        registry.register(Box::new(failure.clone()))?;

        Ok(Self {
            registry,
            duration,
            success,
            failure,
        })
    }

    pub fn observe_duration(&self, operation: &str, elapsed: Duration) {
        match self.duration.get_metric_with_label_values(&[operation]) {
            Ok(histogram) => histogram.observe(elapsed.as_secs_f64()),
            Err(e) => tracing::warn!(operation, error = %e, "Dropped duration sample"),
        }
    }

    pub fn record_success(&self, operation: &str) {
        match self.success.get_metric_with_label_values(&[operation]) {
            Ok(counter) => counter.inc(),
            Err(e) => tracing::warn!(operation, error = %e, "Dropped success count"),
        }
    }

    pub fn record_failure(&self, operation: &str, failure_type: &str) {
        match self.failure.get_metric_with_label_values(&[operation, failure_type]) {
            Ok(counter) => counter.inc(),
            Err(e) => tracing::warn!(operation, failure_type, error = %e, "Dropped failure count"),
        }
    }

    pub fn duration_samples(&self, operation: &str) -> u64 {
        self.gathered(DURATION_METRIC, &[("operation", operation)])
            .map(|m| m.get_histogram().get_sample_count())
            .unwrap_or(0)
    }

    pub fn success_count(&self, operation: &str) -> u64 {
        self.gathered(SUCCESS_METRIC, &[("operation", operation)])
            .map(|m| m.get_counter().get_value() as u64)
            .unwrap_or(0)
    }

    pub fn failure_count(&self, operation: &str, failure_type: &str) -> u64 {
        self.gathered(
            FAILURE_METRIC,
            &[("operation", operation), ("failure_type", failure_type)],
        )
        .map(|m| m.get_counter().get_value() as u64)
        .unwrap_or(0)
    }

    /// Look up an existing series without creating it
    fn gathered(&self, name: &str, labels: &[(&str, &str)]) -> Option<Metric> {
        self.registry
            .gather()
            .into_iter()
            .find(|family| family.get_name() == name)?
            .get_metric()
            .iter()
            .find(|metric| {
                labels.iter().all(|(key, value)| {
                    metric
                        .get_label()
                        .iter()
                        .any(|pair| pair.get_name() == *key && pair.get_value() == *value)
                })
            })
            .cloned()
    }

    /// Text exposition of every metric, with its content type
    pub fn render(&self) -> Result<(Vec<u8>, String), prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok((buffer, encoder.format_type().to_string()))
    }
}
