//! Prometheus metrics for core components.

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

/// Batch jobs submitted.
pub static JOBS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("recast_jobs_submitted_total", "Total batch jobs submitted").unwrap()
});

/// File conversions by result and input category.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("recast_conversions_total", "Total file conversions"),
        &["result", "category"], // result: "success" | "failed"
    )
    .unwrap()
});

/// Per-file conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "recast_conversion_duration_seconds",
            "Duration of individual file conversions",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["category"],
    )
    .unwrap()
});

/// Register all core metrics with the given registry. Double
/// registration is ignored so tests can call this repeatedly.
pub fn register_metrics(registry: &Registry) {
    let _ = registry.register(Box::new(JOBS_SUBMITTED.clone()));
    let _ = registry.register(Box::new(CONVERSIONS_TOTAL.clone()));
    let _ = registry.register(Box::new(CONVERSION_DURATION.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let registry = Registry::new();
        register_metrics(&registry);
        register_metrics(&registry);

        JOBS_SUBMITTED.inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "recast_jobs_submitted_total"));
    }

    #[test]
    fn test_conversion_counter_labels() {
        CONVERSIONS_TOTAL
            .with_label_values(&["success", "image"])
            .inc();
        let value = CONVERSIONS_TOTAL
            .with_label_values(&["success", "image"])
            .get();
        assert!(value >= 1);
    }
}
