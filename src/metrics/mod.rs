use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
};
use std::time::Duration;

// ============================================================================
// Metrics Module - Prometheus metrics for order composition
// ============================================================================
//
// Covers:
// - Orders placed and read, failures by operation and reason
// - Line items dropped while placing an order
// - Latency of every directory call, by directory and outcome
// - Degraded read-path enrichment
// - Circuit breaker state per remote directory
//
// Scraped via GET /metrics.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub orders_placed: IntCounter,
    pub orders_read: IntCounter,
    pub order_failures: IntCounterVec,
    pub line_items_dropped: IntCounterVec,

    pub directory_duration: HistogramVec,
    pub enrichment_failures: IntCounter,
    pub enrichment_misses: IntCounter,

    pub circuit_breaker_state: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_placed = IntCounter::new("orders_placed_total", "Orders successfully placed")?;
        registry.register(Box::new(orders_placed.clone()))?;

        let orders_read = IntCounter::new("orders_read_total", "Orders returned by account reads")?;
        registry.register(Box::new(orders_read.clone()))?;

        let order_failures = IntCounterVec::new(
            Opts::new("order_failures_total", "Failed order operations"),
            &["operation", "reason"],
        )?;
        registry.register(Box::new(order_failures.clone()))?;

        let line_items_dropped = IntCounterVec::new(
            Opts::new("order_line_items_dropped_total", "Requested line items left out of placed orders"),
            &["reason"],
        )?;
        registry.register(Box::new(line_items_dropped.clone()))?;

        let directory_duration = HistogramVec::new(
            HistogramOpts::new("directory_request_duration_seconds", "Directory lookup duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["directory", "outcome"],
        )?;
        registry.register(Box::new(directory_duration.clone()))?;

        let enrichment_failures = IntCounter::new(
            "enrichment_failures_total",
            "Account reads returned without product metadata because the catalog failed",
        )?;
        registry.register(Box::new(enrichment_failures.clone()))?;

        let enrichment_misses = IntCounter::new(
            "enrichment_misses_total",
            "Line items whose product is no longer in the catalog",
        )?;
        registry.register(Box::new(enrichment_misses.clone()))?;

        let circuit_breaker_state = IntGaugeVec::new(
            Opts::new("circuit_breaker_state", "Circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)"),
            &["breaker"],
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        Ok(Self {
            registry,
            orders_placed,
            orders_read,
            order_failures,
            line_items_dropped,
            directory_duration,
            enrichment_failures,
            enrichment_misses,
            circuit_breaker_state,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_directory_call(&self, directory: &str, elapsed: Duration, success: bool) {
        let outcome = if success { "ok" } else { "error" };
        self.directory_duration
            .with_label_values(&[directory, outcome])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_failure(&self, operation: &str, reason: &str) {
        self.order_failures.with_label_values(&[operation, reason]).inc();
    }

    pub fn record_dropped_items(&self, reason: &str, count: usize) {
        if count > 0 {
            self.line_items_dropped
                .with_label_values(&[reason])
                .inc_by(count as u64);
        }
    }

    pub fn set_breaker_state(&self, breaker: &str, state: i64) {
        self.circuit_breaker_state.with_label_values(&[breaker]).set(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.orders_placed.inc();
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_failure() {
        let metrics = Metrics::new().unwrap();
        metrics.record_failure("place_order", "account_not_found");
        metrics.record_failure("place_order", "account_not_found");

        let gathered = metrics.registry().gather();
        let failures = gathered.iter().find(|m| m.name() == "order_failures_total").unwrap();
        assert_eq!(failures.metric[0].counter.value, Some(2.0));
    }

    #[test]
    fn test_record_dropped_items_ignores_zero() {
        let metrics = Metrics::new().unwrap();
        metrics.record_dropped_items("unknown_product", 0);
        metrics.record_dropped_items("non_positive_quantity", 3);

        let gathered = metrics.registry().gather();
        let dropped = gathered
            .iter()
            .find(|m| m.name() == "order_line_items_dropped_total")
            .unwrap();
        assert_eq!(dropped.metric.len(), 1);
        assert_eq!(dropped.metric[0].counter.value, Some(3.0));
    }

    #[test]
    fn test_directory_histogram_labels() {
        let metrics = Metrics::new().unwrap();
        metrics.record_directory_call("catalog", Duration::from_millis(3), true);
        metrics.record_directory_call("catalog", Duration::from_millis(3), false);

        let gathered = metrics.registry().gather();
        let histogram = gathered
            .iter()
            .find(|m| m.name() == "directory_request_duration_seconds")
            .unwrap();
        assert_eq!(histogram.metric.len(), 2);
    }

    #[test]
    fn test_breaker_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.set_breaker_state("account", 1);

        let gathered = metrics.registry().gather();
        let state = gathered.iter().find(|m| m.name() == "circuit_breaker_state").unwrap();
        assert_eq!(state.metric[0].gauge.value, Some(1.0));
    }
}
