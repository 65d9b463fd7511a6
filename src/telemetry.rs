//! Internal instrumentation of the actuator itself.
//!
//! Recorded through the `metrics` facade; no exporter is installed here, the
//! host application decides whether and where these are published.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use tracing::debug;

// === Metric Name Constants ===

/// Actuator request latency metric name.
pub const METRIC_REQUEST_LATENCY: &str = "actuator_request_latency_ms";
/// Unmatched actuator requests counter metric name.
pub const METRIC_NOT_FOUND: &str = "actuator_requests_not_found_total";
/// Failed component checks counter metric name.
pub const METRIC_COMPONENT_CHECKS_FAILED: &str = "actuator_component_checks_failed_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_REQUEST_LATENCY,
        "Actuator request latency in milliseconds"
    );
    describe_counter!(
        METRIC_NOT_FOUND,
        "Total number of actuator requests that matched no route"
    );
    describe_counter!(
        METRIC_COMPONENT_CHECKS_FAILED,
        "Total number of component checks that errored or panicked"
    );

    debug!("Metrics initialized");
}

/// Increment unmatched request counter.
pub fn inc_not_found() {
    counter!(METRIC_NOT_FOUND).increment(1);
}

/// Increment failed component check counter.
pub fn inc_component_checks_failed(component: &str) {
    counter!(METRIC_COMPONENT_CHECKS_FAILED, "component" => component.to_string()).increment(1);
}

/// RAII guard for timing an actuator request.
/// Automatically records latency when dropped.
pub struct RequestTimer {
    start: Instant,
    endpoint: &'static str,
}

impl RequestTimer {
    /// Start timing a request to the given endpoint kind.
    pub fn new(endpoint: &'static str) -> Self {
        Self {
            start: Instant::now(),
            endpoint,
        }
    }

    /// Endpoint label the latency is recorded under.
    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        histogram!(METRIC_REQUEST_LATENCY, "endpoint" => self.endpoint).record(self.elapsed_ms());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Endpoint;

    #[test]
    fn metric_requests_share_one_label() {
        let cpu = RequestTimer::new(Endpoint::Metric("cpu.used".to_string()).label());
        let uptime = RequestTimer::new(Endpoint::Metric("uptime".to_string()).label());

        assert_eq!(cpu.endpoint(), "metric");
        assert_eq!(cpu.endpoint(), uptime.endpoint());
    }

    #[test]
    fn each_endpoint_kind_is_labelled() {
        let labels: Vec<_> = [Endpoint::Health, Endpoint::MetricsIndex, Endpoint::Info]
            .iter()
            .map(|endpoint| RequestTimer::new(endpoint.label()).endpoint())
            .collect();

        assert_eq!(labels, vec!["health", "metrics", "info"]);
    }
}
