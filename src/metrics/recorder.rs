//! Metrics recording implementation using Prometheus.

use prometheus::{
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
    register_int_counter_with_registry, CounterVec, Encoder, HistogramVec, IntCounter, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

/// Trait for recording client metrics.
pub trait MetricsRecorder: Clone + Send + Sync + 'static {
    /// Records a finished `request()` call with its terminal outcome.
    fn record_request(&self, outcome: &str, duration_secs: f64);

    /// Records a settled refresh. Shared waiters do not count again.
    fn record_refresh(&self, result: &str);

    /// Records the start of a session-expiry episode.
    fn record_session_expired(&self);
}

/// Prometheus metrics collector.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    client_requests_total: CounterVec,
    client_request_duration_seconds: HistogramVec,

    token_refresh_total: CounterVec,
    session_expired_total: IntCounter,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Creates a new metrics instance with its own Prometheus registry.
    pub fn new() -> Self {
        let registry = Arc::new(Registry::new());

        let client_requests_total = register_counter_vec_with_registry!(
            Opts::new(
                "client_requests_total",
                "Total authenticated requests by terminal outcome"
            ),
            &["outcome"],
            registry.clone()
        )
        .expect("Failed to register client_requests_total");

        let client_request_duration_seconds = register_histogram_vec_with_registry!(
            "client_request_duration_seconds",
            "Authenticated request duration in seconds, refresh and retry included",
            &["outcome"],
            vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            registry.clone()
        )
        .expect("Failed to register client_request_duration_seconds");

        let token_refresh_total = register_counter_vec_with_registry!(
            Opts::new("token_refresh_total", "Refresh endpoint calls by result"),
            &["result"],
            registry.clone()
        )
        .expect("Failed to register token_refresh_total");

        let session_expired_total = register_int_counter_with_registry!(
            Opts::new("session_expired_total", "Session expiry episodes"),
            registry.clone()
        )
        .expect("Failed to register session_expired_total");

        Metrics {
            registry,
            client_requests_total,
            client_request_duration_seconds,
            token_refresh_total,
            session_expired_total,
        }
    }

    /// Renders all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    pub fn request_count(&self, outcome: &str) -> u64 {
        self.client_requests_total
            .with_label_values(&[outcome])
            .get() as u64
    }

    pub fn refresh_count(&self, result: &str) -> u64 {
        self.token_refresh_total.with_label_values(&[result]).get() as u64
    }

    pub fn session_expired_count(&self) -> u64 {
        self.session_expired_total.get()
    }
}

impl MetricsRecorder for Metrics {
    fn record_request(&self, outcome: &str, duration_secs: f64) {
        self.client_requests_total
            .with_label_values(&[outcome])
            .inc();
        self.client_request_duration_seconds
            .with_label_values(&[outcome])
            .observe(duration_secs);
    }

    fn record_refresh(&self, result: &str) {
        self.token_refresh_total.with_label_values(&[result]).inc();
    }

    fn record_session_expired(&self) {
        self.session_expired_total.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_per_label() {
        let metrics = Metrics::new();
        metrics.record_request("success", 0.02);
        metrics.record_request("success", 0.03);
        metrics.record_request("network_error", 1.0);
        metrics.record_refresh("success");
        metrics.record_session_expired();

        assert_eq!(metrics.request_count("success"), 2);
        assert_eq!(metrics.request_count("network_error"), 1);
        assert_eq!(metrics.refresh_count("success"), 1);
        assert_eq!(metrics.refresh_count("failure"), 0);
        assert_eq!(metrics.session_expired_count(), 1);
    }

    #[test]
    fn render_exposes_metric_names() {
        let metrics = Metrics::new();
        metrics.record_refresh("failure");
        let text = metrics.render();
        assert!(text.contains("token_refresh_total"));
        assert!(text.contains("session_expired_total"));
    }
}
