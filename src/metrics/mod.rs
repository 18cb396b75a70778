//! Metrics collection and exposition for Prometheus.
//!
//! Counts requests by outcome, refresh calls, and session expiries.

mod recorder;

pub use recorder::{Metrics, MetricsRecorder};
