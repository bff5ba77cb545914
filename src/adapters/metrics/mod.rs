//! Metrics and Monitoring Adapters
//!
//! Provides Prometheus metrics export and health check routes
//! (/live, /ready) via axum 0.7. Both are mounted on the tracker's
//! HTTP server.

pub mod health;
pub mod prometheus;

pub use health::HealthState;
pub use prometheus::TrackerMetrics;
