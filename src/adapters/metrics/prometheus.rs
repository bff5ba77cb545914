//! Prometheus Metrics Registry - Onboarding Observability
//!
//! Registers the tracker's metrics and renders them for `/metrics`.
//! Covers stage transitions, action outcomes, read failures, signing
//! latency and the current progress percentage.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Centralized Prometheus metrics for the tracker.
///
/// All metrics follow the naming convention `kyc_tracker_*`.
pub struct TrackerMetrics {
    /// Prometheus registry.
    registry: Registry,
    /// Stage transitions, labelled by destination stage.
    pub transitions: IntCounterVec,
    /// Action attempts, labelled by action and outcome.
    pub actions: IntCounterVec,
    /// Failed contract reads, labelled by reader.
    pub read_errors: IntCounterVec,
    /// Signing request latency in seconds, labelled by outcome.
    pub signing_latency: HistogramVec,
    /// Current progress percentage (0-100).
    pub progress_percent: IntGauge,
}

impl TrackerMetrics {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let transitions = IntCounterVec::new(
            Opts::new(
                "kyc_tracker_transitions_total",
                "Onboarding stage transitions",
            ),
            &["to"],
        )?;

        let actions = IntCounterVec::new(
            Opts::new("kyc_tracker_actions_total", "Onboarding action attempts"),
            &["action", "outcome"],
        )?;

        let read_errors = IntCounterVec::new(
            Opts::new(
                "kyc_tracker_read_errors_total",
                "Failed identity or claim reads",
            ),
            &["reader"],
        )?;

        let signing_latency = HistogramVec::new(
            HistogramOpts::new(
                "kyc_tracker_signing_latency_seconds",
                "Signing service round-trip time",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["outcome"],
        )?;

        let progress_percent = IntGauge::new(
            "kyc_tracker_progress_percent",
            "Current onboarding progress (0-100)",
        )?;

        // Register all metrics
        registry.register(Box::new(transitions.clone()))?;
        registry.register(Box::new(actions.clone()))?;
        registry.register(Box::new(read_errors.clone()))?;
        registry.register(Box::new(signing_latency.clone()))?;
        registry.register(Box::new(progress_percent.clone()))?;

        Ok(Self {
            registry,
            transitions,
            actions,
            read_errors,
            signing_latency,
            progress_percent,
        })
    }

    /// Encode all registered metrics in the text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// `GET /metrics` route.
    pub fn routes(self: Arc<Self>) -> Router {
        Router::new()
            .route("/metrics", get(Self::scrape))
            .with_state(self)
    }

    async fn scrape(State(metrics): State<Arc<Self>>) -> (StatusCode, String) {
        match metrics.render() {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
}
