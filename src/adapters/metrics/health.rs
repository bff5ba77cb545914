//! Health Checks - Liveness and Readiness Probes
//!
//! Exposes /live and /ready routes via axum 0.7 for container health
//! checks. Readiness depends on RPC and latch storage health, refreshed
//! by the polling loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

/// Shared health state polled by readiness probes.
#[derive(Debug)]
pub struct HealthState {
    /// Whether the RPC endpoint answered the last health call.
    pub chain_healthy: AtomicBool,
    /// Whether the latch store is usable.
    pub store_healthy: AtomicBool,
    /// Cleared during graceful shutdown.
    pub running: AtomicBool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Create a new health state (all healthy by default).
    pub const fn new() -> Self {
        Self {
            chain_healthy: AtomicBool::new(true),
            store_healthy: AtomicBool::new(true),
            running: AtomicBool::new(true),
        }
    }

    /// Check if the service is ready to serve traffic.
    pub fn is_ready(&self) -> bool {
        self.running.load(Ordering::Relaxed)
            && self.chain_healthy.load(Ordering::Relaxed)
            && self.store_healthy.load(Ordering::Relaxed)
    }

    /// `/live` and `/ready` routes.
    pub fn routes(self: Arc<Self>) -> Router {
        Router::new()
            .route("/live", get(liveness))
            .route("/ready", get(readiness))
            .with_state(self)
    }
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness probe: returns 200 only if chain + storage are healthy.
async fn readiness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    if state.is_ready() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_when_chain_down() {
        let state = HealthState::new();
        assert!(state.is_ready());
        state.chain_healthy.store(false, Ordering::Relaxed);
        assert!(!state.is_ready());
    }

    #[test]
    fn test_not_ready_after_shutdown() {
        let state = HealthState::new();
        state.running.store(false, Ordering::Relaxed);
        assert!(!state.is_ready());
    }
}
