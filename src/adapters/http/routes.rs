//! Session routes and server loop.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;

use crate::adapters::metrics::{HealthState, TrackerMetrics};
use crate::domain::error::{SigningError, StepError};
use crate::domain::progress::Action;
use crate::ports::chain_client::IdentityChain;
use crate::ports::latch_store::LatchStore;
use crate::ports::signing_service::SigningService;
use crate::usecases::{OnboardingSession, ProgressSnapshot};

type Session<C, S, L> = Arc<OnboardingSession<C, S, L>>;

/// Failed action, rendered with the snapshot taken after the failure.
#[derive(Debug, Serialize)]
struct ActionRejection {
  error: String,
  #[serde(skip)]
  status: StatusCode,
  progress: ProgressSnapshot,
}

impl IntoResponse for ActionRejection {
  fn into_response(self) -> Response {
    (self.status, Json(self)).into_response()
  }
}

/// HTTP status for a failed step.
pub fn status_for(err: &StepError) -> StatusCode {
  match err {
    StepError::NotAvailable { .. } | StepError::Busy => StatusCode::CONFLICT,
    StepError::Signing(SigningError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
    StepError::NotYetVisible(_) => StatusCode::ACCEPTED,
    StepError::Reverted { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    StepError::Read(_)
    | StepError::Signing(_)
    | StepError::Transaction(_) => StatusCode::BAD_GATEWAY,
  }
}

async fn progress<C, S, L>(State(session): State<Session<C, S, L>>) -> Json<ProgressSnapshot>
where
  C: IdentityChain,
  S: SigningService,
  L: LatchStore,
{
  Json(session.snapshot())
}

async fn refresh<C, S, L>(State(session): State<Session<C, S, L>>) -> Json<ProgressSnapshot>
where
  C: IdentityChain,
  S: SigningService,
  L: LatchStore,
{
  Json(session.refresh().await)
}

async fn perform<C, S, L>(
  State(session): State<Session<C, S, L>>,
  Path(action): Path<Action>,
) -> Result<Json<ProgressSnapshot>, ActionRejection>
where
  C: IdentityChain,
  S: SigningService,
  L: LatchStore,
{
  session
    .perform(action)
    .await
    .map(Json)
    .map_err(|e| ActionRejection {
      status: status_for(&e),
      error: e.to_string(),
      progress: session.snapshot(),
    })
}

/// Build the full router.
pub fn router<C, S, L>(
  session: Session<C, S, L>,
  health: Arc<HealthState>,
  metrics: Arc<TrackerMetrics>,
) -> Router
where
  C: IdentityChain,
  S: SigningService,
  L: LatchStore,
{
  Router::new()
    .route("/progress", get(progress::<C, S, L>))
    .route("/actions/refresh", post(refresh::<C, S, L>))
    .route("/actions/:action", post(perform::<C, S, L>))
    .with_state(session)
    .merge(health.routes())
    .merge(metrics.routes())
}

/// Serve `app` on `bind_address` until `shutdown` fires.
pub async fn serve(
  bind_address: &str,
  app: Router,
  mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
  let listener = tokio::net::TcpListener::bind(bind_address)
    .await
    .with_context(|| format!("Failed to bind {bind_address}"))?;
  info!(address = bind_address, "HTTP server listening");

  axum::serve(listener, app)
    .with_graceful_shutdown(async move {
      let _ = shutdown.recv().await;
    })
    .await
    .context("HTTP server failed")?;

  info!("HTTP server stopped");
  Ok(())
}
