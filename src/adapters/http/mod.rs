//! HTTP Surface - Progress, Actions, Health and Metrics
//!
//! One axum 0.7 router serving:
//! - `GET /live`, `GET /ready`: container probes
//! - `GET /metrics`: Prometheus exposition
//! - `GET /progress`: JSON snapshot of the onboarding session
//! - `POST /actions/refresh`: poll both readers now
//! - `POST /actions/{deploy-identity,request-signature,submit-claim}`

pub mod routes;

pub use routes::{router, serve};
