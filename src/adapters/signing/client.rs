//! Signing HTTP Client - KYC Attestation Requests
//!
//! Wraps reqwest for `POST /kyc-signature`. Unlike read paths, this
//! client never retries on its own: a failed request is surfaced to the
//! user, who re-triggers it. Each attempt carries a fresh `X-Request-Id`
//! so issuer-side logs can be correlated.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::types::{error_message, KycSignatureRequest, KycSignatureResponse};
use crate::domain::claim::SignedClaim;
use crate::domain::error::SigningError;
use crate::ports::signing_service::{SignatureRequest, SigningService};

/// Configuration for the signing HTTP client.
#[derive(Debug, Clone)]
pub struct SigningClientConfig {
  /// Base URL of the signing service.
  pub base_url: String,
  /// Request timeout.
  pub timeout: Duration,
}

impl Default for SigningClientConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:3001".to_string(),
      timeout: Duration::from_secs(30),
    }
  }
}

/// HTTP client for the KYC signing service.
pub struct SigningClient {
  /// Underlying HTTP client.
  http: Client,
  /// Client configuration.
  config: SigningClientConfig,
}

impl SigningClient {
  /// Create a new signing client.
  pub fn new(config: SigningClientConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(2)
      .build()
      .context("Failed to build HTTP client")?;

    Ok(Self { http, config })
  }

  fn endpoint(&self) -> String {
    format!("{}/kyc-signature", self.config.base_url.trim_end_matches('/'))
  }
}

fn transport_error(e: &reqwest::Error) -> SigningError {
  if e.is_timeout() {
    SigningError::Timeout
  } else {
    SigningError::Transport(e.to_string())
  }
}

#[async_trait]
impl SigningService for SigningClient {
  #[instrument(skip(self, request), fields(user = %request.user_address, topic = request.topic))]
  async fn request_signature(
    &self,
    request: &SignatureRequest,
  ) -> Result<SignedClaim, SigningError> {
    let request_id = Uuid::new_v4();
    let body = KycSignatureRequest::from(request);

    debug!(request_id = %request_id, "Requesting KYC signature");

    let response = self
      .http
      .post(self.endpoint())
      .header("X-Request-Id", request_id.to_string())
      .json(&body)
      .send()
      .await
      .map_err(|e| transport_error(&e))?;

    let status = response.status();
    let text = response.text().await.map_err(|e| transport_error(&e))?;

    if !status.is_success() {
      let message = error_message(&text);
      warn!(
        request_id = %request_id,
        status = %status,
        message = %message,
        "Signing service rejected request"
      );
      return Err(SigningError::Status {
        status: status.as_u16(),
        message,
      });
    }

    let wire: KycSignatureResponse =
      serde_json::from_str(&text).map_err(|e| SigningError::Malformed(e.to_string()))?;

    SignedClaim::try_from(wire).map_err(SigningError::Malformed)
  }
}
