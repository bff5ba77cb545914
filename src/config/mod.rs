//! Configuration Module - TOML-based Tracker Configuration
//!
//! Loads and validates configuration from `config.toml`.
//! Contract addresses, the trusted issuer and service endpoints are
//! externalized here - nothing is hardcoded in the domain layer.
//! The wallet key is never read from the file (env `WALLET_PRIVATE_KEY`).

pub mod loader;

use std::time::Duration;

use alloy::primitives::Address;
use serde::Deserialize;

/// Top-level tracker configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the tracker begins operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Service identity, logging and HTTP surface.
  pub service: ServiceConfig,
  /// RPC endpoint and OnchainID contract addresses.
  pub chain: ChainConfig,
  /// Claim parameters.
  pub kyc: KycConfig,
  /// Signing service endpoint.
  pub signing: SigningConfig,
  /// Read-after-write backoff.
  #[serde(default)]
  pub settlement: SettlementConfig,
  /// Persistence configuration.
  #[serde(default)]
  pub persistence: PersistenceConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Human-readable service name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Bind address for health, progress, metrics and action endpoints.
  #[serde(default = "default_bind_address")]
  pub bind_address: String,
  /// Interval between progress refreshes (milliseconds).
  #[serde(default = "default_poll_interval")]
  pub poll_interval_ms: u64,
  /// Run the next available action automatically on each tick.
  #[serde(default)]
  pub auto_advance: bool,
}

/// Chain configuration.
///
/// Contract addresses are ALWAYS in config - never hardcoded.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
  /// JSON-RPC endpoint.
  pub rpc_url: String,
  /// Expected chain ID, checked at startup.
  pub chain_id: u64,
  /// Identity factory (`getIdentity`).
  pub identity_factory: Address,
  /// Deployment gateway (`deployIdentityForWallet`).
  pub identity_gateway: Address,
  /// Receipt polling interval (milliseconds).
  #[serde(default = "default_receipt_poll_interval")]
  pub receipt_poll_interval_ms: u64,
  /// Give up waiting for a receipt after this many seconds.
  #[serde(default = "default_receipt_timeout")]
  pub receipt_timeout_secs: u64,
}

/// Claim parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct KycConfig {
  /// Trusted claim issuer.
  pub issuer_address: Address,
  /// Claim topic (1 = KYC passed).
  #[serde(default = "default_topic")]
  pub topic: u64,
  /// Claim signature scheme (1 = ECDSA).
  #[serde(default = "default_scheme")]
  pub scheme: u64,
  /// Fixed claim payload string sent to the signing service.
  #[serde(default = "default_claim_data")]
  pub claim_data: String,
  /// ISO country code reported to the issuer.
  pub country_code: String,
}

/// Signing service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SigningConfig {
  /// Base URL; the request goes to `{base_url}/kyc-signature`.
  pub base_url: String,
  /// Client-side deadline in seconds.
  #[serde(default = "default_signing_timeout")]
  pub timeout_seconds: u64,
}

/// Backoff for reads that follow a confirmed write.
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementConfig {
  /// Delay before the first read (milliseconds).
  #[serde(default = "default_initial_delay")]
  pub initial_delay_ms: u64,
  /// Delay multiplier between attempts.
  #[serde(default = "default_multiplier")]
  pub multiplier: u32,
  /// Upper bound for a single delay (milliseconds).
  #[serde(default = "default_max_delay")]
  pub max_delay_ms: u64,
  /// Number of reads before giving up.
  #[serde(default = "default_max_attempts")]
  pub max_attempts: u32,
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Directory holding `latches.json`.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
}

impl ServiceConfig {
  pub const fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }
}

impl ChainConfig {
  pub const fn receipt_poll_interval(&self) -> Duration {
    Duration::from_millis(self.receipt_poll_interval_ms)
  }

  pub const fn receipt_timeout(&self) -> Duration {
    Duration::from_secs(self.receipt_timeout_secs)
  }
}

impl SigningConfig {
  pub const fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_seconds)
  }
}

impl Default for SettlementConfig {
  fn default() -> Self {
    Self {
      initial_delay_ms: default_initial_delay(),
      multiplier: default_multiplier(),
      max_delay_ms: default_max_delay(),
      max_attempts: default_max_attempts(),
    }
  }
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_bind_address() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_poll_interval() -> u64 {
  5_000
}

fn default_receipt_poll_interval() -> u64 {
  1_000
}

fn default_receipt_timeout() -> u64 {
  180
}

fn default_topic() -> u64 {
  1
}

fn default_scheme() -> u64 {
  1
}

fn default_claim_data() -> String {
  "KYC passed".to_string()
}

fn default_signing_timeout() -> u64 {
  30
}

fn default_initial_delay() -> u64 {
  2_000
}

fn default_multiplier() -> u32 {
  2
}

fn default_max_delay() -> u64 {
  16_000
}

fn default_max_attempts() -> u32 {
  5
}

fn default_data_dir() -> String {
  "data".to_string()
}
