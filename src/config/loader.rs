//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails (including malformed addresses)
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    chain_id = config.chain.chain_id,
    factory = %config.chain.identity_factory,
    issuer = %config.kyc.issuer_address,
    topic = config.kyc.topic,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;

  Ok(config)
}

/// Upper bound on `receipt_timeout_secs` (one day).
const MAX_RECEIPT_TIMEOUT_SECS: u64 = 86_400;

/// Validate all configuration parameters.
///
/// Checks for:
/// - Non-zero contract and issuer addresses
/// - Non-empty endpoints
/// - Positive intervals, timeouts and attempt counts
/// - A receipt deadline of at most one day
fn validate_config(config: &AppConfig) -> Result<()> {
  // Chain validation
  anyhow::ensure!(
    !config.chain.rpc_url.is_empty(),
    "RPC URL must not be empty"
  );
  anyhow::ensure!(
    !config.chain.identity_factory.is_zero(),
    "identity_factory must not be the zero address"
  );
  anyhow::ensure!(
    !config.chain.identity_gateway.is_zero(),
    "identity_gateway must not be the zero address"
  );
  anyhow::ensure!(
    config.chain.receipt_poll_interval_ms > 0,
    "receipt_poll_interval_ms must be positive"
  );
  anyhow::ensure!(
    config.chain.receipt_timeout_secs > 0,
    "receipt_timeout_secs must be positive"
  );
  anyhow::ensure!(
    config.chain.receipt_timeout_secs <= MAX_RECEIPT_TIMEOUT_SECS,
    "receipt_timeout_secs must be at most {MAX_RECEIPT_TIMEOUT_SECS}, got {}",
    config.chain.receipt_timeout_secs
  );

  // Claim validation
  anyhow::ensure!(
    !config.kyc.issuer_address.is_zero(),
    "issuer_address must not be the zero address"
  );
  anyhow::ensure!(
    !config.kyc.claim_data.is_empty(),
    "claim_data must not be empty"
  );
  anyhow::ensure!(
    config.kyc.country_code.len() == 2
      && config.kyc.country_code.chars().all(|c| c.is_ascii_alphabetic()),
    "country_code must be a two-letter ISO code, got {:?}",
    config.kyc.country_code
  );

  // Signing validation
  anyhow::ensure!(
    !config.signing.base_url.is_empty(),
    "Signing service URL must not be empty"
  );
  anyhow::ensure!(
    config.signing.timeout_seconds > 0,
    "Signing timeout must be positive"
  );

  // Settlement validation
  anyhow::ensure!(
    config.settlement.max_attempts > 0,
    "settlement.max_attempts must be positive"
  );
  anyhow::ensure!(
    config.settlement.multiplier >= 1,
    "settlement.multiplier must be >= 1, got {}",
    config.settlement.multiplier
  );
  anyhow::ensure!(
    config.settlement.max_delay_ms >= config.settlement.initial_delay_ms,
    "settlement.max_delay_ms must be >= initial_delay_ms"
  );

  // Service validation
  anyhow::ensure!(
    config.service.poll_interval_ms > 0,
    "poll_interval_ms must be positive"
  );

  Ok(())
}
