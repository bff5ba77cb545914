//! Contract Validator — On-chain Verification at Startup
//!
//! Validates that the configured factory and gateway addresses point to
//! deployed contracts. A typo in either would otherwise surface as a
//! permanently "absent" identity, which is indistinguishable from a new
//! wallet.

use alloy::primitives::Address;
use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::config::ChainConfig;

use super::provider::SharedProvider;

/// Result of validating a single contract.
#[derive(Debug)]
pub struct ValidationResult {
    /// Contract name for logging.
    pub name: &'static str,
    /// Address that was validated.
    pub address: Address,
    /// Whether the contract has deployed code.
    pub has_code: bool,
}

/// Validates contract addresses against on-chain state.
pub struct ContractValidator {
    /// Alloy provider for on-chain queries.
    provider: SharedProvider,
}

impl ContractValidator {
    /// Create a new validator with the given provider.
    pub fn new(provider: SharedProvider) -> Self {
        Self { provider }
    }

    /// Validate the factory and gateway.
    ///
    /// Returns an error if either has no deployed code.
    #[instrument(skip(self, config))]
    pub async fn validate_all(&self, config: &ChainConfig) -> Result<Vec<ValidationResult>> {
        let mut results = Vec::new();

        for (name, address) in [
            ("Identity Factory", config.identity_factory),
            ("Identity Gateway", config.identity_gateway),
        ] {
            let result = self.validate_contract(name, address).await?;

            if result.has_code {
                info!(contract = name, address = %address, "Contract validated: code exists on-chain");
            } else {
                warn!(contract = name, address = %address, "Contract has no code — possible misconfiguration");
            }

            results.push(result);
        }

        if let Some(missing) = results.iter().find(|r| !r.has_code) {
            anyhow::bail!(
                "{} at {} has no deployed code — check config.toml",
                missing.name,
                missing.address
            );
        }

        Ok(results)
    }

    /// Validate a single contract by checking if code exists at the address.
    async fn validate_contract(&self, name: &'static str, address: Address) -> Result<ValidationResult> {
        let code = self
            .provider
            .get_code_at(address)
            .await
            .with_context(|| format!("Failed to query code for {name}"))?;

        Ok(ValidationResult {
            name,
            address,
            has_code: !code.is_empty(),
        })
    }
}
