//! EVM RPC Provider - alloy-rs 0.9 Connection Management
//!
//! Manages the connection to the chain hosting the OnchainID contracts.
//! Validates RPC connectivity and the chain ID at startup and exposes a
//! shared provider instance for all on-chain operations.
//!
//! The provider carries the wallet filler, so transactions built by the
//! contract adapter are signed with the connected account's key.
//!
//! In alloy 0.9, `ProviderBuilder` returns a deeply nested filler type.
//! We store it as a type-erased `dyn Provider` to keep the API clean
//! across the adapter layer.

use std::sync::Arc;

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::{Client, Http};
use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::config::ChainConfig;

/// Type-erased HTTP provider shared by chain adapters.
pub type SharedProvider = Arc<dyn Provider<Http<Client>> + Send + Sync>;

/// Shared RPC provider backed by alloy-rs 0.9.
///
/// All chain adapters share a single provider instance to avoid
/// redundant connections and enable connection pooling.
pub struct EvmProvider {
    /// The alloy HTTP provider with wallet filler (type-erased).
    provider: SharedProvider,
    /// Address of the signing account (the "connected wallet").
    wallet: Address,
}

impl EvmProvider {
    /// Connect to the RPC endpoint with a local signer and validate the chain ID.
    ///
    /// The RPC URL comes from `config.toml`; the private key comes from
    /// the environment and is never logged.
    #[instrument(skip_all, fields(chain_id = config.chain_id))]
    pub async fn connect(config: &ChainConfig, private_key: &str) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .context("Invalid WALLET_PRIVATE_KEY")?;
        let wallet = signer.address();

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(signer))
            .on_http(config.rpc_url.parse().context("Invalid RPC URL")?);

        // Wrap in Arc<dyn Provider> for type erasure
        let provider: SharedProvider = Arc::new(provider);

        let chain_id = provider
            .get_chain_id()
            .await
            .context("Failed to query chain ID")?;

        if chain_id != config.chain_id {
            anyhow::bail!(
                "Expected chain_id={}, RPC reports {chain_id}",
                config.chain_id
            );
        }

        info!(chain_id, wallet = %wallet, "Connected to RPC");

        Ok(Self { provider, wallet })
    }

    /// Get a shared reference to the alloy provider (type-erased).
    pub fn inner(&self) -> SharedProvider {
        Arc::clone(&self.provider)
    }

    /// Address of the signing account.
    pub const fn wallet(&self) -> Address {
        self.wallet
    }

    /// Check if the RPC connection is healthy via a lightweight call.
    pub async fn is_healthy(&self) -> bool {
        self.provider.get_block_number().await.is_ok()
    }
}
