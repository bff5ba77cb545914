//! OnchainID Contract Interactions - Factory, Gateway, Identity
//!
//! Implements the `IdentityChain` port with ABI bindings generated by
//! `sol!`. Reads go through `eth_call`; writes are signed by the
//! provider's wallet filler and return as soon as the node accepts the
//! transaction. Receipt polling is left to the use-case layer.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::domain::claim::ClaimRecord;
use crate::ports::chain_client::{ClaimSubmission, IdentityChain, TxReceipt};

use super::provider::EvmProvider;

sol! {
    interface IIdFactory {
        function getIdentity(address _wallet) external view returns (address);
    }

    interface IIdentityGateway {
        function deployIdentityForWallet(address identityOwner) external returns (address);
    }

    interface IIdentity {
        function getClaim(bytes32 _claimId)
            external
            view
            returns (
                uint256 topic,
                uint256 scheme,
                address issuer,
                bytes memory signature,
                bytes memory data,
                string memory uri
            );

        function addClaim(
            uint256 _topic,
            uint256 _scheme,
            address _issuer,
            bytes calldata _signature,
            bytes calldata _data,
            string calldata _uri
        ) external returns (bytes32 claimRequestId);
    }
}

/// OnchainID contract addresses loaded from config.
#[derive(Debug, Clone, Copy)]
pub struct ContractAddresses {
    /// Identity factory (`getIdentity`).
    pub identity_factory: Address,
    /// Deployment gateway (`deployIdentityForWallet`).
    pub identity_gateway: Address,
}

/// Implements OnchainID operations via alloy-rs 0.9.
pub struct OnchainIdContracts {
    /// Shared RPC provider with wallet filler.
    provider: Arc<EvmProvider>,
    /// Contract addresses from config.
    addresses: ContractAddresses,
}

impl OnchainIdContracts {
    pub const fn new(provider: Arc<EvmProvider>, addresses: ContractAddresses) -> Self {
        Self {
            provider,
            addresses,
        }
    }

    /// `eth_call` a view function and decode its return values.
    async fn view<C: SolCall + Send>(&self, to: Address, call: C) -> Result<C::Return> {
        let tx = TransactionRequest::default()
            .to(to)
            .input(Bytes::from(call.abi_encode()).into());

        let output = self
            .provider
            .inner()
            .call(&tx)
            .await
            .with_context(|| format!("{} call to {to} failed", C::SIGNATURE))?;

        C::abi_decode_returns(&output, true)
            .with_context(|| format!("Failed to decode {} return data", C::SIGNATURE))
    }

    /// Sign and broadcast a state-changing call from the connected wallet.
    async fn send<C: SolCall + Send>(&self, to: Address, call: C) -> Result<TxHash> {
        let tx = TransactionRequest::default()
            .from(self.provider.wallet())
            .to(to)
            .input(Bytes::from(call.abi_encode()).into());

        let pending = self
            .provider
            .inner()
            .send_transaction(tx)
            .await
            .with_context(|| format!("{} transaction to {to} rejected", C::SIGNATURE))?;

        Ok(*pending.tx_hash())
    }
}

#[async_trait]
impl IdentityChain for OnchainIdContracts {
    #[instrument(skip(self), fields(wallet = %wallet))]
    async fn get_identity(&self, wallet: Address) -> Result<Address> {
        let ret = self
            .view(
                self.addresses.identity_factory,
                IIdFactory::getIdentityCall { _wallet: wallet },
            )
            .await?;
        debug!(identity = %ret._0, "Factory lookup");
        Ok(ret._0)
    }

    #[instrument(skip(self), fields(identity = %identity, claim_id = %claim_id))]
    async fn get_claim(&self, identity: Address, claim_id: B256) -> Result<ClaimRecord> {
        let ret = self
            .view(identity, IIdentity::getClaimCall { _claimId: claim_id })
            .await?;

        Ok(ClaimRecord {
            topic: ret.topic,
            scheme: ret.scheme,
            issuer: ret.issuer,
            signature: ret.signature,
            data: ret.data,
            uri: ret.uri,
        })
    }

    #[instrument(skip(self), fields(wallet = %wallet))]
    async fn deploy_identity(&self, wallet: Address) -> Result<TxHash> {
        let tx_hash = self
            .send(
                self.addresses.identity_gateway,
                IIdentityGateway::deployIdentityForWalletCall {
                    identityOwner: wallet,
                },
            )
            .await?;
        info!(tx_hash = %tx_hash, "Identity deployment submitted");
        Ok(tx_hash)
    }

    #[instrument(skip(self, submission), fields(identity = %identity, topic = submission.topic))]
    async fn add_claim(&self, identity: Address, submission: &ClaimSubmission) -> Result<TxHash> {
        let tx_hash = self
            .send(
                identity,
                IIdentity::addClaimCall {
                    _topic: U256::from(submission.topic),
                    _scheme: U256::from(submission.scheme),
                    _issuer: submission.issuer,
                    _signature: submission.signature.clone(),
                    _data: submission.data.clone(),
                    _uri: submission.uri.clone(),
                },
            )
            .await?;
        info!(tx_hash = %tx_hash, "addClaim submitted");
        Ok(tx_hash)
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>> {
        let receipt = self
            .provider
            .inner()
            .get_transaction_receipt(tx_hash)
            .await
            .context("Receipt query failed")?;

        Ok(receipt.map(|r| TxReceipt {
            tx_hash,
            block_number: r.block_number,
            success: r.status(),
        }))
    }

    async fn is_healthy(&self) -> bool {
        self.provider.is_healthy().await
    }
}
