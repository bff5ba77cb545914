//! Chain Client Port - OnchainID Contract Interface
//!
//! Reads and writes against the identity factory, the deployment
//! gateway and per-wallet identity contracts. Implemented over
//! alloy-rs in `adapters::chain`.

use alloy::primitives::{Address, Bytes, TxHash, B256};
use async_trait::async_trait;

use crate::domain::claim::{ClaimRecord, SignedClaim};

/// Arguments of an `addClaim` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSubmission {
  /// Claim topic.
  pub topic: u64,
  /// Signature scheme (1 = ECDSA).
  pub scheme: u64,
  /// Issuer that signed the claim.
  pub issuer: Address,
  /// Packed `r || s || v` signature.
  pub signature: Bytes,
  /// Claim data (the signed data hash).
  pub data: Bytes,
  /// Optional claim URI.
  pub uri: String,
}

impl ClaimSubmission {
  /// Build the call arguments from a signing-service attestation.
  pub fn from_signed(claim: &SignedClaim, scheme: u64) -> Self {
    Self {
      topic: claim.topic,
      scheme,
      issuer: claim.issuer,
      signature: claim.signature.to_bytes(),
      data: Bytes::copy_from_slice(claim.data_hash.as_slice()),
      uri: String::new(),
    }
  }
}

/// Mined transaction outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
  /// Transaction hash.
  pub tx_hash: TxHash,
  /// Block the transaction was included in.
  pub block_number: Option<u64>,
  /// `false` when the transaction reverted.
  pub success: bool,
}

/// Trait for OnchainID contract interactions.
#[async_trait]
pub trait IdentityChain: Send + Sync + 'static {
  /// Factory `getIdentity(wallet)`. Returns the zero address when unbound.
  async fn get_identity(&self, wallet: Address) -> anyhow::Result<Address>;

  /// Identity `getClaim(claimId)`. Unknown ids return an all-zero record.
  async fn get_claim(&self, identity: Address, claim_id: B256) -> anyhow::Result<ClaimRecord>;

  /// Gateway `deployIdentityForWallet(wallet)`, sent from the connected account.
  async fn deploy_identity(&self, wallet: Address) -> anyhow::Result<TxHash>;

  /// Identity `addClaim(...)`, sent from the connected account.
  async fn add_claim(
    &self,
    identity: Address,
    submission: &ClaimSubmission,
  ) -> anyhow::Result<TxHash>;

  /// Receipt lookup. `None` while the transaction is not yet mined.
  async fn transaction_receipt(&self, tx_hash: TxHash) -> anyhow::Result<Option<TxReceipt>>;

  /// Check if the RPC connection is healthy.
  async fn is_healthy(&self) -> bool;
}
