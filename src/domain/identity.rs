//! Wallet identity view and persisted latches.
//!
//! A wallet owns at most one OnchainID contract, looked up through the
//! identity factory. The factory answers with the zero address when no
//! identity is bound, so lookups are normalised to `Option<Address>`
//! before they reach the state machine.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// Lightweight wallet identifier used at the ports boundary.
pub type WalletAddress = Address;

/// Lightweight identity contract identifier used at the ports boundary.
pub type IdentityAddress = Address;

/// One-way flags persisted per wallet.
///
/// Once written they are never cleared by this crate. The key layout is
/// shared with the browser dashboard so both read the same storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Latch {
    /// The wallet has had an identity contract at least once.
    EverHadIdentity,
    /// A valid KYC claim was observed on the wallet's identity.
    EverCompletedKyc,
}

impl Latch {
    /// Storage key prefix, followed by the checksummed wallet address.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::EverHadIdentity => "hasEverHadOnchainID_",
            Self::EverCompletedKyc => "hasEverCompletedKYC_",
        }
    }

    /// Full storage key for a wallet.
    pub fn key(self, wallet: &WalletAddress) -> String {
        format!("{}{wallet}", self.prefix())
    }
}

/// Normalise a factory lookup: the zero address means "no identity".
pub fn identity_from_lookup(raw: Address) -> Option<IdentityAddress> {
    (!raw.is_zero()).then_some(raw)
}

/// What the tracker knows about a connected wallet's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletIdentity {
    /// Connected wallet.
    pub wallet: WalletAddress,
    /// Bound identity contract, once observed.
    pub identity: Option<IdentityAddress>,
    /// Persisted latch: an identity has been seen for this wallet before.
    pub ever_had_identity: bool,
}

impl WalletIdentity {
    /// Start a view for a freshly connected wallet.
    pub const fn new(wallet: WalletAddress, ever_had_identity: bool) -> Self {
        Self {
            wallet,
            identity: None,
            ever_had_identity,
        }
    }

    /// Fold a lookup result into the view.
    ///
    /// An absent result never erases an identity that was already seen.
    /// Returns `true` when the latch flips for the first time and has to
    /// be persisted.
    pub fn observe(&mut self, lookup: Option<IdentityAddress>) -> bool {
        let Some(identity) = lookup else {
            return false;
        };
        self.identity = Some(identity);
        let newly_latched = !self.ever_had_identity;
        self.ever_had_identity = true;
        newly_latched
    }

    /// Latch a deployment whose transaction confirmed before the factory
    /// reports the identity. Returns `true` when the latch flips.
    pub fn mark_deployed(&mut self) -> bool {
        let newly_latched = !self.ever_had_identity;
        self.ever_had_identity = true;
        newly_latched
    }

    /// Whether the "create identity" action may be offered.
    pub const fn can_create_identity(&self) -> bool {
        self.identity.is_none() && !self.ever_had_identity
    }
}
