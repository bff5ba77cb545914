//! Onboarding progress state machine.
//!
//! The onboarding flow is a forward-only progression per wallet session:
//!
//! ```text
//! WalletDisconnected → IdentityPending → KycPending → ClaimPending → Complete
//! ```
//!
//! `ProgressState` carries the data each stage needs; `apply` is the only
//! way to move between stages. Events that do not apply to the current
//! stage leave it unchanged, which is how actions are gated.
//!
//! `Complete` is only ever entered from a valid claim read (or the
//! persisted KYC latch). A confirmed `addClaim` receipt is not trusted
//! on its own.

use std::fmt;

use alloy::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};

use super::claim::SignedClaim;

/// User-triggered onboarding actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Deploy an identity contract for the wallet through the gateway.
    DeployIdentity,
    /// Ask the signing service for a KYC attestation.
    RequestSignature,
    /// Submit the attestation to the identity contract.
    SubmitClaim,
}

impl Action {
    /// Actions in flow order.
    pub const ALL: [Self; 3] = [Self::DeployIdentity, Self::RequestSignature, Self::SubmitClaim];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeployIdentity => "deploy-identity",
            Self::RequestSignature => "request-signature",
            Self::SubmitClaim => "submit-claim",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage without payload, used for display and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    WalletDisconnected,
    IdentityPending,
    KycPending,
    ClaimPending,
    Complete,
}

/// Observed facts a stage can be derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressFlags {
    pub wallet_connected: bool,
    pub has_identity: bool,
    pub has_kyc_claim: bool,
    pub signature_obtained: bool,
    pub claim_tx_confirmed: bool,
}

impl ProgressStage {
    /// One-based step shown to the user (connect, identity, KYC, done).
    pub const fn step(self) -> u8 {
        match self {
            Self::WalletDisconnected => 1,
            Self::IdentityPending => 2,
            Self::KycPending | Self::ClaimPending => 3,
            Self::Complete => 4,
        }
    }

    pub const fn percent(self) -> u8 {
        match self {
            Self::WalletDisconnected => 0,
            Self::IdentityPending => 25,
            Self::KycPending => 50,
            Self::ClaimPending => 75,
            Self::Complete => 100,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WalletDisconnected => "wallet_disconnected",
            Self::IdentityPending => "identity_pending",
            Self::KycPending => "kyc_pending",
            Self::ClaimPending => "claim_pending",
            Self::Complete => "complete",
        }
    }

    /// Derive the stage from observed facts.
    ///
    /// A confirmed claim transaction without a valid claim read stays in
    /// `ClaimPending`.
    pub const fn from_flags(flags: ProgressFlags) -> Self {
        if !flags.wallet_connected {
            Self::WalletDisconnected
        } else if flags.has_kyc_claim {
            Self::Complete
        } else if !flags.has_identity {
            Self::IdentityPending
        } else if flags.signature_obtained || flags.claim_tx_confirmed {
            Self::ClaimPending
        } else {
            Self::KycPending
        }
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Onboarding state for the current wallet session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ProgressState {
    #[default]
    WalletDisconnected,
    IdentityPending {
        wallet: Address,
        /// Identity latch is set; deployment must not be offered again.
        ever_had_identity: bool,
    },
    KycPending {
        wallet: Address,
        identity: Address,
    },
    ClaimPending {
        wallet: Address,
        identity: Address,
        claim: SignedClaim,
        /// Submitted `addClaim` transaction awaiting a valid claim read.
        claim_tx: Option<TxHash>,
    },
    Complete {
        wallet: Address,
        identity: Option<Address>,
    },
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Wallet connected, with its persisted latches.
    WalletConnected {
        wallet: Address,
        ever_had_identity: bool,
        kyc_latched: bool,
    },
    WalletDisconnected,
    /// Factory lookup result; `None` means the zero address came back.
    IdentityObserved(Option<Address>),
    /// Deployment transaction confirmed before the factory reports it.
    IdentityDeployed,
    /// Claim read result after classification.
    ClaimObserved { valid: bool },
    SignatureObtained(SignedClaim),
    ClaimSubmitted(TxHash),
    /// Claim transaction reverted or was never mined; submission reopens.
    ClaimTxFailed,
}

impl ProgressState {
    pub const fn stage(&self) -> ProgressStage {
        match self {
            Self::WalletDisconnected => ProgressStage::WalletDisconnected,
            Self::IdentityPending { .. } => ProgressStage::IdentityPending,
            Self::KycPending { .. } => ProgressStage::KycPending,
            Self::ClaimPending { .. } => ProgressStage::ClaimPending,
            Self::Complete { .. } => ProgressStage::Complete,
        }
    }

    pub const fn wallet(&self) -> Option<Address> {
        match self {
            Self::WalletDisconnected => None,
            Self::IdentityPending { wallet, .. }
            | Self::KycPending { wallet, .. }
            | Self::ClaimPending { wallet, .. }
            | Self::Complete { wallet, .. } => Some(*wallet),
        }
    }

    pub const fn identity(&self) -> Option<Address> {
        match self {
            Self::WalletDisconnected | Self::IdentityPending { .. } => None,
            Self::KycPending { identity, .. } | Self::ClaimPending { identity, .. } => {
                Some(*identity)
            }
            Self::Complete { identity, .. } => *identity,
        }
    }

    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    /// Facts this state implies, for cross-checking against `from_flags`.
    pub const fn flags(&self) -> ProgressFlags {
        ProgressFlags {
            wallet_connected: self.wallet().is_some(),
            has_identity: self.identity().is_some(),
            has_kyc_claim: self.is_complete(),
            signature_obtained: matches!(self, Self::ClaimPending { .. }),
            claim_tx_confirmed: false,
        }
    }

    /// Whether `action` is offered in this state.
    pub const fn allows(&self, action: Action) -> bool {
        match action {
            Action::DeployIdentity => matches!(
                self,
                Self::IdentityPending {
                    ever_had_identity: false,
                    ..
                }
            ),
            Action::RequestSignature => matches!(self, Self::KycPending { .. }),
            Action::SubmitClaim => matches!(self, Self::ClaimPending { claim_tx: None, .. }),
        }
    }

    /// Apply an event and return the next state.
    #[must_use]
    pub fn apply(self, event: ProgressEvent) -> Self {
        match event {
            ProgressEvent::WalletDisconnected => Self::WalletDisconnected,
            ProgressEvent::WalletConnected {
                wallet,
                ever_had_identity,
                kyc_latched,
            } => self.on_connect(wallet, ever_had_identity, kyc_latched),
            ProgressEvent::ClaimObserved { valid: true } => match self.wallet() {
                Some(wallet) => Self::Complete {
                    wallet,
                    identity: self.identity(),
                },
                None => self,
            },
            ProgressEvent::ClaimObserved { valid: false } => self,
            ProgressEvent::IdentityObserved(Some(observed)) => match self {
                Self::IdentityPending { wallet, .. } => Self::KycPending {
                    wallet,
                    identity: observed,
                },
                Self::Complete {
                    wallet,
                    identity: None,
                } => Self::Complete {
                    wallet,
                    identity: Some(observed),
                },
                other => other,
            },
            ProgressEvent::IdentityObserved(None) => self,
            ProgressEvent::IdentityDeployed => match self {
                Self::IdentityPending { wallet, .. } => Self::IdentityPending {
                    wallet,
                    ever_had_identity: true,
                },
                other => other,
            },
            ProgressEvent::SignatureObtained(claim) => match self {
                Self::KycPending { wallet, identity } => Self::ClaimPending {
                    wallet,
                    identity,
                    claim,
                    claim_tx: None,
                },
                other => other,
            },
            ProgressEvent::ClaimSubmitted(tx_hash) => match self {
                Self::ClaimPending {
                    wallet,
                    identity,
                    claim,
                    claim_tx: None,
                } => Self::ClaimPending {
                    wallet,
                    identity,
                    claim,
                    claim_tx: Some(tx_hash),
                },
                other => other,
            },
            ProgressEvent::ClaimTxFailed => match self {
                Self::ClaimPending {
                    wallet,
                    identity,
                    claim,
                    ..
                } => Self::ClaimPending {
                    wallet,
                    identity,
                    claim,
                    claim_tx: None,
                },
                other => other,
            },
        }
    }

    fn on_connect(self, wallet: Address, ever_had_identity: bool, kyc_latched: bool) -> Self {
        if self.wallet() == Some(wallet) {
            return match self {
                Self::Complete { .. } => self,
                _ if kyc_latched => Self::Complete {
                    wallet,
                    identity: self.identity(),
                },
                Self::IdentityPending {
                    wallet,
                    ever_had_identity: latched,
                } => Self::IdentityPending {
                    wallet,
                    ever_had_identity: latched || ever_had_identity,
                },
                other => other,
            };
        }

        if kyc_latched {
            Self::Complete {
                wallet,
                identity: None,
            }
        } else {
            Self::IdentityPending {
                wallet,
                ever_had_identity,
            }
        }
    }
}
