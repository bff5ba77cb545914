//! Domain layer - Identity, claim and onboarding progress models.
//!
//! Pure logic for the KYC progression tracker: claim-id derivation,
//! claim validity classification, the per-wallet identity view with its
//! persisted latches, and the onboarding state machine.
//! No I/O here (hexagonal architecture inner ring).

pub mod claim;
pub mod error;
pub mod identity;
pub mod progress;

// Re-export core types for convenience
pub use claim::{ClaimRecord, ClaimSignature, ClaimStatus, SignedClaim};
pub use error::{SigningError, StepError};
pub use identity::{Latch, WalletIdentity};
pub use progress::{Action, ProgressEvent, ProgressFlags, ProgressStage, ProgressState};
