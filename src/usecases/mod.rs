//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! onboarding workflow. Each use case is a self-contained operation.
//!
//! Use cases:
//! - `IdentityReader`: Factory lookup, with settling re-reads after deployment
//! - `ClaimReader`: Claim lookup and issuer/topic validation
//! - `SignatureRequester`: Off-chain attestation with a client deadline
//! - `ClaimWriter`: `addClaim` submission and receipt tracking
//! - `TransactionMonitor`: Receipt polling shared by both writes
//! - `ProgressTracker`: State machine plus durable latches
//! - `OnboardingSession`: One wallet session, actions and polling

pub mod backoff;
pub mod claim_reader;
pub mod claim_writer;
pub mod identity_reader;
pub mod onboarding;
pub mod progress_tracker;
pub mod signature_requester;
pub mod transaction_monitor;

pub use onboarding::{OnboardingSession, ProgressSnapshot};
