//! KYC Signing Service Adapter
//!
//! HTTP client for the off-chain attestation issuer. The service checks
//! the user's KYC status and returns an issuer signature that the
//! identity contract accepts in `addClaim`.
//!
//! Sub-modules:
//! - `client`: reqwest client implementing the `SigningService` port
//! - `types`: request/response wire types

pub mod client;
pub mod types;

pub use client::{SigningClient, SigningClientConfig};
