//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the domain/usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `IdentityChain`: OnchainID factory, gateway and identity contracts
//! - `SigningService`: Off-chain KYC attestation issuer
//! - `LatchStore`: Durable per-wallet one-way flags

pub mod chain_client;
pub mod latch_store;
pub mod signing_service;
