//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, blockchain RPC, file I/O) and
//! exposes the tracker over HTTP. Each sub-module groups adapters by
//! infrastructure concern.
//!
//! Adapter categories:
//! - `chain`: OnchainID contracts via alloy-rs
//! - `http`: axum server for progress, actions, probes and metrics
//! - `metrics`: Prometheus metrics export and health checks
//! - `persistence`: Durable latch storage
//! - `signing`: KYC signing service client

pub mod chain;
pub mod http;
pub mod metrics;
pub mod persistence;
pub mod signing;
