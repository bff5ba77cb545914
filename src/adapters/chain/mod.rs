//! Chain Adapters - OnchainID Interaction Layer
//!
//! Provides on-chain access via alloy-rs 0.9 for:
//! - RPC provider management with a local signing wallet
//! - Identity factory, gateway and identity contract calls
//! - Contract code validation at startup

pub mod contracts;
pub mod provider;
pub mod validator;

pub use contracts::OnchainIdContracts;
pub use provider::EvmProvider;
pub use validator::ContractValidator;
