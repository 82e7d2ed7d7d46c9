//! Common types module for the contract-interaction proxy.
//!
//! This crate defines the data model shared by every other crate in the
//! workspace: currency and gas units, transaction and block records, and the
//! ABI type enumeration used by the converter registry. Keeping them in one
//! place ensures all components agree on identity and equality semantics.

/// ABI type enumeration and host-value representation.
pub mod solidity;
/// Transaction, block, receipt and event records.
pub mod transaction;
/// Currency, nonce and gas units.
pub mod units;

// Re-export all types for convenient access
pub use solidity::*;
pub use transaction::*;
pub use units::*;

// The proxy builds on the alloy primitive types rather than redefining its
// own byte containers.
pub use alloy_primitives::{Address, Bytes, TxKind, B256, I256, U256};

/// 32-byte transaction identifier.
pub type TxHash = B256;

/// 32-byte block identifier.
pub type BlockHash = B256;
