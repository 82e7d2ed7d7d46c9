//! Currency, nonce and gas units.
//!
//! These are thin newtypes over the alloy primitives. They exist so that a
//! nonce cannot be passed where an amount is expected, and so that arithmetic
//! rules (saturation at the protocol maximum) live in exactly one place.

use alloy_primitives::ruint::UintTryFrom;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Amount of currency in its smallest unit (wei).
///
/// Arithmetic saturates at the protocol maximum instead of wrapping.
#[derive(
	Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Value(U256);

impl Value {
	/// Creates a value from an amount expressed in wei.
	pub fn wei<T>(amount: T) -> Self
	where
		U256: UintTryFrom<T>,
	{
		Self(U256::from(amount))
	}

	/// The additive identity, `wei(0)`.
	pub fn zero() -> Self {
		Self(U256::ZERO)
	}

	pub fn is_zero(&self) -> bool {
		self.0.is_zero()
	}

	pub fn saturating_add(self, other: Value) -> Value {
		Value(self.0.saturating_add(other.0))
	}

	pub fn as_u256(&self) -> U256 {
		self.0
	}
}

impl std::fmt::Display for Value {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} wei", self.0)
	}
}

/// Per-account transaction counter.
///
/// A tracked nonce never decreases once a higher value has been observed
/// from the backend; that invariant is enforced by the tracker, not here.
#[derive(
	Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Nonce(u64);

impl Nonce {
	pub fn new(value: u64) -> Self {
		Self(value)
	}

	pub fn value(&self) -> u64 {
		self.0
	}

	/// Returns a new nonce offset by the given number of in-flight
	/// transactions.
	pub fn add(&self, offset: u32) -> Nonce {
		Nonce(self.0.saturating_add(u64::from(offset)))
	}
}

impl std::fmt::Display for Nonce {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.0.fmt(f)
	}
}

/// Gas consumed or budgeted for a transaction.
#[derive(
	Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct GasUsage(U256);

impl GasUsage {
	pub fn new<T>(units: T) -> Self
	where
		U256: UintTryFrom<T>,
	{
		Self(U256::from(units))
	}

	/// Adds a flat number of gas units, saturating at the maximum.
	pub fn add(self, extra: u64) -> GasUsage {
		GasUsage(self.0.saturating_add(U256::from(extra)))
	}

	pub fn as_u256(&self) -> U256 {
		self.0
	}
}

/// Price per gas unit in wei.
#[derive(
	Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct GasPrice(U256);

impl GasPrice {
	pub fn in_wei<T>(price: T) -> Self
	where
		U256: UintTryFrom<T>,
	{
		Self(U256::from(price))
	}

	pub fn as_u256(&self) -> U256 {
		self.0
	}
}
