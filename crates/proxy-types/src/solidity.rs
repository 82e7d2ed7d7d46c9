//! ABI type enumeration and host-value representation.
//!
//! `SolidityType` names the primitive wire types of the contract runtime.
//! `SolidityTypeGroup` is the coarser key the converter registry is indexed
//! by: all integer widths share one group, so a single numeric converter
//! covers `uint8` through `uint256`.

use alloy_primitives::{Address, I256, U256};
use serde::{Deserialize, Serialize};

/// Primitive ABI type, parameterised over its width where applicable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolidityType {
	/// Unsigned integer of the given bit width (8..=256, multiple of 8).
	Uint(u16),
	/// Signed integer of the given bit width.
	Int(u16),
	Bool,
	Address,
	/// Dynamic byte sequence.
	Bytes,
	/// Fixed byte sequence of the given length (1..=32).
	FixedBytes(u8),
	String,
}

impl SolidityType {
	/// Parses a canonical ABI type name such as `uint256`, `bytes32` or
	/// `address`. Bare `uint`/`int` default to 256 bits.
	pub fn parse(name: &str) -> Option<Self> {
		match name {
			"bool" => return Some(SolidityType::Bool),
			"address" => return Some(SolidityType::Address),
			"string" => return Some(SolidityType::String),
			"bytes" => return Some(SolidityType::Bytes),
			"uint" => return Some(SolidityType::Uint(256)),
			"int" => return Some(SolidityType::Int(256)),
			_ => {}
		}
		if let Some(width) = name.strip_prefix("uint") {
			return parse_int_width(width).map(SolidityType::Uint);
		}
		if let Some(width) = name.strip_prefix("int") {
			return parse_int_width(width).map(SolidityType::Int);
		}
		if let Some(length) = name.strip_prefix("bytes") {
			let length: u8 = length.parse().ok()?;
			if (1..=32).contains(&length) {
				return Some(SolidityType::FixedBytes(length));
			}
		}
		None
	}

	/// The canonical ABI name of this type.
	pub fn name(&self) -> String {
		match self {
			SolidityType::Uint(width) => format!("uint{width}"),
			SolidityType::Int(width) => format!("int{width}"),
			SolidityType::Bool => "bool".to_string(),
			SolidityType::Address => "address".to_string(),
			SolidityType::Bytes => "bytes".to_string(),
			SolidityType::FixedBytes(length) => format!("bytes{length}"),
			SolidityType::String => "string".to_string(),
		}
	}
}

fn parse_int_width(suffix: &str) -> Option<u16> {
	let width: u16 = suffix.parse().ok()?;
	if width % 8 == 0 && (8..=256).contains(&width) {
		Some(width)
	} else {
		None
	}
}

/// Converter-registry key grouping wire types with a shared representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolidityTypeGroup {
	/// All signed and unsigned integer widths.
	Numeric,
	Boolean,
	Address,
	/// The dynamic `bytes` type.
	DynamicBytes,
	/// The fixed `bytesN` types.
	StaticBytes,
	/// The `string` type.
	Text,
}

impl SolidityTypeGroup {
	pub fn of(ty: SolidityType) -> Self {
		match ty {
			SolidityType::Uint(_) | SolidityType::Int(_) => SolidityTypeGroup::Numeric,
			SolidityType::Bool => SolidityTypeGroup::Boolean,
			SolidityType::Address => SolidityTypeGroup::Address,
			SolidityType::Bytes => SolidityTypeGroup::DynamicBytes,
			SolidityType::FixedBytes(_) => SolidityTypeGroup::StaticBytes,
			SolidityType::String => SolidityTypeGroup::Text,
		}
	}
}

/// One parameter of a contract operation as declared in its interface.
///
/// `is_dynamic && is_array` is a variable-length array;
/// `!is_dynamic && is_array` is a fixed-length array of `array_size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParam {
	/// Canonical name of the element type, e.g. `uint256`.
	pub type_name: String,
	pub is_array: bool,
	pub is_dynamic: bool,
	pub array_size: usize,
}

impl AbiParam {
	pub fn scalar(type_name: impl Into<String>) -> Self {
		Self {
			type_name: type_name.into(),
			is_array: false,
			is_dynamic: false,
			array_size: 0,
		}
	}

	pub fn dynamic_array(type_name: impl Into<String>) -> Self {
		Self {
			type_name: type_name.into(),
			is_array: true,
			is_dynamic: true,
			array_size: 0,
		}
	}

	pub fn fixed_array(type_name: impl Into<String>, array_size: usize) -> Self {
		Self {
			type_name: type_name.into(),
			is_array: true,
			is_dynamic: false,
			array_size,
		}
	}

	/// The declared element type, if the name is a known primitive.
	pub fn solidity_type(&self) -> Option<SolidityType> {
		SolidityType::parse(&self.type_name)
	}
}

/// Typed host-side value handed to encoders and produced by decoders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
	Uint(U256),
	Int(I256),
	Bool(bool),
	Address(Address),
	FixedBytes(Vec<u8>),
	Bytes(Vec<u8>),
	Str(String),
	Array(Vec<AbiValue>),
}

impl AbiValue {
	/// Short label used in error messages about unmatched arguments.
	pub fn type_label(&self) -> &'static str {
		match self {
			AbiValue::Uint(_) => "uint",
			AbiValue::Int(_) => "int",
			AbiValue::Bool(_) => "bool",
			AbiValue::Address(_) => "address",
			AbiValue::FixedBytes(_) => "fixed bytes",
			AbiValue::Bytes(_) => "bytes",
			AbiValue::Str(_) => "string",
			AbiValue::Array(_) => "array",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_canonical_names() {
		assert_eq!(SolidityType::parse("uint256"), Some(SolidityType::Uint(256)));
		assert_eq!(SolidityType::parse("uint"), Some(SolidityType::Uint(256)));
		assert_eq!(SolidityType::parse("int8"), Some(SolidityType::Int(8)));
		assert_eq!(SolidityType::parse("bool"), Some(SolidityType::Bool));
		assert_eq!(SolidityType::parse("address"), Some(SolidityType::Address));
		assert_eq!(SolidityType::parse("bytes"), Some(SolidityType::Bytes));
		assert_eq!(
			SolidityType::parse("bytes32"),
			Some(SolidityType::FixedBytes(32))
		);
		assert_eq!(SolidityType::parse("string"), Some(SolidityType::String));
	}

	#[test]
	fn test_parse_rejects_invalid_widths() {
		assert_eq!(SolidityType::parse("uint7"), None);
		assert_eq!(SolidityType::parse("uint512"), None);
		assert_eq!(SolidityType::parse("bytes0"), None);
		assert_eq!(SolidityType::parse("bytes33"), None);
		assert_eq!(SolidityType::parse("fixed128"), None);
	}

	#[test]
	fn test_integer_widths_share_a_group() {
		assert_eq!(
			SolidityTypeGroup::of(SolidityType::Uint(8)),
			SolidityTypeGroup::Numeric
		);
		assert_eq!(
			SolidityTypeGroup::of(SolidityType::Int(256)),
			SolidityTypeGroup::Numeric
		);
		assert_ne!(
			SolidityTypeGroup::of(SolidityType::Bytes),
			SolidityTypeGroup::of(SolidityType::FixedBytes(32))
		);
	}

	#[test]
	fn test_round_trip_names() {
		for name in ["uint256", "int64", "bool", "address", "bytes", "bytes4", "string"] {
			let ty = SolidityType::parse(name).unwrap();
			assert_eq!(ty.name(), name);
		}
	}
}
