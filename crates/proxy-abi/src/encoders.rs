//! Standard encoder implementations.
//!
//! Scalar encoders produce 32-byte words; dynamic types (`bytes`, `string`)
//! produce their tail encoding, a length word followed by right-padded data.
//! Assembling head offsets for a full call is the caller's concern.

use crate::{AbiError, CollectionEncoderFactory, TypeEncoder};
use alloy_primitives::{I256, U256};
use proxy_types::{AbiValue, SolidityType};
use std::sync::Arc;

pub(crate) const WORD: usize = 32;

fn uint_word(value: U256) -> Vec<u8> {
	value.to_be_bytes::<WORD>().to_vec()
}

/// Right-pads `data` with zeros to a whole number of words.
fn right_padded(data: &[u8]) -> Vec<u8> {
	let mut out = data.to_vec();
	let rem = out.len() % WORD;
	if rem != 0 {
		out.resize(out.len() + WORD - rem, 0);
	}
	out
}

fn length_prefixed(data: &[u8]) -> Vec<u8> {
	let mut out = uint_word(U256::from(data.len()));
	out.extend(right_padded(data));
	out
}

/// A signed value fits `width` bits when everything from its sign bit up is
/// a plain sign extension.
fn fits_signed_width(value: &I256, width: u16) -> bool {
	let shift = usize::from(width) - 1;
	let high = value.into_raw() >> shift;
	high == U256::ZERO || high == U256::MAX >> shift
}

/// Encoder for signed and unsigned integers of any width.
pub struct NumberEncoder;

impl TypeEncoder for NumberEncoder {
	fn accepts(&self, value: &AbiValue) -> bool {
		matches!(value, AbiValue::Uint(_) | AbiValue::Int(_))
	}

	fn encode(&self, value: &AbiValue, ty: SolidityType) -> Result<Vec<u8>, AbiError> {
		match (value, ty) {
			(AbiValue::Uint(v), SolidityType::Uint(width)) => {
				if width < 256 && v.bit_len() > usize::from(width) {
					return Err(AbiError::InvalidValue("uint", ty.name()));
				}
				Ok(uint_word(*v))
			}
			(AbiValue::Int(v), SolidityType::Int(width)) => {
				if width < 256 && !fits_signed_width(v, width) {
					return Err(AbiError::InvalidValue("int", ty.name()));
				}
				// Two's complement sign extension fills the full word.
				Ok(v.to_be_bytes::<WORD>().to_vec())
			}
			(value, ty) => Err(AbiError::InvalidValue(value.type_label(), ty.name())),
		}
	}
}

pub struct BoolEncoder;

impl TypeEncoder for BoolEncoder {
	fn accepts(&self, value: &AbiValue) -> bool {
		matches!(value, AbiValue::Bool(_))
	}

	fn encode(&self, value: &AbiValue, ty: SolidityType) -> Result<Vec<u8>, AbiError> {
		match (value, ty) {
			(AbiValue::Bool(flag), SolidityType::Bool) => {
				Ok(uint_word(U256::from(u8::from(*flag))))
			}
			(value, ty) => Err(AbiError::InvalidValue(value.type_label(), ty.name())),
		}
	}
}

/// Encoder for 20-byte account addresses, left-padded into one word.
pub struct AddressEncoder;

impl TypeEncoder for AddressEncoder {
	fn accepts(&self, value: &AbiValue) -> bool {
		matches!(value, AbiValue::Address(_))
	}

	fn encode(&self, value: &AbiValue, ty: SolidityType) -> Result<Vec<u8>, AbiError> {
		match (value, ty) {
			(AbiValue::Address(address), SolidityType::Address) => {
				let mut word = vec![0u8; WORD - address.len()];
				word.extend_from_slice(address.as_slice());
				Ok(word)
			}
			(value, ty) => Err(AbiError::InvalidValue(value.type_label(), ty.name())),
		}
	}
}

/// Encoder for `bytesN`, right-padded into one word.
pub struct StaticBytesEncoder;

impl TypeEncoder for StaticBytesEncoder {
	fn accepts(&self, value: &AbiValue) -> bool {
		matches!(value, AbiValue::FixedBytes(_) | AbiValue::Bytes(_))
	}

	fn encode(&self, value: &AbiValue, ty: SolidityType) -> Result<Vec<u8>, AbiError> {
		let bytes = match value {
			AbiValue::FixedBytes(bytes) | AbiValue::Bytes(bytes) => bytes,
			value => return Err(AbiError::InvalidValue(value.type_label(), ty.name())),
		};
		let SolidityType::FixedBytes(length) = ty else {
			return Err(AbiError::InvalidValue(value.type_label(), ty.name()));
		};
		if bytes.len() > usize::from(length) {
			return Err(AbiError::InvalidValue(value.type_label(), ty.name()));
		}
		let mut word = bytes.clone();
		word.resize(WORD, 0);
		Ok(word)
	}
}

/// Encoder for the dynamic `bytes` type.
pub struct DynamicBytesEncoder;

impl TypeEncoder for DynamicBytesEncoder {
	fn accepts(&self, value: &AbiValue) -> bool {
		matches!(value, AbiValue::Bytes(_) | AbiValue::FixedBytes(_))
	}

	fn encode(&self, value: &AbiValue, ty: SolidityType) -> Result<Vec<u8>, AbiError> {
		match (value, ty) {
			(AbiValue::Bytes(bytes) | AbiValue::FixedBytes(bytes), SolidityType::Bytes) => {
				Ok(length_prefixed(bytes))
			}
			(value, ty) => Err(AbiError::InvalidValue(value.type_label(), ty.name())),
		}
	}
}

/// Encoder for UTF-8 strings, encoded as dynamic bytes.
pub struct StringEncoder;

impl TypeEncoder for StringEncoder {
	fn accepts(&self, value: &AbiValue) -> bool {
		matches!(value, AbiValue::Str(_))
	}

	fn encode(&self, value: &AbiValue, ty: SolidityType) -> Result<Vec<u8>, AbiError> {
		match (value, ty) {
			(AbiValue::Str(text), SolidityType::String) => Ok(length_prefixed(text.as_bytes())),
			(value, ty) => Err(AbiError::InvalidValue(value.type_label(), ty.name())),
		}
	}
}

fn encode_element(
	inner: &[Arc<dyn TypeEncoder>],
	element: &AbiValue,
	ty: SolidityType,
) -> Result<Vec<u8>, AbiError> {
	let encoder = inner
		.iter()
		.find(|encoder| encoder.accepts(element))
		.ok_or_else(|| AbiError::NoEncoderForType(ty.name()))?;
	encoder.encode(element, ty)
}

/// Variable-length array encoder: a length word followed by the elements.
pub struct DynamicArrayEncoder {
	inner: Vec<Arc<dyn TypeEncoder>>,
}

impl TypeEncoder for DynamicArrayEncoder {
	fn accepts(&self, value: &AbiValue) -> bool {
		matches!(value, AbiValue::Array(_))
	}

	fn encode(&self, value: &AbiValue, ty: SolidityType) -> Result<Vec<u8>, AbiError> {
		let AbiValue::Array(elements) = value else {
			return Err(AbiError::InvalidValue(value.type_label(), ty.name()));
		};
		let mut out = uint_word(U256::from(elements.len()));
		for element in elements {
			out.extend(encode_element(&self.inner, element, ty)?);
		}
		Ok(out)
	}
}

/// Fixed-length array encoder: exactly `size` elements, no length word.
pub struct FixedArrayEncoder {
	inner: Vec<Arc<dyn TypeEncoder>>,
	size: usize,
}

impl TypeEncoder for FixedArrayEncoder {
	fn accepts(&self, value: &AbiValue) -> bool {
		matches!(value, AbiValue::Array(elements) if elements.len() == self.size)
	}

	fn encode(&self, value: &AbiValue, ty: SolidityType) -> Result<Vec<u8>, AbiError> {
		let AbiValue::Array(elements) = value else {
			return Err(AbiError::InvalidValue(value.type_label(), ty.name()));
		};
		if elements.len() != self.size {
			return Err(AbiError::InvalidValue(value.type_label(), ty.name()));
		}
		let mut out = Vec::with_capacity(self.size * WORD);
		for element in elements {
			out.extend(encode_element(&self.inner, element, ty)?);
		}
		Ok(out)
	}
}

/// Factory producing the standard array encoders.
pub struct ArrayEncoderFactory;

impl CollectionEncoderFactory for ArrayEncoderFactory {
	fn dynamic(
		&self,
		inner: Vec<Arc<dyn TypeEncoder>>,
	) -> Result<Arc<dyn TypeEncoder>, AbiError> {
		if inner.is_empty() {
			return Err(AbiError::ConverterConstruction(
				"element encoder list is empty".to_string(),
			));
		}
		Ok(Arc::new(DynamicArrayEncoder { inner }))
	}

	fn fixed(
		&self,
		inner: Vec<Arc<dyn TypeEncoder>>,
		size: usize,
	) -> Result<Arc<dyn TypeEncoder>, AbiError> {
		if inner.is_empty() {
			return Err(AbiError::ConverterConstruction(
				"element encoder list is empty".to_string(),
			));
		}
		Ok(Arc::new(FixedArrayEncoder { inner, size }))
	}
}
