//! Standard decoder implementations.
//!
//! Decoders address wire data by 32-byte word index. Static types read their
//! word in place; dynamic types (`bytes`, `string`, variable-length arrays)
//! treat that word as a byte offset into the tail of the data.

use crate::{AbiError, CollectionDecoderFactory, TypeDecoder};
use alloy_primitives::{Address, I256, U256};
use proxy_types::{AbiValue, SolidityType};
use std::sync::Arc;

use crate::encoders::WORD;

fn word_at(data: &[u8], index: usize) -> Result<&[u8], AbiError> {
	let start = index
		.checked_mul(WORD)
		.ok_or_else(|| AbiError::Decode("word index overflow".to_string()))?;
	let end = start + WORD;
	if end > data.len() {
		return Err(AbiError::Decode(format!(
			"data of {} bytes has no word at index {index}",
			data.len()
		)));
	}
	Ok(&data[start..end])
}

fn usize_from_word(word: &[u8], what: &str) -> Result<usize, AbiError> {
	let value = U256::from_be_slice(word);
	usize::try_from(value).map_err(|_| AbiError::Decode(format!("{what} out of range")))
}

/// Follows the offset stored at `index` and reads the length word there.
/// Returns the length and the byte position of the payload.
fn dynamic_payload(data: &[u8], index: usize) -> Result<(usize, usize), AbiError> {
	let offset = usize_from_word(word_at(data, index)?, "offset")?;
	if offset % WORD != 0 || offset + WORD > data.len() {
		return Err(AbiError::Decode(format!("invalid tail offset {offset}")));
	}
	let length = usize_from_word(&data[offset..offset + WORD], "length")?;
	let payload = offset + WORD;
	if payload + length > data.len() {
		return Err(AbiError::Decode(format!(
			"payload of {length} bytes exceeds data"
		)));
	}
	Ok((length, payload))
}

/// Decoder for signed and unsigned integers of any width.
pub struct NumberDecoder;

impl TypeDecoder for NumberDecoder {
	fn decode(&self, data: &[u8], index: usize, ty: SolidityType) -> Result<AbiValue, AbiError> {
		let word = word_at(data, index)?;
		match ty {
			SolidityType::Uint(_) => Ok(AbiValue::Uint(U256::from_be_slice(word))),
			SolidityType::Int(_) => {
				let mut raw = [0u8; WORD];
				raw.copy_from_slice(word);
				Ok(AbiValue::Int(I256::from_be_bytes(raw)))
			}
			other => Err(AbiError::Decode(format!(
				"numeric decoder cannot produce {}",
				other.name()
			))),
		}
	}
}

pub struct BoolDecoder;

impl TypeDecoder for BoolDecoder {
	fn decode(&self, data: &[u8], index: usize, ty: SolidityType) -> Result<AbiValue, AbiError> {
		if ty != SolidityType::Bool {
			return Err(AbiError::Decode(format!(
				"boolean decoder cannot produce {}",
				ty.name()
			)));
		}
		let word = word_at(data, index)?;
		match word[WORD - 1] {
			0 => Ok(AbiValue::Bool(false)),
			1 => Ok(AbiValue::Bool(true)),
			other => Err(AbiError::Decode(format!("invalid boolean byte {other}"))),
		}
	}
}

/// Decoder for 20-byte account addresses.
pub struct AddressDecoder;

impl TypeDecoder for AddressDecoder {
	fn decode(&self, data: &[u8], index: usize, ty: SolidityType) -> Result<AbiValue, AbiError> {
		if ty != SolidityType::Address {
			return Err(AbiError::Decode(format!(
				"address decoder cannot produce {}",
				ty.name()
			)));
		}
		let word = word_at(data, index)?;
		Ok(AbiValue::Address(Address::from_slice(&word[WORD - 20..])))
	}
}

/// Decoder for `bytesN`, read from the start of the word.
pub struct StaticBytesDecoder;

impl TypeDecoder for StaticBytesDecoder {
	fn decode(&self, data: &[u8], index: usize, ty: SolidityType) -> Result<AbiValue, AbiError> {
		let SolidityType::FixedBytes(length) = ty else {
			return Err(AbiError::Decode(format!(
				"static bytes decoder cannot produce {}",
				ty.name()
			)));
		};
		let word = word_at(data, index)?;
		Ok(AbiValue::FixedBytes(word[..usize::from(length)].to_vec()))
	}
}

/// Decoder for the dynamic `bytes` type.
pub struct DynamicBytesDecoder;

impl TypeDecoder for DynamicBytesDecoder {
	fn decode(&self, data: &[u8], index: usize, ty: SolidityType) -> Result<AbiValue, AbiError> {
		if ty != SolidityType::Bytes {
			return Err(AbiError::Decode(format!(
				"dynamic bytes decoder cannot produce {}",
				ty.name()
			)));
		}
		let (length, payload) = dynamic_payload(data, index)?;
		Ok(AbiValue::Bytes(data[payload..payload + length].to_vec()))
	}
}

/// Decoder for UTF-8 strings carried as dynamic bytes.
pub struct StringDecoder;

impl TypeDecoder for StringDecoder {
	fn decode(&self, data: &[u8], index: usize, ty: SolidityType) -> Result<AbiValue, AbiError> {
		if ty != SolidityType::String {
			return Err(AbiError::Decode(format!(
				"string decoder cannot produce {}",
				ty.name()
			)));
		}
		let (length, payload) = dynamic_payload(data, index)?;
		let text = std::str::from_utf8(&data[payload..payload + length])
			.map_err(|err| AbiError::Decode(format!("invalid utf-8 string: {err}")))?;
		Ok(AbiValue::Str(text.to_string()))
	}
}

fn decode_element(
	inner: &[Arc<dyn TypeDecoder>],
	data: &[u8],
	index: usize,
	ty: SolidityType,
) -> Result<AbiValue, AbiError> {
	let mut last_error = AbiError::NoDecoderForType(ty.name());
	for decoder in inner {
		match decoder.decode(data, index, ty) {
			Ok(value) => return Ok(value),
			Err(err) => last_error = err,
		}
	}
	Err(last_error)
}

/// Array decoder covering both length encodings.
///
/// `size: None` reads a variable-length array through its tail offset;
/// `size: Some(n)` reads `n` elements in place. Length-prefixed scalar
/// payloads (`bytes`, `string`) are handed to the element decoder whole,
/// matching their wire representation as one prefixed sequence.
pub struct ArrayDecoder {
	inner: Vec<Arc<dyn TypeDecoder>>,
	size: Option<usize>,
}

impl TypeDecoder for ArrayDecoder {
	fn decode(&self, data: &[u8], index: usize, ty: SolidityType) -> Result<AbiValue, AbiError> {
		if matches!(ty, SolidityType::Bytes | SolidityType::String) {
			return decode_element(&self.inner, data, index, ty);
		}
		match self.size {
			None => {
				let offset = usize_from_word(word_at(data, index)?, "offset")?;
				if offset % WORD != 0 {
					return Err(AbiError::Decode(format!("invalid tail offset {offset}")));
				}
				let tail_index = offset / WORD;
				let length = usize_from_word(word_at(data, tail_index)?, "length")?;
				let mut elements = Vec::with_capacity(length);
				for position in 0..length {
					elements.push(decode_element(
						&self.inner,
						data,
						tail_index + 1 + position,
						ty,
					)?);
				}
				Ok(AbiValue::Array(elements))
			}
			Some(size) => {
				let mut elements = Vec::with_capacity(size);
				for position in 0..size {
					elements.push(decode_element(&self.inner, data, index + position, ty)?);
				}
				Ok(AbiValue::Array(elements))
			}
		}
	}
}

/// Factory producing the standard array decoders.
pub struct ArrayDecoderFactory;

impl CollectionDecoderFactory for ArrayDecoderFactory {
	fn dynamic(
		&self,
		inner: Vec<Arc<dyn TypeDecoder>>,
	) -> Result<Arc<dyn TypeDecoder>, AbiError> {
		if inner.is_empty() {
			return Err(AbiError::ConverterConstruction(
				"element decoder list is empty".to_string(),
			));
		}
		Ok(Arc::new(ArrayDecoder { inner, size: None }))
	}

	fn fixed(
		&self,
		inner: Vec<Arc<dyn TypeDecoder>>,
		size: usize,
	) -> Result<Arc<dyn TypeDecoder>, AbiError> {
		if inner.is_empty() {
			return Err(AbiError::ConverterConstruction(
				"element decoder list is empty".to_string(),
			));
		}
		Ok(Arc::new(ArrayDecoder {
			inner,
			size: Some(size),
		}))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn words(values: &[&[u8]]) -> Vec<u8> {
		let mut data = Vec::new();
		for value in values {
			let mut word = vec![0u8; WORD - value.len()];
			word.extend_from_slice(value);
			data.extend(word);
		}
		data
	}

	#[test]
	fn test_decode_uint_word() {
		let data = words(&[&[0x2a]]);
		let value = NumberDecoder.decode(&data, 0, SolidityType::Uint(256)).unwrap();
		assert_eq!(value, AbiValue::Uint(U256::from(42u64)));
	}

	#[test]
	fn test_decode_negative_int() {
		let data = vec![0xffu8; WORD];
		let value = NumberDecoder.decode(&data, 0, SolidityType::Int(256)).unwrap();
		assert_eq!(value, AbiValue::Int(I256::MINUS_ONE));
	}

	#[test]
	fn test_decode_bool_rejects_garbage() {
		let ok = words(&[&[0x01]]);
		assert_eq!(
			BoolDecoder.decode(&ok, 0, SolidityType::Bool).unwrap(),
			AbiValue::Bool(true)
		);
		let garbage = words(&[&[0x05]]);
		assert!(BoolDecoder.decode(&garbage, 0, SolidityType::Bool).is_err());
	}

	#[test]
	fn test_decode_address_from_padded_word() {
		let address = Address::repeat_byte(0xbb);
		let data = words(&[address.as_slice()]);
		let value = AddressDecoder.decode(&data, 0, SolidityType::Address).unwrap();
		assert_eq!(value, AbiValue::Address(address));
	}

	#[test]
	fn test_decode_dynamic_bytes_follows_offset() {
		// head: offset 32; tail: length 3, payload "abc"
		let mut data = words(&[&[0x20], &[0x03]]);
		let mut payload = b"abc".to_vec();
		payload.resize(WORD, 0);
		data.extend(payload);
		let value = DynamicBytesDecoder.decode(&data, 0, SolidityType::Bytes).unwrap();
		assert_eq!(value, AbiValue::Bytes(b"abc".to_vec()));
	}

	#[test]
	fn test_decode_rejects_truncated_payload() {
		// offset points at a length word claiming more data than present
		let data = words(&[&[0x20], &[0xff]]);
		assert!(DynamicBytesDecoder.decode(&data, 0, SolidityType::Bytes).is_err());
	}

	#[test]
	fn test_decode_dynamic_array() {
		// head: offset 32; tail: length 2, elements 7 and 9
		let data = words(&[&[0x20], &[0x02], &[0x07], &[0x09]]);
		let decoder = ArrayDecoderFactory
			.dynamic(vec![Arc::new(NumberDecoder)])
			.unwrap();
		let value = decoder.decode(&data, 0, SolidityType::Uint(256)).unwrap();
		assert_eq!(
			value,
			AbiValue::Array(vec![
				AbiValue::Uint(U256::from(7u64)),
				AbiValue::Uint(U256::from(9u64)),
			])
		);
	}

	#[test]
	fn test_decode_fixed_array_in_place() {
		let data = words(&[&[0x01], &[0x02]]);
		let decoder = ArrayDecoderFactory
			.fixed(vec![Arc::new(NumberDecoder)], 2)
			.unwrap();
		let value = decoder.decode(&data, 0, SolidityType::Uint(256)).unwrap();
		assert_eq!(
			value,
			AbiValue::Array(vec![
				AbiValue::Uint(U256::from(1u64)),
				AbiValue::Uint(U256::from(2u64)),
			])
		);
	}

	#[test]
	fn test_array_decoder_hands_bytes_payload_to_scalar() {
		let mut data = words(&[&[0x20], &[0x02]]);
		let mut payload = vec![0xde, 0xad];
		payload.resize(WORD, 0);
		data.extend(payload);
		let decoder = ArrayDecoderFactory
			.dynamic(vec![Arc::new(DynamicBytesDecoder)])
			.unwrap();
		let value = decoder.decode(&data, 0, SolidityType::Bytes).unwrap();
		assert_eq!(value, AbiValue::Bytes(vec![0xde, 0xad]));
	}
}
