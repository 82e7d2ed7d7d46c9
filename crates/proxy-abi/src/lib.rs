//! ABI conversion module for the contract-interaction proxy.
//!
//! This crate maps between typed host values (`AbiValue`) and the wire-level
//! encoding used by the contract runtime. Conversion is driven by a registry
//! of per-type-group converters: scalar encoders and decoders are registered
//! against a `SolidityTypeGroup`, and collection converters are built on
//! demand by factories parameterised over the scalar converters of the
//! element type.

/// Contract deployment details and constructor matching.
pub mod contract;
/// Standard decoder implementations.
pub mod decoders;
/// Standard encoder implementations.
pub mod encoders;
mod registry;

pub use contract::{ConstructorSpec, ContractDetails};
pub use registry::ConverterRegistry;

use proxy_types::{AbiValue, EventData, SolidityType};
use std::sync::Arc;
use thiserror::Error;

/// Errors produced by the converter registry and the converters themselves.
#[derive(Debug, Clone, Error)]
pub enum AbiError {
	/// The declared type name matches no known primitive.
	#[error("unknown solidity type: {0}")]
	UnknownType(String),
	#[error("no encoder registered for solidity type {0}")]
	NoEncoderForType(String),
	#[error("no decoder registered for solidity type {0}")]
	NoDecoderForType(String),
	/// A collection-converter factory could not be instantiated.
	#[error("failed to construct collection converter: {0}")]
	ConverterConstruction(String),
	/// Supplied arguments match no declared constructor.
	#[error("no constructor found with params ({0})")]
	NoConstructorMatch(String),
	/// The host value cannot be represented as the target wire type.
	#[error("cannot encode {0} value as {1}")]
	InvalidValue(&'static str, String),
	#[error("malformed wire data: {0}")]
	Decode(String),
}

/// Encodes one host value into its wire representation.
///
/// Converters for a type group are tried in registration order; the first
/// whose `accepts` returns true handles the value. This lets one wire type
/// admit several host representations.
pub trait TypeEncoder: Send + Sync {
	/// Whether this encoder can handle the given host value.
	fn accepts(&self, value: &AbiValue) -> bool;

	/// Encodes the value for the given target type.
	fn encode(&self, value: &AbiValue, ty: SolidityType) -> Result<Vec<u8>, AbiError>;
}

/// Decodes wire data back into a host value.
///
/// `index` is the 32-byte word position of the value's head slot; dynamic
/// types follow the offset stored there into the tail of `data`.
pub trait TypeDecoder: Send + Sync {
	fn decode(&self, data: &[u8], index: usize, ty: SolidityType) -> Result<AbiValue, AbiError>;
}

/// Builds collection encoders around the scalar encoders of an element type.
///
/// Variable-length and fixed-length arrays use different length encodings on
/// the wire, hence the two construction shapes.
pub trait CollectionEncoderFactory: Send + Sync {
	/// Builds an encoder for a variable-length array.
	fn dynamic(&self, inner: Vec<Arc<dyn TypeEncoder>>)
		-> Result<Arc<dyn TypeEncoder>, AbiError>;

	/// Builds an encoder for a fixed-length array of `size` elements.
	fn fixed(
		&self,
		inner: Vec<Arc<dyn TypeEncoder>>,
		size: usize,
	) -> Result<Arc<dyn TypeEncoder>, AbiError>;
}

/// Builds collection decoders around the scalar decoders of an element type.
pub trait CollectionDecoderFactory: Send + Sync {
	fn dynamic(&self, inner: Vec<Arc<dyn TypeDecoder>>)
		-> Result<Arc<dyn TypeDecoder>, AbiError>;

	fn fixed(
		&self,
		inner: Vec<Arc<dyn TypeDecoder>>,
		size: usize,
	) -> Result<Arc<dyn TypeDecoder>, AbiError>;
}

/// Typed descriptor of a contract event.
///
/// Implementations know how to recognise their raw log entries and how to
/// parse them into a host type.
pub trait EventDescriptor: Send + Sync {
	type Output: Send;

	/// Whether the raw log entry belongs to this event.
	fn matches(&self, data: &EventData) -> bool;

	/// Parses a matching log entry into the host type.
	fn parse(&self, data: &EventData) -> Result<Self::Output, AbiError>;
}
