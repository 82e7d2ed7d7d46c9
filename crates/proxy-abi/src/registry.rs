//! Converter registry resolving per-type encoder and decoder lists.

use crate::decoders::{
	AddressDecoder, ArrayDecoderFactory, BoolDecoder, DynamicBytesDecoder, NumberDecoder,
	StaticBytesDecoder, StringDecoder,
};
use crate::encoders::{
	AddressEncoder, ArrayEncoderFactory, BoolEncoder, DynamicBytesEncoder, NumberEncoder,
	StaticBytesEncoder, StringEncoder,
};
use crate::{
	AbiError, CollectionDecoderFactory, CollectionEncoderFactory, TypeDecoder, TypeEncoder,
};
use proxy_types::{AbiParam, SolidityType, SolidityTypeGroup};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Registry of ABI converters keyed by type group.
///
/// Registration is append-only and order is preserved: callers try the
/// returned converters in registration order and keep the first that accepts
/// their host value. A registered group always has at least one converter;
/// an absent group is reported as an explicit error.
#[derive(Default)]
pub struct ConverterRegistry {
	encoders: HashMap<SolidityTypeGroup, Vec<Arc<dyn TypeEncoder>>>,
	decoders: HashMap<SolidityTypeGroup, Vec<Arc<dyn TypeDecoder>>>,
	list_encoders: Vec<Arc<dyn CollectionEncoderFactory>>,
	list_decoders: Vec<Arc<dyn CollectionDecoderFactory>>,
	void_types: HashSet<TypeId>,
}

impl ConverterRegistry {
	/// An empty registry with nothing registered.
	pub fn new() -> Self {
		Self::default()
	}

	/// A registry pre-loaded with the standard converter set: numeric,
	/// boolean, address, bytes and string scalars plus the array factories,
	/// with `()` registered as the void host type.
	pub fn standard() -> Self {
		let mut registry = Self::new();
		registry.add_encoder(SolidityTypeGroup::Numeric, Arc::new(NumberEncoder));
		registry.add_encoder(SolidityTypeGroup::Boolean, Arc::new(BoolEncoder));
		registry.add_encoder(SolidityTypeGroup::Address, Arc::new(AddressEncoder));
		registry.add_encoder(SolidityTypeGroup::StaticBytes, Arc::new(StaticBytesEncoder));
		registry.add_encoder(SolidityTypeGroup::DynamicBytes, Arc::new(DynamicBytesEncoder));
		registry.add_encoder(SolidityTypeGroup::Text, Arc::new(StringEncoder));
		registry.add_decoder(SolidityTypeGroup::Numeric, Arc::new(NumberDecoder));
		registry.add_decoder(SolidityTypeGroup::Boolean, Arc::new(BoolDecoder));
		registry.add_decoder(SolidityTypeGroup::Address, Arc::new(AddressDecoder));
		registry.add_decoder(SolidityTypeGroup::StaticBytes, Arc::new(StaticBytesDecoder));
		registry.add_decoder(SolidityTypeGroup::DynamicBytes, Arc::new(DynamicBytesDecoder));
		registry.add_decoder(SolidityTypeGroup::Text, Arc::new(StringDecoder));
		registry.add_list_encoder(Arc::new(ArrayEncoderFactory));
		registry.add_list_decoder(Arc::new(ArrayDecoderFactory));
		registry.add_void_type::<()>();
		registry
	}

	pub fn add_encoder(&mut self, group: SolidityTypeGroup, encoder: Arc<dyn TypeEncoder>) {
		self.encoders.entry(group).or_default().push(encoder);
	}

	pub fn add_decoder(&mut self, group: SolidityTypeGroup, decoder: Arc<dyn TypeDecoder>) {
		self.decoders.entry(group).or_default().push(decoder);
	}

	pub fn add_list_encoder(&mut self, factory: Arc<dyn CollectionEncoderFactory>) {
		self.list_encoders.push(factory);
	}

	pub fn add_list_decoder(&mut self, factory: Arc<dyn CollectionDecoderFactory>) {
		self.list_decoders.push(factory);
	}

	/// Registers a host type as carrying no return value.
	pub fn add_void_type<T: 'static>(&mut self) {
		self.void_types.insert(TypeId::of::<T>());
	}

	pub fn is_void_type<T: 'static>(&self) -> bool {
		self.void_types.contains(&TypeId::of::<T>())
	}

	/// Resolves the encoders for a parameter.
	///
	/// Scalar parameters return the registered list for the type's group.
	/// Array parameters return one collection encoder per registered
	/// factory, each built around the scalar encoders of the element type.
	pub fn get_encoders(&self, param: &AbiParam) -> Result<Vec<Arc<dyn TypeEncoder>>, AbiError> {
		let ty = self.resolve_type(param)?;
		if param.is_array {
			let inner = self.scalar_encoders(ty, &param.type_name)?;
			return self
				.list_encoders
				.iter()
				.map(|factory| {
					if param.is_dynamic {
						factory.dynamic(inner.clone())
					} else {
						factory.fixed(inner.clone(), param.array_size)
					}
				})
				.collect();
		}
		self.scalar_encoders(ty, &param.type_name)
	}

	/// Resolves the decoders for a parameter.
	///
	/// Mirrors `get_encoders`, except that the `bytes` type is wrapped in
	/// dynamic collection decoders even when the parameter is not declared
	/// as an array: on the wire it is a length-prefixed byte sequence.
	pub fn get_decoders(&self, param: &AbiParam) -> Result<Vec<Arc<dyn TypeDecoder>>, AbiError> {
		let ty = self.resolve_type(param)?;
		if param.is_array || ty == SolidityType::Bytes {
			let inner = self.scalar_decoders(ty, &param.type_name)?;
			let dynamic = param.is_dynamic || ty == SolidityType::Bytes;
			return self
				.list_decoders
				.iter()
				.map(|factory| {
					if dynamic {
						factory.dynamic(inner.clone())
					} else {
						factory.fixed(inner.clone(), param.array_size)
					}
				})
				.collect();
		}
		self.scalar_decoders(ty, &param.type_name)
	}

	fn resolve_type(&self, param: &AbiParam) -> Result<SolidityType, AbiError> {
		param
			.solidity_type()
			.ok_or_else(|| AbiError::UnknownType(param.type_name.clone()))
	}

	fn scalar_encoders(
		&self,
		ty: SolidityType,
		name: &str,
	) -> Result<Vec<Arc<dyn TypeEncoder>>, AbiError> {
		self.encoders
			.get(&SolidityTypeGroup::of(ty))
			.cloned()
			.ok_or_else(|| AbiError::NoEncoderForType(name.to_string()))
	}

	fn scalar_decoders(
		&self,
		ty: SolidityType,
		name: &str,
	) -> Result<Vec<Arc<dyn TypeDecoder>>, AbiError> {
		self.decoders
			.get(&SolidityTypeGroup::of(ty))
			.cloned()
			.ok_or_else(|| AbiError::NoDecoderForType(name.to_string()))
	}
}
