//! Contract deployment details and constructor matching.

use crate::{AbiError, ConverterRegistry};
use alloy_primitives::Bytes;
use proxy_types::{AbiParam, AbiValue};

/// One declared constructor of a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorSpec {
	pub params: Vec<AbiParam>,
}

impl ConstructorSpec {
	pub fn new(params: Vec<AbiParam>) -> Self {
		Self { params }
	}
}

/// Compiled contract binary together with its declared constructors.
#[derive(Debug, Clone, Default)]
pub struct ContractDetails {
	/// Deployment bytecode.
	pub binary: Bytes,
	pub constructors: Vec<ConstructorSpec>,
}

impl ContractDetails {
	pub fn new(binary: Bytes, constructors: Vec<ConstructorSpec>) -> Self {
		Self {
			binary,
			constructors,
		}
	}

	/// The full deployment payload: the binary followed by the encoded
	/// constructor arguments.
	pub fn deployment_data(
		&self,
		registry: &ConverterRegistry,
		args: &[AbiValue],
	) -> Result<Bytes, AbiError> {
		let mut data = self.binary.to_vec();
		data.extend(self.encode_constructor_args(registry, args)?);
		Ok(data.into())
	}

	/// Encodes the arguments against the first matching constructor.
	///
	/// A constructor matches when its arity equals the argument count and
	/// every parameter has a registered encoder accepting the corresponding
	/// argument. No arguments and no matching constructor is a plain
	/// deployment; arguments without a match are an error.
	fn encode_constructor_args(
		&self,
		registry: &ConverterRegistry,
		args: &[AbiValue],
	) -> Result<Vec<u8>, AbiError> {
		match self.find_constructor(registry, args) {
			Some(constructor) => {
				let mut encoded = Vec::new();
				for (param, arg) in constructor.params.iter().zip(args) {
					encoded.extend(encode_arg(registry, param, arg)?);
				}
				Ok(encoded)
			}
			None if args.is_empty() => Ok(Vec::new()),
			None => Err(AbiError::NoConstructorMatch(describe_args(args))),
		}
	}

	fn find_constructor(
		&self,
		registry: &ConverterRegistry,
		args: &[AbiValue],
	) -> Option<&ConstructorSpec> {
		self.constructors.iter().find(|constructor| {
			constructor.params.len() == args.len()
				&& constructor.params.iter().zip(args).all(|(param, arg)| {
					registry
						.get_encoders(param)
						.map(|encoders| encoders.iter().any(|encoder| encoder.accepts(arg)))
						.unwrap_or(false)
				})
		})
	}
}

fn encode_arg(
	registry: &ConverterRegistry,
	param: &AbiParam,
	arg: &AbiValue,
) -> Result<Vec<u8>, AbiError> {
	let ty = param
		.solidity_type()
		.ok_or_else(|| AbiError::UnknownType(param.type_name.clone()))?;
	let encoders = registry.get_encoders(param)?;
	let encoder = encoders
		.iter()
		.find(|encoder| encoder.accepts(arg))
		.ok_or_else(|| AbiError::NoEncoderForType(param.type_name.clone()))?;
	encoder.encode(arg, ty)
}

fn describe_args(args: &[AbiValue]) -> String {
	if args.is_empty() {
		return "[no args]".to_string();
	}
	args.iter()
		.map(AbiValue::type_label)
		.collect::<Vec<_>>()
		.join(", ")
}
