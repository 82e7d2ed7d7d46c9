//! Core of the contract-interaction proxy.
//!
//! This crate sits between application code and a node backend and solves
//! three coupled problems: serialising submissions from one account so that
//! nonces stay monotonic while transactions are in flight, turning a
//! one-shot submission into a future that resolves when the transaction is
//! mined, dropped or lost, and resolving ABI converters for typed call and
//! event payloads. `ChainProxy` is the facade tying the pieces together.

/// Confirmation waiting and gas margins.
pub mod confirm;
/// Error types surfaced by the proxy core.
pub mod error;
/// Event lookup and live filtering.
pub mod events;
/// Per-account nonce tracking.
pub mod nonce;
/// Serialised transaction submission.
pub mod submit;

pub use confirm::{ConfirmationWaiter, CONTRACT_CREATION_GAS, GAS_SAFETY_MARGIN};
pub use error::{ConfirmationError, ProxyError, SubmitError};
pub use events::{BlockId, EventInfo};
pub use nonce::NonceTracker;
pub use submit::{SubmissionFuture, SubmissionSerializer};

use futures::future::BoxFuture;
use proxy_abi::{
	AbiError, CollectionDecoderFactory, CollectionEncoderFactory, ContractDetails,
	ConverterRegistry, TypeDecoder, TypeEncoder,
};
use proxy_config::Config;
use proxy_node::{ChainEventHandler, NodeBackend};
use proxy_types::{
	AbiParam, AbiValue, Address, Bytes, GasUsage, Nonce, SolidityTypeGroup, TransactionInfo,
	TransactionReceipt, TransactionRequest, TxHash, TxKind, Value,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Handle for a submitted call: the canonical transaction hash plus a
/// future resolving to the mined receipt.
pub struct CallDetails {
	pub tx_hash: TxHash,
	/// Resolves when the transaction reaches a terminal state. Dropping it
	/// cancels the wait.
	pub result: BoxFuture<'static, Result<TransactionReceipt, ConfirmationError>>,
}

/// Client-side proxy offering a typed contract-interaction API on top of a
/// low-level node backend.
pub struct ChainProxy {
	backend: Arc<dyn NodeBackend>,
	events: Arc<ChainEventHandler>,
	registry: RwLock<ConverterRegistry>,
	nonces: Arc<NonceTracker>,
	serializer: SubmissionSerializer,
	waiter: Arc<ConfirmationWaiter>,
	maintenance: JoinHandle<()>,
}

impl ChainProxy {
	/// Wires the proxy to a backend and event handler: registers the
	/// handler with the backend, starts nonce maintenance and spawns the
	/// submission worker.
	pub async fn new(
		backend: Arc<dyn NodeBackend>,
		events: Arc<ChainEventHandler>,
		registry: ConverterRegistry,
		config: Config,
	) -> Self {
		backend.register(events.clone()).await;
		let nonces = Arc::new(NonceTracker::new(backend.clone()));
		let maintenance = nonces.clone().spawn_maintenance(&events);
		let serializer = SubmissionSerializer::new(
			backend.clone(),
			nonces.clone(),
			config.submission.queue_capacity,
		);
		let waiter = Arc::new(ConfirmationWaiter::new(
			backend.clone(),
			events.clone(),
			&config.confirmation,
		));
		Self {
			backend,
			events,
			registry: RwLock::new(registry),
			nonces,
			serializer,
			waiter,
			maintenance,
		}
	}

	/// Deploys a contract and returns the address of the deployed code.
	pub async fn publish(
		&self,
		contract: &ContractDetails,
		account: Address,
		args: &[AbiValue],
	) -> Result<Address, ProxyError> {
		self.publish_with_value(contract, account, Value::zero(), args)
			.await
	}

	/// Deploys a contract, transferring `value` with the creation.
	pub async fn publish_with_value(
		&self,
		contract: &ContractDetails,
		account: Address,
		value: Value,
		args: &[AbiValue],
	) -> Result<Address, ProxyError> {
		let data = {
			let registry = self.registry.read().await;
			contract.deployment_data(&registry, args)?
		};
		let call = self.send_tx(value, data, account, TxKind::Create).await?;
		let receipt = call.result.await?;
		receipt
			.contract_address
			.ok_or(ProxyError::ContractAddressMissing)
	}

	/// Submits a transaction and returns its hash together with a future
	/// for the mined receipt.
	///
	/// Waits for the event handler to have seen at least one block, so gas
	/// pricing and confirmation tracking run against a live node view.
	pub async fn send_tx(
		&self,
		value: Value,
		data: Bytes,
		account: Address,
		to: TxKind,
	) -> Result<CallDetails, ProxyError> {
		self.events.ready().await;
		let gas_limit = self.estimate_gas(value, &data, account, to).await?;
		let gas_price = self.backend.get_gas_price().await?;
		let request = TransactionRequest {
			account,
			to,
			value,
			data,
			gas_limit,
			gas_price,
		};
		let tx_hash = self.serializer.submit(request).await?.await?;
		let waiter = self.waiter.clone();
		Ok(CallDetails {
			tx_hash,
			result: Box::pin(async move { waiter.wait_for_result(tx_hash).await }),
		})
	}

	/// Gas estimate for the call with the proxy's safety margins applied.
	pub async fn estimate_gas(
		&self,
		value: Value,
		data: &Bytes,
		account: Address,
		to: TxKind,
	) -> Result<GasUsage, ProxyError> {
		let mut gas = self.backend.estimate_gas(account, to, value, data).await?;
		if to.is_create() {
			gas = gas.add(CONTRACT_CREATION_GAS);
		}
		Ok(gas.add(GAS_SAFETY_MARGIN))
	}

	/// The next usable nonce for the account, counting in-flight
	/// transactions.
	pub async fn next_nonce(&self, address: Address) -> Result<Nonce, ProxyError> {
		Ok(self.nonces.next_nonce(address).await?)
	}

	// Registry mutators. Registration is append-only; converters are tried
	// in registration order.

	pub async fn add_encoder(&self, group: SolidityTypeGroup, encoder: Arc<dyn TypeEncoder>) {
		self.registry.write().await.add_encoder(group, encoder);
	}

	pub async fn add_decoder(&self, group: SolidityTypeGroup, decoder: Arc<dyn TypeDecoder>) {
		self.registry.write().await.add_decoder(group, decoder);
	}

	pub async fn add_list_encoder(&self, factory: Arc<dyn CollectionEncoderFactory>) {
		self.registry.write().await.add_list_encoder(factory);
	}

	pub async fn add_list_decoder(&self, factory: Arc<dyn CollectionDecoderFactory>) {
		self.registry.write().await.add_list_decoder(factory);
	}

	pub async fn add_void_type<T: 'static>(&self) {
		self.registry.write().await.add_void_type::<T>();
	}

	pub async fn is_void_type<T: 'static>(&self) -> bool {
		self.registry.read().await.is_void_type::<T>()
	}

	pub async fn get_encoders(
		&self,
		param: &AbiParam,
	) -> Result<Vec<Arc<dyn TypeEncoder>>, AbiError> {
		self.registry.read().await.get_encoders(param)
	}

	pub async fn get_decoders(
		&self,
		param: &AbiParam,
	) -> Result<Vec<Arc<dyn TypeDecoder>>, AbiError> {
		self.registry.read().await.get_decoders(param)
	}

	// Info accessors delegating to the backend and event handler.

	pub async fn address_exists(&self, address: Address) -> Result<bool, ProxyError> {
		Ok(self.backend.address_exists(address).await?)
	}

	pub async fn get_balance(&self, address: Address) -> Result<Value, ProxyError> {
		Ok(self.backend.get_balance(address).await?)
	}

	pub async fn get_code(&self, address: Address) -> Result<Bytes, ProxyError> {
		Ok(self.backend.get_code(address).await?)
	}

	pub async fn get_transaction_info(
		&self,
		hash: TxHash,
	) -> Result<Option<TransactionInfo>, ProxyError> {
		Ok(self.backend.get_transaction_info(hash).await?)
	}

	pub fn current_block_number(&self) -> u64 {
		self.events.current_block_number()
	}

	/// The event handler this proxy is wired to.
	pub fn event_handler(&self) -> &Arc<ChainEventHandler> {
		&self.events
	}
}

impl Drop for ChainProxy {
	fn drop(&mut self) {
		self.maintenance.abort();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{B256, U256};
	use proxy_abi::EventDescriptor;
	use proxy_node::implementations::mock::MockBackend;
	use proxy_types::EventData;
	use std::time::Duration;

	fn alice() -> Address {
		Address::repeat_byte(0x11)
	}

	fn bob() -> Address {
		Address::repeat_byte(0x22)
	}

	fn test_config() -> Config {
		let mut config = Config::default();
		config.confirmation.block_wait_limit = 5;
		config.confirmation.poll_interval_secs = 1;
		config
	}

	async fn setup() -> (Arc<MockBackend>, Arc<ChainProxy>) {
		let backend = Arc::new(MockBackend::new());
		let events = Arc::new(ChainEventHandler::new());
		let proxy = ChainProxy::new(
			backend.clone(),
			events,
			ConverterRegistry::standard(),
			test_config(),
		)
		.await;
		// The handler must have seen one block before the first submission.
		backend.mine_block(vec![]).await;
		(backend, Arc::new(proxy))
	}

	fn successful_receipt(hash: TxHash, sender: Address, to: Address) -> TransactionReceipt {
		TransactionReceipt {
			hash,
			sender,
			receive_address: to,
			contract_address: None,
			is_successful: true,
			error: String::new(),
			block_hash: B256::repeat_byte(0xbb),
			events: vec![],
		}
	}

	/// Event descriptor matching on the first topic and reading one word.
	struct ValueRecorded {
		topic: B256,
	}

	impl EventDescriptor for ValueRecorded {
		type Output = U256;

		fn matches(&self, data: &EventData) -> bool {
			data.topics.first() == Some(&self.topic)
		}

		fn parse(&self, data: &EventData) -> Result<U256, AbiError> {
			if data.data.len() < 32 {
				return Err(AbiError::Decode("short event payload".to_string()));
			}
			Ok(U256::from_be_slice(&data.data[..32]))
		}
	}

	#[tokio::test]
	async fn test_transfer_uses_backend_nonce_and_confirms() {
		let (backend, proxy) = setup().await;
		backend.set_nonce(alice(), Nonce::new(7)).await;

		let call = proxy
			.send_tx(Value::wei(100u64), Bytes::new(), alice(), TxKind::Call(bob()))
			.await
			.unwrap();

		let submissions = backend.submissions().await;
		assert_eq!(submissions.len(), 1);
		assert_eq!(submissions[0].1, Nonce::new(7));
		assert_eq!(submissions[0].2, call.tx_hash);
		assert_eq!(submissions[0].0.value, Value::wei(100u64));

		let result = tokio::spawn(call.result);
		tokio::time::sleep(Duration::from_millis(50)).await;
		backend
			.mine_block(vec![successful_receipt(call.tx_hash, alice(), bob())])
			.await;

		let receipt = result.await.unwrap().unwrap();
		assert!(receipt.is_successful);
		assert_eq!(receipt.hash, call.tx_hash);

		// After mining, the pending entry settles and the derived nonce
		// matches the backend again.
		let mut settled = false;
		for _ in 0..200 {
			if proxy.next_nonce(alice()).await.unwrap() == Nonce::new(8) {
				settled = true;
				break;
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
		assert!(settled, "nonce did not settle after mining");
	}

	#[tokio::test]
	async fn test_publish_deploys_with_creation_gas_margins() {
		let (backend, proxy) = setup().await;
		backend.set_gas_estimate(GasUsage::new(30_000u64)).await;
		let deployed = Address::repeat_byte(0xcc);

		let publish = tokio::spawn({
			let proxy = proxy.clone();
			async move {
				let contract = ContractDetails::new(Bytes::from(vec![0xde, 0xad]), vec![]);
				proxy.publish(&contract, alice(), &[]).await
			}
		});

		let mut submissions = backend.submissions().await;
		for _ in 0..200 {
			if !submissions.is_empty() {
				break;
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
			submissions = backend.submissions().await;
		}
		let (request, _, hash) = submissions.first().cloned().expect("no submission seen");

		assert!(request.is_creation());
		assert_eq!(request.data.as_ref(), &[0xde, 0xad]);
		assert_eq!(
			request.gas_limit,
			GasUsage::new(30_000u64)
				.add(CONTRACT_CREATION_GAS)
				.add(GAS_SAFETY_MARGIN)
		);

		tokio::time::sleep(Duration::from_millis(50)).await;
		let mut receipt = successful_receipt(hash, alice(), Address::ZERO);
		receipt.contract_address = Some(deployed);
		backend.mine_block(vec![receipt]).await;

		assert_eq!(publish.await.unwrap().unwrap(), deployed);
	}

	#[tokio::test]
	async fn test_reverted_transaction_fails_with_hash_and_error() {
		let (backend, proxy) = setup().await;

		let call = proxy
			.send_tx(Value::wei(1u64), Bytes::new(), alice(), TxKind::Call(bob()))
			.await
			.unwrap();
		let result = tokio::spawn(call.result);
		tokio::time::sleep(Duration::from_millis(50)).await;

		let mut receipt = successful_receipt(call.tx_hash, alice(), bob());
		receipt.is_successful = false;
		receipt.error = "out of gas".to_string();
		backend.mine_block(vec![receipt]).await;

		match result.await.unwrap() {
			Err(ConfirmationError::Reverted { hash, error }) => {
				assert_eq!(hash, call.tx_hash);
				assert_eq!(error, "out of gas");
			}
			other => panic!("expected revert, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_dropped_transaction_fails_and_resets_the_nonce() {
		let (backend, proxy) = setup().await;
		backend.set_nonce(alice(), Nonce::new(7)).await;

		let call = proxy
			.send_tx(Value::wei(1u64), Bytes::new(), alice(), TxKind::Call(bob()))
			.await
			.unwrap();
		// The in-flight transaction offsets the derived nonce.
		assert_eq!(proxy.next_nonce(alice()).await.unwrap(), Nonce::new(8));

		let result = tokio::spawn(call.result);
		tokio::time::sleep(Duration::from_millis(50)).await;

		let mut receipt = successful_receipt(call.tx_hash, alice(), bob());
		receipt.is_successful = false;
		receipt.error = "replaced".to_string();
		backend.drop_transaction(receipt).await;

		match result.await.unwrap() {
			Err(ConfirmationError::Dropped(error)) => assert_eq!(error, "replaced"),
			other => panic!("expected drop, got {other:?}"),
		}

		// The pending entry is gone and the nonce is re-read from the
		// backend.
		let mut settled = false;
		for _ in 0..200 {
			if proxy.next_nonce(alice()).await.unwrap() == Nonce::new(7) {
				settled = true;
				break;
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
		assert!(settled, "nonce did not reset after drop");
	}

	#[tokio::test]
	async fn test_inclusion_timeout_after_block_window() {
		let (backend, proxy) = setup().await;

		let call = proxy
			.send_tx(Value::wei(1u64), Bytes::new(), alice(), TxKind::Call(bob()))
			.await
			.unwrap();
		let result = tokio::spawn(call.result);
		tokio::time::sleep(Duration::from_millis(50)).await;

		// The wait window is 5 blocks starting at block 1; keep mining
		// empty blocks until the wait gives up.
		for _ in 0..10 {
			backend.mine_block(vec![]).await;
			tokio::time::sleep(Duration::from_millis(10)).await;
		}

		let outcome = tokio::time::timeout(Duration::from_secs(5), result)
			.await
			.expect("confirmation did not resolve")
			.unwrap();
		match outcome {
			Err(ConfirmationError::InclusionTimeout(blocks)) => assert_eq!(blocks, 5),
			other => panic!("expected timeout, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_observe_events_filters_address_and_topic() {
		let (backend, proxy) = setup().await;
		let contract = Address::repeat_byte(0xc0);
		let topic = B256::repeat_byte(0x77);
		let other_topic = B256::repeat_byte(0x78);

		let mut stream =
			proxy.observe_events_with_info(Arc::new(ValueRecorded { topic }), contract);

		let tx_hash = B256::repeat_byte(0xaa);
		let mut watched = successful_receipt(tx_hash, alice(), contract);
		watched.events = vec![
			EventData {
				topics: vec![topic],
				data: Bytes::from(U256::from(42u64).to_be_bytes::<32>().to_vec()),
				transaction_hash: tx_hash,
			},
			EventData {
				topics: vec![other_topic],
				data: Bytes::from(U256::from(1u64).to_be_bytes::<32>().to_vec()),
				transaction_hash: tx_hash,
			},
		];
		let mut elsewhere = successful_receipt(B256::repeat_byte(0xab), alice(), bob());
		elsewhere.events = vec![EventData {
			topics: vec![topic],
			data: Bytes::from(U256::from(9u64).to_be_bytes::<32>().to_vec()),
			transaction_hash: B256::repeat_byte(0xab),
		}];
		backend.mine_block(vec![watched, elsewhere]).await;

		let info = tokio::time::timeout(Duration::from_secs(5), stream.recv())
			.await
			.unwrap()
			.unwrap();
		assert_eq!(info.transaction_hash, tx_hash);
		assert_eq!(info.result, U256::from(42u64));
	}

	#[tokio::test]
	async fn test_get_events_at_block_by_number_and_hash() {
		let (backend, proxy) = setup().await;
		let contract = Address::repeat_byte(0xc0);
		let topic = B256::repeat_byte(0x77);
		let event = ValueRecorded { topic };

		let tx_hash = B256::repeat_byte(0xaa);
		let mut receipt = successful_receipt(tx_hash, alice(), contract);
		receipt.events = vec![EventData {
			topics: vec![topic],
			data: Bytes::from(U256::from(5u64).to_be_bytes::<32>().to_vec()),
			transaction_hash: tx_hash,
		}];
		let block_hash = receipt.block_hash;
		let block = backend.mine_block(vec![receipt]).await;

		let by_number = proxy
			.get_events_at_block(&event, contract, BlockId::Number(block.block_number))
			.await
			.unwrap();
		assert_eq!(by_number, vec![U256::from(5u64)]);

		let by_hash = proxy
			.get_events_at_block(&event, contract, BlockId::Hash(block_hash))
			.await
			.unwrap();
		assert_eq!(by_hash, vec![U256::from(5u64)]);

		// A missing block yields an empty list, not an error.
		let missing = proxy
			.get_events_at_block(&event, contract, BlockId::Number(999))
			.await
			.unwrap();
		assert!(missing.is_empty());
	}

	#[tokio::test]
	async fn test_get_events_at_transaction() {
		let (backend, proxy) = setup().await;
		let contract = Address::repeat_byte(0xc0);
		let topic = B256::repeat_byte(0x77);
		let event = ValueRecorded { topic };

		let tx_hash = B256::repeat_byte(0xaa);
		let mut receipt = successful_receipt(tx_hash, alice(), contract);
		receipt.events = vec![EventData {
			topics: vec![topic],
			data: Bytes::from(U256::from(5u64).to_be_bytes::<32>().to_vec()),
			transaction_hash: tx_hash,
		}];
		backend.mine_block(vec![receipt]).await;

		let values = proxy
			.get_events_at_transaction(&event, contract, tx_hash)
			.await
			.unwrap();
		assert_eq!(values, vec![U256::from(5u64)]);

		// A receipt addressed to another contract yields nothing.
		let values = proxy
			.get_events_at_transaction(&event, bob(), tx_hash)
			.await
			.unwrap();
		assert!(values.is_empty());

		// A missing receipt is an explicit error.
		let missing = proxy
			.get_events_at_transaction(&event, contract, B256::repeat_byte(0xff))
			.await;
		assert!(matches!(
			missing,
			Err(ProxyError::Confirmation(ConfirmationError::ReceiptMissing))
		));
	}

	#[tokio::test]
	async fn test_info_accessors_delegate_to_the_backend() {
		let (backend, proxy) = setup().await;
		backend.set_balance(alice(), Value::wei(1_000u64)).await;
		backend.set_code(bob(), Bytes::from(vec![0x60, 0x60])).await;

		assert_eq!(
			proxy.get_balance(alice()).await.unwrap(),
			Value::wei(1_000u64)
		);
		assert!(proxy.address_exists(alice()).await.unwrap());
		assert!(!proxy
			.address_exists(Address::repeat_byte(0xee))
			.await
			.unwrap());
		assert_eq!(proxy.get_code(bob()).await.unwrap().as_ref(), &[0x60, 0x60]);
		assert_eq!(proxy.current_block_number(), 1);
	}
}
