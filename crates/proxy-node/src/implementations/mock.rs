//! In-memory node backend implementation.
//!
//! This backend keeps the whole chain view in memory and hands mined blocks
//! and dropped transactions to the registered event handler, which makes it
//! suitable for tests and development setups where no node is available.

use crate::{BackendError, ChainEventHandler, NodeBackend};
use alloy_primitives::keccak256;
use async_trait::async_trait;
use proxy_types::{
	Address, BlockHash, BlockInfo, Bytes, GasPrice, GasUsage, Nonce, TransactionInfo,
	TransactionReceipt, TransactionRequest, TxHash, TxKind, Value,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Default)]
struct MockState {
	nonces: HashMap<Address, Nonce>,
	balances: HashMap<Address, Value>,
	code: HashMap<Address, Bytes>,
	blocks: HashMap<u64, BlockInfo>,
	block_hashes: HashMap<BlockHash, u64>,
	infos: HashMap<TxHash, TransactionInfo>,
	submissions: Vec<(TransactionRequest, Nonce, TxHash)>,
	block_number: u64,
	submission_counter: u64,
	gas_estimate: GasUsage,
	gas_price: GasPrice,
	submit_error: Option<BackendError>,
	submit_delay: Option<Duration>,
}

/// In-memory `NodeBackend` implementation.
pub struct MockBackend {
	state: RwLock<MockState>,
	handler: RwLock<Option<Arc<ChainEventHandler>>>,
}

impl MockBackend {
	pub fn new() -> Self {
		Self {
			state: RwLock::new(MockState {
				gas_estimate: GasUsage::new(21_000u64),
				gas_price: GasPrice::in_wei(1_000_000_000u64),
				..MockState::default()
			}),
			handler: RwLock::new(None),
		}
	}

	pub async fn set_nonce(&self, address: Address, nonce: Nonce) {
		self.state.write().await.nonces.insert(address, nonce);
	}

	pub async fn set_balance(&self, address: Address, balance: Value) {
		self.state.write().await.balances.insert(address, balance);
	}

	pub async fn set_code(&self, address: Address, code: Bytes) {
		self.state.write().await.code.insert(address, code);
	}

	pub async fn set_gas_estimate(&self, estimate: GasUsage) {
		self.state.write().await.gas_estimate = estimate;
	}

	/// Makes the next `submit` call fail with the given error.
	pub async fn fail_next_submit(&self, error: BackendError) {
		self.state.write().await.submit_error = Some(error);
	}

	/// Delays every `submit` call, keeping the submission worker busy.
	pub async fn set_submit_delay(&self, delay: Duration) {
		self.state.write().await.submit_delay = Some(delay);
	}

	/// Every submission seen so far, in order.
	pub async fn submissions(&self) -> Vec<(TransactionRequest, Nonce, TxHash)> {
		self.state.read().await.submissions.clone()
	}

	/// Mines the receipts into a new block: advances the chain, bumps the
	/// senders' node-side nonces, records the transaction infos and notifies
	/// the registered event handler.
	pub async fn mine_block(&self, receipts: Vec<TransactionReceipt>) -> BlockInfo {
		let block = {
			let mut state = self.state.write().await;
			state.block_number += 1;
			let block = BlockInfo {
				block_number: state.block_number,
				receipts,
			};
			for receipt in &block.receipts {
				let bumped = state
					.nonces
					.get(&receipt.sender)
					.copied()
					.unwrap_or_default()
					.add(1);
				state.nonces.insert(receipt.sender, bumped);
				state
					.infos
					.insert(receipt.hash, TransactionInfo::executed(receipt.clone()));
				state
					.block_hashes
					.insert(receipt.block_hash, block.block_number);
			}
			state.blocks.insert(block.block_number, block.clone());
			block
		};
		if let Some(handler) = self.handler.read().await.as_ref() {
			handler.on_block(block.clone());
		}
		block
	}

	/// Drops the transaction from the mempool and notifies the registered
	/// event handler.
	pub async fn drop_transaction(&self, receipt: TransactionReceipt) {
		let info = TransactionInfo::dropped(receipt);
		self.state
			.write()
			.await
			.infos
			.insert(info.hash, info.clone());
		if let Some(handler) = self.handler.read().await.as_ref() {
			handler.on_transaction_dropped(info);
		}
	}
}

impl Default for MockBackend {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl NodeBackend for MockBackend {
	async fn submit(
		&self,
		request: &TransactionRequest,
		nonce: Nonce,
	) -> Result<TxHash, BackendError> {
		let delay = self.state.read().await.submit_delay;
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
		let mut state = self.state.write().await;
		if let Some(error) = state.submit_error.take() {
			return Err(error);
		}
		state.submission_counter += 1;
		let mut seed = Vec::with_capacity(36);
		seed.extend_from_slice(request.account.as_slice());
		seed.extend_from_slice(&nonce.value().to_be_bytes());
		seed.extend_from_slice(&state.submission_counter.to_be_bytes());
		let hash = keccak256(&seed);
		state.submissions.push((request.clone(), nonce, hash));
		state.infos.insert(hash, TransactionInfo::pending(hash));
		Ok(hash)
	}

	async fn get_nonce(&self, address: Address) -> Result<Nonce, BackendError> {
		Ok(self
			.state
			.read()
			.await
			.nonces
			.get(&address)
			.copied()
			.unwrap_or_default())
	}

	async fn estimate_gas(
		&self,
		_account: Address,
		_to: TxKind,
		_value: Value,
		_data: &Bytes,
	) -> Result<GasUsage, BackendError> {
		Ok(self.state.read().await.gas_estimate)
	}

	async fn get_gas_price(&self) -> Result<GasPrice, BackendError> {
		Ok(self.state.read().await.gas_price)
	}

	async fn get_balance(&self, address: Address) -> Result<Value, BackendError> {
		Ok(self
			.state
			.read()
			.await
			.balances
			.get(&address)
			.copied()
			.unwrap_or_else(Value::zero))
	}

	async fn address_exists(&self, address: Address) -> Result<bool, BackendError> {
		let state = self.state.read().await;
		Ok(state.balances.contains_key(&address) || state.code.contains_key(&address))
	}

	async fn get_code(&self, address: Address) -> Result<Bytes, BackendError> {
		Ok(self
			.state
			.read()
			.await
			.code
			.get(&address)
			.cloned()
			.unwrap_or_default())
	}

	async fn get_block_by_number(&self, number: u64) -> Result<Option<BlockInfo>, BackendError> {
		Ok(self.state.read().await.blocks.get(&number).cloned())
	}

	async fn get_block_by_hash(
		&self,
		hash: BlockHash,
	) -> Result<Option<BlockInfo>, BackendError> {
		let state = self.state.read().await;
		Ok(state
			.block_hashes
			.get(&hash)
			.and_then(|number| state.blocks.get(number))
			.cloned())
	}

	async fn get_transaction_info(
		&self,
		hash: TxHash,
	) -> Result<Option<TransactionInfo>, BackendError> {
		Ok(self.state.read().await.infos.get(&hash).cloned())
	}

	async fn register(&self, handler: Arc<ChainEventHandler>) {
		*self.handler.write().await = Some(handler);
	}
}
