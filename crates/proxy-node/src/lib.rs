//! Node backend abstraction for the contract-interaction proxy.
//!
//! This crate defines the low-level gateway trait the proxy core calls into
//! (`NodeBackend`), the multicast event handler that fans node notifications
//! out to the rest of the system (`ChainEventHandler`), and an in-memory
//! backend implementation used by tests and development setups.

/// Block and transaction notification fan-out.
pub mod events;

/// Re-export implementations
pub mod implementations {
	pub mod mock;
}

pub use events::ChainEventHandler;

use async_trait::async_trait;
use proxy_types::{
	Address, BlockHash, BlockInfo, Bytes, GasPrice, GasUsage, Nonce, TransactionInfo,
	TransactionRequest, TxHash, TxKind, Value,
};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by a node backend.
///
/// Cloneable so that one submission outcome can be delivered to several
/// waiting callers.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
	/// Error that occurs during communication with the node.
	#[error("transport error: {0}")]
	Transport(String),
	/// The node rejected the request as invalid.
	#[error("node rejected the request: {0}")]
	Validation(String),
	#[error("not found: {0}")]
	NotFound(String),
}

/// Low-level gateway to a blockchain node.
///
/// The proxy borrows the connection: implementations are shared behind an
/// `Arc` and must be safe to call from multiple tasks. Submission takes the
/// nonce explicitly so that nonce assignment and submission form one atomic
/// step under the caller's lock.
#[async_trait]
pub trait NodeBackend: Send + Sync {
	/// Submits the request with the given nonce and returns the canonical
	/// transaction hash the node will use.
	async fn submit(
		&self,
		request: &TransactionRequest,
		nonce: Nonce,
	) -> Result<TxHash, BackendError>;

	/// The account's next nonce as known to the node.
	async fn get_nonce(&self, address: Address) -> Result<Nonce, BackendError>;

	/// Estimates the gas needed to execute the call.
	async fn estimate_gas(
		&self,
		account: Address,
		to: TxKind,
		value: Value,
		data: &Bytes,
	) -> Result<GasUsage, BackendError>;

	async fn get_gas_price(&self) -> Result<GasPrice, BackendError>;

	async fn get_balance(&self, address: Address) -> Result<Value, BackendError>;

	async fn address_exists(&self, address: Address) -> Result<bool, BackendError>;

	/// The code deployed at the address, empty if none.
	async fn get_code(&self, address: Address) -> Result<Bytes, BackendError>;

	async fn get_block_by_number(&self, number: u64) -> Result<Option<BlockInfo>, BackendError>;

	async fn get_block_by_hash(&self, hash: BlockHash)
		-> Result<Option<BlockInfo>, BackendError>;

	/// Whatever the node currently knows about the transaction.
	async fn get_transaction_info(
		&self,
		hash: TxHash,
	) -> Result<Option<TransactionInfo>, BackendError>;

	/// Attaches the event handler to the backend's notification source.
	async fn register(&self, handler: Arc<ChainEventHandler>);
}
