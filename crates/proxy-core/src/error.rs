//! Error types surfaced by the proxy core.

use proxy_abi::AbiError;
use proxy_node::BackendError;
use proxy_types::TxHash;
use thiserror::Error;

/// Errors raised while enqueuing or submitting a transaction.
///
/// Cloneable so one submission outcome can complete every waiter registered
/// for the same request.
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
	/// The submission queue is at capacity.
	#[error("submission queue is full")]
	BackpressureExceeded,
	#[error(transparent)]
	Backend(#[from] BackendError),
	/// The submission worker is gone; the request can no longer be served.
	#[error("submission worker stopped")]
	WorkerStopped,
}

/// Terminal outcomes of waiting for a transaction result.
#[derive(Debug, Error)]
pub enum ConfirmationError {
	/// The transaction was removed from the mempool without inclusion.
	#[error("transaction was dropped: {0}")]
	Dropped(String),
	/// The transaction was mined but execution failed.
	#[error("transaction {hash} failed: {error}")]
	Reverted { hash: TxHash, error: String },
	/// The transaction was not included within the configured block window.
	#[error("transaction not included in the last {0} blocks")]
	InclusionTimeout(u64),
	#[error("no transaction receipt found")]
	ReceiptMissing,
	#[error(transparent)]
	Backend(#[from] BackendError),
}

/// Facade-level roll-up of all proxy errors.
#[derive(Debug, Error)]
pub enum ProxyError {
	#[error(transparent)]
	Abi(#[from] AbiError),
	#[error(transparent)]
	Submit(#[from] SubmitError),
	#[error(transparent)]
	Confirmation(#[from] ConfirmationError),
	#[error(transparent)]
	Backend(#[from] BackendError),
	/// A creation receipt arrived without a deployed contract address.
	#[error("creation receipt carries no contract address")]
	ContractAddressMissing,
}
