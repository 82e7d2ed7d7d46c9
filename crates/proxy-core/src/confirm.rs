//! Resolution of submitted transactions to their terminal outcome.
//!
//! A waiter races four observation sources: dropped-transaction
//! notifications, per-block receipt queries, a block-count timeout and a
//! timer-driven polling fallback. The first terminal observation wins and
//! the remaining subscriptions are dropped with the future.

use crate::error::ConfirmationError;
use proxy_config::ConfirmationConfig;
use proxy_node::{ChainEventHandler, NodeBackend};
use proxy_types::{TransactionReceipt, TransactionStatus, TxHash};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;

/// Extra gas for contract-creation transactions.
pub const CONTRACT_CREATION_GAS: u64 = 15_000;

/// Flat pad applied to every gas estimate.
pub const GAS_SAFETY_MARGIN: u64 = 200_000;

/// Watches the event streams and the backend to resolve transactions.
pub struct ConfirmationWaiter {
	backend: Arc<dyn NodeBackend>,
	events: Arc<ChainEventHandler>,
	block_wait_limit: u64,
	poll_interval: Duration,
}

impl ConfirmationWaiter {
	pub fn new(
		backend: Arc<dyn NodeBackend>,
		events: Arc<ChainEventHandler>,
		config: &ConfirmationConfig,
	) -> Self {
		Self {
			backend,
			events,
			block_wait_limit: config.block_wait_limit,
			poll_interval: Duration::from_secs(config.poll_interval_secs),
		}
	}

	/// Resolves once the transaction is mined, dropped, or past the block
	/// window. Dropping the returned future cancels the wait and releases
	/// every subscription it holds.
	pub async fn wait_for_result(
		&self,
		tx_hash: TxHash,
	) -> Result<TransactionReceipt, ConfirmationError> {
		let start_block = self.events.current_block_number();
		let mut transactions = self.events.observe_transactions();
		let mut blocks = self.events.observe_blocks();
		let mut poll = tokio::time::interval_at(
			Instant::now() + self.poll_interval,
			self.poll_interval,
		);
		let mut transactions_open = true;
		let mut blocks_open = true;

		loop {
			tokio::select! {
				info = transactions.recv(), if transactions_open => match info {
					Ok(info) => {
						if info.hash == tx_hash && info.status == TransactionStatus::Dropped {
							tracing::debug!(%tx_hash, "transaction dropped");
							return Err(match info.receipt {
								Some(receipt) => ConfirmationError::Dropped(receipt.error),
								None => ConfirmationError::ReceiptMissing,
							});
						}
					}
					Err(RecvError::Lagged(skipped)) => {
						tracing::warn!(%tx_hash, skipped, "transaction stream lagged");
					}
					Err(RecvError::Closed) => transactions_open = false,
				},
				block = blocks.recv(), if blocks_open => match block {
					Ok(block) => {
						if let Some(receipt) = self.query_receipt(tx_hash).await? {
							return resolve(receipt);
						}
						if block.block_number > start_block + self.block_wait_limit {
							tracing::debug!(
								%tx_hash,
								start_block,
								block_number = block.block_number,
								"inclusion window elapsed"
							);
							return Err(ConfirmationError::InclusionTimeout(self.block_wait_limit));
						}
					}
					Err(RecvError::Lagged(skipped)) => {
						tracing::warn!(%tx_hash, skipped, "block stream lagged");
					}
					Err(RecvError::Closed) => blocks_open = false,
				},
				// Liveness fallback for missed block notifications.
				_ = poll.tick() => {
					if let Some(info) = self.backend.get_transaction_info(tx_hash).await? {
						if info.status == TransactionStatus::Executed {
							if let Some(receipt) = info.receipt {
								return resolve(receipt);
							}
						}
					}
				}
			}
		}
	}

	async fn query_receipt(
		&self,
		tx_hash: TxHash,
	) -> Result<Option<TransactionReceipt>, ConfirmationError> {
		Ok(self
			.backend
			.get_transaction_info(tx_hash)
			.await?
			.and_then(|info| info.receipt))
	}
}

fn resolve(receipt: TransactionReceipt) -> Result<TransactionReceipt, ConfirmationError> {
	if receipt.is_successful {
		tracing::debug!(tx_hash = %receipt.hash, "transaction confirmed");
		Ok(receipt)
	} else {
		tracing::debug!(tx_hash = %receipt.hash, error = %receipt.error, "transaction reverted");
		Err(ConfirmationError::Reverted {
			hash: receipt.hash,
			error: receipt.error,
		})
	}
}
