//! Block and transaction notification fan-out.
//!
//! The handler is the single subscription point for node notifications:
//! backends push blocks and dropped transactions in, and any number of
//! consumers (nonce maintenance, confirmation waiters, event filters)
//! subscribe to the resulting multicast streams.

use proxy_types::{BlockInfo, TransactionInfo};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, watch};

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Multicast source of block and transaction-status notifications.
pub struct ChainEventHandler {
	blocks: broadcast::Sender<BlockInfo>,
	transactions: broadcast::Sender<TransactionInfo>,
	current_block: AtomicU64,
	ready: watch::Sender<bool>,
}

impl ChainEventHandler {
	pub fn new() -> Self {
		Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
	}

	/// Creates a handler whose broadcast channels buffer up to `capacity`
	/// notifications per lagging subscriber.
	pub fn with_capacity(capacity: usize) -> Self {
		let (blocks, _) = broadcast::channel(capacity);
		let (transactions, _) = broadcast::channel(capacity);
		let (ready, _) = watch::channel(false);
		Self {
			blocks,
			transactions,
			current_block: AtomicU64::new(0),
			ready,
		}
	}

	/// Ingests a mined block: publishes an `Executed` info for every receipt
	/// it contains, then the block itself, and marks the handler ready.
	pub fn on_block(&self, block: BlockInfo) {
		self.current_block.store(block.block_number, Ordering::SeqCst);
		tracing::debug!(
			block_number = block.block_number,
			receipts = block.receipts.len(),
			"block notification"
		);
		for receipt in &block.receipts {
			let _ = self
				.transactions
				.send(TransactionInfo::executed(receipt.clone()));
		}
		let _ = self.blocks.send(block);
		self.ready.send_replace(true);
	}

	/// Ingests a transaction removed from the mempool.
	pub fn on_transaction_dropped(&self, info: TransactionInfo) {
		tracing::debug!(tx_hash = %info.hash, "dropped transaction notification");
		let _ = self.transactions.send(info);
	}

	/// Subscribes to transaction-status notifications.
	pub fn observe_transactions(&self) -> broadcast::Receiver<TransactionInfo> {
		self.transactions.subscribe()
	}

	/// Subscribes to block notifications.
	pub fn observe_blocks(&self) -> broadcast::Receiver<BlockInfo> {
		self.blocks.subscribe()
	}

	/// Number of the most recently observed block.
	pub fn current_block_number(&self) -> u64 {
		self.current_block.load(Ordering::SeqCst)
	}

	/// Completes once the handler has received at least one block
	/// notification. Used to delay the first submission until the node view
	/// is live.
	pub async fn ready(&self) {
		let mut ready = self.ready.subscribe();
		if *ready.borrow_and_update() {
			return;
		}
		while ready.changed().await.is_ok() {
			if *ready.borrow_and_update() {
				return;
			}
		}
	}
}

impl Default for ChainEventHandler {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{Address, B256};
	use proxy_types::{TransactionReceipt, TransactionStatus};

	fn receipt(byte: u8) -> TransactionReceipt {
		TransactionReceipt {
			hash: B256::repeat_byte(byte),
			sender: Address::repeat_byte(0x11),
			receive_address: Address::repeat_byte(0x22),
			contract_address: None,
			is_successful: true,
			error: String::new(),
			block_hash: B256::repeat_byte(0xbb),
			events: vec![],
		}
	}

	#[tokio::test]
	async fn test_block_reaches_every_subscriber() {
		let handler = ChainEventHandler::new();
		let mut first = handler.observe_blocks();
		let mut second = handler.observe_blocks();
		handler.on_block(BlockInfo {
			block_number: 3,
			receipts: vec![],
		});
		assert_eq!(first.recv().await.unwrap().block_number, 3);
		assert_eq!(second.recv().await.unwrap().block_number, 3);
		assert_eq!(handler.current_block_number(), 3);
	}

	#[tokio::test]
	async fn test_block_receipts_become_executed_infos() {
		let handler = ChainEventHandler::new();
		let mut transactions = handler.observe_transactions();
		handler.on_block(BlockInfo {
			block_number: 1,
			receipts: vec![receipt(0xaa)],
		});
		let info = transactions.recv().await.unwrap();
		assert_eq!(info.hash, B256::repeat_byte(0xaa));
		assert_eq!(info.status, TransactionStatus::Executed);
		assert!(info.receipt.is_some());
	}

	#[tokio::test]
	async fn test_ready_completes_after_first_block() {
		let handler = std::sync::Arc::new(ChainEventHandler::new());
		let waiting = {
			let handler = handler.clone();
			tokio::spawn(async move { handler.ready().await })
		};
		// ready() must not complete before any block arrived
		tokio::task::yield_now().await;
		assert!(!waiting.is_finished());
		handler.on_block(BlockInfo {
			block_number: 1,
			receipts: vec![],
		});
		waiting.await.unwrap();
		// and completes immediately afterwards
		handler.ready().await;
	}
}
