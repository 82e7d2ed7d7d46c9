//! Per-account nonce tracking with in-flight offsets.
//!
//! The tracker derives the next usable nonce from two pieces of state: the
//! nonce last read from the backend and the set of transaction hashes still
//! in flight for the account. Both live behind one lock so readers always
//! observe a consistent pair.

use proxy_node::{BackendError, ChainEventHandler, NodeBackend};
use proxy_types::{Address, Nonce, TransactionReceipt, TransactionStatus, TxHash};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

#[derive(Default)]
struct TrackerState {
	backend_nonce: HashMap<Address, Nonce>,
	pending: HashMap<Address, HashSet<TxHash>>,
}

/// Tracks the next usable nonce per account.
pub struct NonceTracker {
	backend: Arc<dyn NodeBackend>,
	state: Mutex<TrackerState>,
}

impl NonceTracker {
	pub fn new(backend: Arc<dyn NodeBackend>) -> Self {
		Self {
			backend,
			state: Mutex::new(TrackerState::default()),
		}
	}

	/// The next nonce for the account: the backend nonce plus the number of
	/// transactions still in flight. The backend is consulted on first
	/// reference only.
	pub async fn next_nonce(&self, address: Address) -> Result<Nonce, BackendError> {
		let mut state = self.state.lock().await;
		if !state.backend_nonce.contains_key(&address) {
			let fetched = self.backend.get_nonce(address).await?;
			tracing::debug!(%address, nonce = fetched.value(), "fetched initial nonce");
			state.backend_nonce.insert(address, fetched);
		}
		let offset = state.pending.get(&address).map_or(0, HashSet::len);
		Ok(state.backend_nonce[&address].add(offset as u32))
	}

	/// Records a freshly submitted transaction as in flight.
	pub async fn record_pending(&self, address: Address, hash: TxHash) {
		let mut state = self.state.lock().await;
		state.pending.entry(address).or_default().insert(hash);
	}

	/// Settles a mined transaction.
	pub async fn on_mined(&self, receipt: &TransactionReceipt) -> Result<(), BackendError> {
		self.settle(receipt).await
	}

	/// Settles a dropped transaction.
	pub async fn on_dropped(&self, receipt: &TransactionReceipt) -> Result<(), BackendError> {
		self.settle(receipt).await
	}

	/// Number of in-flight transactions recorded for the account.
	pub async fn pending_count(&self, address: Address) -> usize {
		self.state
			.lock()
			.await
			.pending
			.get(&address)
			.map_or(0, HashSet::len)
	}

	/// Removes the receipt's hash from the sender's pending set and
	/// re-reads the backend nonce. A tracked nonce never moves backwards.
	async fn settle(&self, receipt: &TransactionReceipt) -> Result<(), BackendError> {
		let mut state = self.state.lock().await;
		let Some(hashes) = state.pending.get_mut(&receipt.sender) else {
			return Ok(());
		};
		hashes.remove(&receipt.hash);
		let refreshed = self.backend.get_nonce(receipt.sender).await?;
		let current = state
			.backend_nonce
			.get(&receipt.sender)
			.copied()
			.unwrap_or_default();
		state
			.backend_nonce
			.insert(receipt.sender, refreshed.max(current));
		tracing::debug!(
			sender = %receipt.sender,
			tx_hash = %receipt.hash,
			nonce = refreshed.value(),
			"settled pending transaction"
		);
		Ok(())
	}

	/// Spawns the maintenance task that settles pending entries from the
	/// event handler's block and transaction streams. The caller owns the
	/// handle and aborts it on shutdown.
	pub fn spawn_maintenance(self: Arc<Self>, events: &ChainEventHandler) -> JoinHandle<()> {
		let mut transactions = events.observe_transactions();
		let mut blocks = events.observe_blocks();
		tokio::spawn(async move {
			loop {
				tokio::select! {
					info = transactions.recv() => match info {
						Ok(info) if info.status == TransactionStatus::Dropped => {
							match info.receipt {
								Some(receipt) => {
									if let Err(err) = self.on_dropped(&receipt).await {
										tracing::warn!(error = %err, "nonce refresh after drop failed");
									}
								}
								None => tracing::warn!(
									tx_hash = %info.hash,
									"dropped transaction carries no receipt"
								),
							}
						}
						Ok(_) => {}
						Err(RecvError::Lagged(skipped)) => {
							tracing::warn!(skipped, "transaction stream lagged");
						}
						Err(RecvError::Closed) => break,
					},
					block = blocks.recv() => match block {
						Ok(block) => {
							for receipt in &block.receipts {
								if let Err(err) = self.on_mined(receipt).await {
									tracing::warn!(error = %err, "nonce refresh after mining failed");
								}
							}
						}
						Err(RecvError::Lagged(skipped)) => {
							tracing::warn!(skipped, "block stream lagged");
						}
						Err(RecvError::Closed) => break,
					},
				}
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::B256;
	use proxy_node::implementations::mock::MockBackend;

	fn receipt(sender: Address, hash: TxHash) -> TransactionReceipt {
		TransactionReceipt {
			hash,
			sender,
			receive_address: Address::repeat_byte(0x22),
			contract_address: None,
			is_successful: true,
			error: String::new(),
			block_hash: B256::repeat_byte(0xbb),
			events: vec![],
		}
	}

	#[tokio::test]
	async fn test_next_nonce_is_backend_nonce_plus_pending() {
		let backend = Arc::new(MockBackend::new());
		let sender = Address::repeat_byte(0x11);
		backend.set_nonce(sender, Nonce::new(7)).await;
		let tracker = NonceTracker::new(backend.clone());

		assert_eq!(tracker.next_nonce(sender).await.unwrap(), Nonce::new(7));
		tracker.record_pending(sender, B256::repeat_byte(0xaa)).await;
		tracker.record_pending(sender, B256::repeat_byte(0xab)).await;
		assert_eq!(tracker.next_nonce(sender).await.unwrap(), Nonce::new(9));
	}

	#[tokio::test]
	async fn test_backend_is_consulted_once_per_account() {
		let backend = Arc::new(MockBackend::new());
		let sender = Address::repeat_byte(0x11);
		backend.set_nonce(sender, Nonce::new(3)).await;
		let tracker = NonceTracker::new(backend.clone());

		assert_eq!(tracker.next_nonce(sender).await.unwrap(), Nonce::new(3));
		// A later change on the backend is not visible without a settle.
		backend.set_nonce(sender, Nonce::new(9)).await;
		assert_eq!(tracker.next_nonce(sender).await.unwrap(), Nonce::new(3));
	}

	#[tokio::test]
	async fn test_settle_removes_pending_and_refreshes() {
		let backend = Arc::new(MockBackend::new());
		let sender = Address::repeat_byte(0x11);
		backend.set_nonce(sender, Nonce::new(7)).await;
		let tracker = NonceTracker::new(backend.clone());

		tracker.next_nonce(sender).await.unwrap();
		let hash = B256::repeat_byte(0xaa);
		tracker.record_pending(sender, hash).await;
		backend.set_nonce(sender, Nonce::new(8)).await;

		tracker.on_mined(&receipt(sender, hash)).await.unwrap();
		assert_eq!(tracker.pending_count(sender).await, 0);
		assert_eq!(tracker.next_nonce(sender).await.unwrap(), Nonce::new(8));
	}

	#[tokio::test]
	async fn test_settled_nonce_never_moves_backwards() {
		let backend = Arc::new(MockBackend::new());
		let sender = Address::repeat_byte(0x11);
		backend.set_nonce(sender, Nonce::new(10)).await;
		let tracker = NonceTracker::new(backend.clone());

		tracker.next_nonce(sender).await.unwrap();
		let hash = B256::repeat_byte(0xaa);
		tracker.record_pending(sender, hash).await;
		// Backend briefly reports a lower nonce.
		backend.set_nonce(sender, Nonce::new(4)).await;
		tracker.on_dropped(&receipt(sender, hash)).await.unwrap();
		assert_eq!(tracker.next_nonce(sender).await.unwrap(), Nonce::new(10));
	}

	#[tokio::test]
	async fn test_settle_for_unknown_sender_is_a_no_op() {
		let backend = Arc::new(MockBackend::new());
		let tracker = NonceTracker::new(backend.clone());
		let sender = Address::repeat_byte(0x33);
		tracker
			.on_mined(&receipt(sender, B256::repeat_byte(0xaa)))
			.await
			.unwrap();
		assert_eq!(tracker.pending_count(sender).await, 0);
	}
}
