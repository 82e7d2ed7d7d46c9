//! Transaction, block, receipt and event records.

use crate::{BlockHash, GasPrice, GasUsage, TxHash, Value};
use alloy_primitives::{Address, Bytes, TxKind, B256};
use serde::{Deserialize, Serialize};

/// Immutable description of a transaction to submit.
///
/// Equality and hashing are content-based over the full tuple; the
/// submission path uses this identity to de-duplicate in-flight requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionRequest {
	/// Sending account.
	pub account: Address,
	/// Recipient, or `TxKind::Create` for contract creation.
	pub to: TxKind,
	/// Amount transferred with the call.
	pub value: Value,
	/// Call data, or deployment code for a creation.
	pub data: Bytes,
	pub gas_limit: GasUsage,
	pub gas_price: GasPrice,
}

impl TransactionRequest {
	pub fn is_creation(&self) -> bool {
		self.to.is_create()
	}

	/// The recipient address, absent for contract creation.
	pub fn recipient(&self) -> Option<Address> {
		self.to.to().copied()
	}
}

/// Status of a transaction as reported by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
	/// Known to the node but not yet included in a block.
	Pending,
	/// Included in a mined block.
	Executed,
	/// Removed from the mempool without inclusion.
	Dropped,
}

/// The chain's record of a transaction outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	pub hash: TxHash,
	pub sender: Address,
	/// Recipient of the call; the zero address for creations.
	pub receive_address: Address,
	/// Deployed code address, present only for creations.
	pub contract_address: Option<Address>,
	pub is_successful: bool,
	/// Node-reported error string, empty on success.
	pub error: String,
	pub block_hash: BlockHash,
	/// Raw log entries emitted during execution.
	pub events: Vec<EventData>,
}

/// A transaction hash together with whatever the node knows about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInfo {
	pub hash: TxHash,
	pub receipt: Option<TransactionReceipt>,
	pub status: TransactionStatus,
	pub block_hash: Option<BlockHash>,
}

impl TransactionInfo {
	/// Info for a transaction mined into a block.
	pub fn executed(receipt: TransactionReceipt) -> Self {
		Self {
			hash: receipt.hash,
			block_hash: Some(receipt.block_hash),
			status: TransactionStatus::Executed,
			receipt: Some(receipt),
		}
	}

	/// Info for a transaction removed from the mempool.
	pub fn dropped(receipt: TransactionReceipt) -> Self {
		Self {
			hash: receipt.hash,
			block_hash: None,
			status: TransactionStatus::Dropped,
			receipt: Some(receipt),
		}
	}

	/// Info for a transaction the node has accepted but not yet mined.
	pub fn pending(hash: TxHash) -> Self {
		Self {
			hash,
			receipt: None,
			status: TransactionStatus::Pending,
			block_hash: None,
		}
	}
}

/// A mined block and the receipts of the transactions it contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
	pub block_number: u64,
	pub receipts: Vec<TransactionReceipt>,
}

/// Raw log entry emitted by a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
	pub topics: Vec<B256>,
	pub data: Bytes,
	/// Hash of the transaction that emitted this log.
	pub transaction_hash: TxHash,
}
