//! Event lookup and live filtering.
//!
//! Live streams derive from the event handler's transaction notifications:
//! receipts addressed to the contract are expanded into their log entries,
//! filtered through the event descriptor and parsed into host values.
//! Historical queries run the same filter against a single fetched block or
//! transaction receipt.

use crate::error::{ConfirmationError, ProxyError};
use crate::ChainProxy;
use proxy_abi::{AbiError, EventDescriptor};
use proxy_types::{Address, BlockHash, BlockInfo, TransactionReceipt, TxHash};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;

/// Block selector for historical event queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockId {
	Number(u64),
	Hash(BlockHash),
}

/// A parsed event together with its originating transaction hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInfo<T> {
	pub transaction_hash: TxHash,
	pub result: T,
}

impl ChainProxy {
	/// Live stream of parsed events emitted by the contract at `address`.
	///
	/// The stream buffers without an upper bound; pacing is the caller's
	/// responsibility. It ends when the receiver is dropped or the event
	/// handler shuts down.
	pub fn observe_events<E>(
		&self,
		event: std::sync::Arc<E>,
		address: Address,
	) -> mpsc::UnboundedReceiver<E::Output>
	where
		E: EventDescriptor + 'static,
		E::Output: 'static,
	{
		let mut with_info = self.observe_events_with_info(event, address);
		let (sender, receiver) = mpsc::unbounded_channel();
		tokio::spawn(async move {
			while let Some(info) = with_info.recv().await {
				if sender.send(info.result).is_err() {
					break;
				}
			}
		});
		receiver
	}

	/// Like `observe_events`, keeping the originating transaction hash with
	/// each parsed value.
	pub fn observe_events_with_info<E>(
		&self,
		event: std::sync::Arc<E>,
		address: Address,
	) -> mpsc::UnboundedReceiver<EventInfo<E::Output>>
	where
		E: EventDescriptor + 'static,
		E::Output: 'static,
	{
		let mut transactions = self.events.observe_transactions();
		let (sender, receiver) = mpsc::unbounded_channel();
		tokio::spawn(async move {
			loop {
				let info = match transactions.recv().await {
					Ok(info) => info,
					Err(RecvError::Lagged(skipped)) => {
						tracing::warn!(skipped, "event stream lagged");
						continue;
					}
					Err(RecvError::Closed) => break,
				};
				let Some(receipt) = info.receipt else { continue };
				if receipt.receive_address != address {
					continue;
				}
				for data in &receipt.events {
					if !event.matches(data) {
						continue;
					}
					match event.parse(data) {
						Ok(result) => {
							let parsed = EventInfo {
								transaction_hash: info.hash,
								result,
							};
							if sender.send(parsed).is_err() {
								return;
							}
						}
						// A matching entry that fails to parse is skipped;
						// historical queries surface the same failure.
						Err(err) => {
							tracing::warn!(error = %err, "failed to parse matched event")
						}
					}
				}
			}
		});
		receiver
	}

	/// Parsed events the contract emitted in the given block. A missing
	/// block yields an empty list.
	pub async fn get_events_at_block<E>(
		&self,
		event: &E,
		address: Address,
		block: BlockId,
	) -> Result<Vec<E::Output>, ProxyError>
	where
		E: EventDescriptor,
	{
		Ok(self
			.get_events_at_block_with_info(event, address, block)
			.await?
			.into_iter()
			.map(|info| info.result)
			.collect())
	}

	pub async fn get_events_at_block_with_info<E>(
		&self,
		event: &E,
		address: Address,
		block: BlockId,
	) -> Result<Vec<EventInfo<E::Output>>, ProxyError>
	where
		E: EventDescriptor,
	{
		let block = match block {
			BlockId::Number(number) => self.backend.get_block_by_number(number).await?,
			BlockId::Hash(hash) => self.backend.get_block_by_hash(hash).await?,
		};
		match block {
			Some(block) => collect_block_events(event, address, &block).map_err(Into::into),
			None => Ok(Vec::new()),
		}
	}

	/// Parsed events the contract emitted in the given transaction. A
	/// missing receipt is an error; a receipt addressed elsewhere yields an
	/// empty list.
	pub async fn get_events_at_transaction<E>(
		&self,
		event: &E,
		address: Address,
		transaction_hash: TxHash,
	) -> Result<Vec<E::Output>, ProxyError>
	where
		E: EventDescriptor,
	{
		Ok(self
			.get_events_at_transaction_with_info(event, address, transaction_hash)
			.await?
			.into_iter()
			.map(|info| info.result)
			.collect())
	}

	pub async fn get_events_at_transaction_with_info<E>(
		&self,
		event: &E,
		address: Address,
		transaction_hash: TxHash,
	) -> Result<Vec<EventInfo<E::Output>>, ProxyError>
	where
		E: EventDescriptor,
	{
		let receipt = self
			.backend
			.get_transaction_info(transaction_hash)
			.await?
			.and_then(|info| info.receipt)
			.ok_or(ConfirmationError::ReceiptMissing)?;
		if receipt.receive_address != address {
			return Ok(Vec::new());
		}
		collect_receipt_events(event, &receipt).map_err(Into::into)
	}
}

fn collect_block_events<E>(
	event: &E,
	address: Address,
	block: &BlockInfo,
) -> Result<Vec<EventInfo<E::Output>>, AbiError>
where
	E: EventDescriptor,
{
	let mut parsed = Vec::new();
	for receipt in &block.receipts {
		if receipt.receive_address != address {
			continue;
		}
		parsed.extend(collect_receipt_events(event, receipt)?);
	}
	Ok(parsed)
}

fn collect_receipt_events<E>(
	event: &E,
	receipt: &TransactionReceipt,
) -> Result<Vec<EventInfo<E::Output>>, AbiError>
where
	E: EventDescriptor,
{
	receipt
		.events
		.iter()
		.filter(|data| event.matches(data))
		.map(|data| {
			Ok(EventInfo {
				transaction_hash: data.transaction_hash,
				result: event.parse(data)?,
			})
		})
		.collect()
}
