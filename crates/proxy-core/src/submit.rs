//! Serialised transaction submission.
//!
//! All submissions funnel through one bounded queue drained by a single
//! worker. The worker assigns the nonce, calls the backend and records the
//! pending hash as one step under the submission lock, which keeps nonces
//! strictly increasing per account without cross-account coordination.

use crate::error::SubmitError;
use crate::nonce::NonceTracker;
use proxy_node::NodeBackend;
use proxy_types::{TransactionRequest, TxHash};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

type Waiters = HashMap<TransactionRequest, Vec<oneshot::Sender<Result<TxHash, SubmitError>>>>;

struct SerializerInner {
	backend: Arc<dyn NodeBackend>,
	nonces: Arc<NonceTracker>,
	queue: mpsc::Sender<TransactionRequest>,
	waiting: Mutex<Waiters>,
	/// Held across nonce assignment, backend submission and the pending-set
	/// update so the three form one atomic step.
	submission_lock: Mutex<()>,
}

/// Single-writer queue that assigns nonces and submits to the backend.
pub struct SubmissionSerializer {
	inner: Arc<SerializerInner>,
	worker: JoinHandle<()>,
}

impl SubmissionSerializer {
	/// Creates the serializer and spawns its worker. `capacity` bounds the
	/// number of requests waiting for the worker.
	pub fn new(
		backend: Arc<dyn NodeBackend>,
		nonces: Arc<NonceTracker>,
		capacity: usize,
	) -> Self {
		let (queue, queue_rx) = mpsc::channel(capacity);
		let inner = Arc::new(SerializerInner {
			backend,
			nonces,
			queue,
			waiting: Mutex::new(HashMap::new()),
			submission_lock: Mutex::new(()),
		});
		let worker = tokio::spawn(run_worker(inner.clone(), queue_rx));
		Self { inner, worker }
	}

	/// Enqueues a request and returns a future for its canonical hash.
	///
	/// Enqueuing is idempotent: while a request is live, an equal request
	/// attaches to the same in-flight submission instead of re-entering the
	/// queue. A full queue fails immediately with `BackpressureExceeded`.
	pub async fn submit(
		&self,
		request: TransactionRequest,
	) -> Result<SubmissionFuture, SubmitError> {
		let (sender, receiver) = oneshot::channel();
		let mut waiting = self.inner.waiting.lock().await;
		if let Some(waiters) = waiting.get_mut(&request) {
			tracing::debug!("attaching to in-flight submission");
			waiters.push(sender);
			return Ok(SubmissionFuture { receiver });
		}
		match self.inner.queue.try_send(request.clone()) {
			Ok(()) => {
				waiting.insert(request, vec![sender]);
				Ok(SubmissionFuture { receiver })
			}
			Err(TrySendError::Full(_)) => Err(SubmitError::BackpressureExceeded),
			Err(TrySendError::Closed(_)) => Err(SubmitError::WorkerStopped),
		}
	}
}

impl Drop for SubmissionSerializer {
	fn drop(&mut self) {
		self.worker.abort();
	}
}

/// Future resolving to the canonical hash of a submitted transaction.
pub struct SubmissionFuture {
	receiver: oneshot::Receiver<Result<TxHash, SubmitError>>,
}

impl Future for SubmissionFuture {
	type Output = Result<TxHash, SubmitError>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.receiver)
			.poll(cx)
			.map(|result| result.unwrap_or(Err(SubmitError::WorkerStopped)))
	}
}

async fn run_worker(
	inner: Arc<SerializerInner>,
	mut queue: mpsc::Receiver<TransactionRequest>,
) {
	while let Some(request) = queue.recv().await {
		process(&inner, request).await;
	}
}

async fn process(inner: &SerializerInner, request: TransactionRequest) {
	let _guard = inner.submission_lock.lock().await;
	let outcome = submit_with_nonce(inner, &request).await;
	match &outcome {
		Ok(hash) => tracing::info!(tx_hash = %hash, "submitted transaction"),
		Err(err) => tracing::error!(error = %err, "transaction submission failed"),
	}
	let waiters = inner
		.waiting
		.lock()
		.await
		.remove(&request)
		.unwrap_or_default();
	for waiter in waiters {
		let _ = waiter.send(outcome.clone());
	}
}

async fn submit_with_nonce(
	inner: &SerializerInner,
	request: &TransactionRequest,
) -> Result<TxHash, SubmitError> {
	let nonce = inner.nonces.next_nonce(request.account).await?;
	let hash = inner.backend.submit(request, nonce).await?;
	inner.nonces.record_pending(request.account, hash).await;
	Ok(hash)
}
