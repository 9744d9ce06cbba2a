//! Coalesces concurrently issued queries into one request per scheduling tick

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error};

use crate::error::FetchError;
use crate::metrics::Metrics;
use crate::query::{QueryResponse, SignalSetQuery};
use crate::services::transport::SignalsTransport;

/// Flat response of a flushed batch, shared by every caller in it
pub type BatchOutcome = Result<Arc<Vec<QueryResponse>>, FetchError>;

type BatchCompletion = Shared<BoxFuture<'static, BatchOutcome>>;

/// Queries collected since the last flush.
///
/// `resolve` is written exactly once, when the batch is flushed; every
/// ticket handed out for this batch reads `completion`.
struct PendingBatch {
    id: u64,
    queries: Vec<SignalSetQuery>,
    resolve: oneshot::Sender<BatchOutcome>,
    completion: BatchCompletion,
    scheduled: bool,
}

impl PendingBatch {
    fn new(id: u64) -> Self {
        let (resolve, receiver) = oneshot::channel();
        let completion = async move {
            receiver
                .await
                .unwrap_or(Err(FetchError::BatchAbandoned))
        }
        .boxed()
        .shared();

        Self {
            id,
            queries: Vec::new(),
            resolve,
            completion,
            scheduled: false,
        }
    }
}

/// A caller's place in a batch: its queries occupy
/// `offset .. offset + len` of the batch response
pub struct BatchTicket {
    pub batch_id: u64,
    pub offset: usize,
    pub len: usize,
    completion: BatchCompletion,
}

impl BatchTicket {
    /// Wait for the batch to be flushed and answered
    pub async fn wait(self) -> BatchOutcome {
        self.completion.await
    }
}

struct SchedulerState {
    transport: Arc<dyn SignalsTransport>,
    pending: Mutex<PendingBatch>,
    next_batch_id: AtomicU64,
}

/// Batching point shared by every session that should share round trips.
///
/// Cloning is cheap and clones feed the same pending batch.
#[derive(Clone)]
pub struct FetchScheduler {
    state: Arc<SchedulerState>,
    flush_delay: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl FetchScheduler {
    pub fn new(transport: Arc<dyn SignalsTransport>) -> Self {
        Self {
            state: Arc::new(SchedulerState {
                transport,
                pending: Mutex::new(PendingBatch::new(0)),
                next_batch_id: AtomicU64::new(1),
            }),
            flush_delay: Duration::ZERO,
            metrics: None,
        }
    }

    /// Wait this long after the first enqueue before flushing.
    ///
    /// With zero the flush task only yields once, which captures everything
    /// enqueued by tasks that are already runnable. A small delay also
    /// catches callers on other worker threads.
    pub fn with_flush_delay(mut self, flush_delay: Duration) -> Self {
        self.flush_delay = flush_delay;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Append `queries` to the pending batch and schedule a flush if needed
    pub async fn enqueue(&self, queries: Vec<SignalSetQuery>) -> BatchTicket {
        let mut pending = self.state.pending.lock().await;

        let offset = pending.queries.len();
        let len = queries.len();
        pending.queries.extend(queries);

        let ticket = BatchTicket {
            batch_id: pending.id,
            offset,
            len,
            completion: pending.completion.clone(),
        };

        if !pending.scheduled {
            pending.scheduled = true;
            let scheduler = self.clone();
            tokio::spawn(async move {
                scheduler.wait_for_tick().await;
                scheduler.flush().await;
            });
        }

        debug!(
            batch_id = ticket.batch_id,
            offset = offset,
            queries = len,
            "Queries enqueued"
        );

        ticket
    }

    /// Number of queries waiting for the next flush
    pub async fn pending_queries(&self) -> usize {
        self.state.pending.lock().await.queries.len()
    }

    async fn wait_for_tick(&self) {
        if self.flush_delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.flush_delay).await;
        }
    }

    async fn flush(&self) {
        // Swap under the lock: anything enqueued from here on lands in the
        // fresh batch, never in the one being sent.
        let batch = {
            let mut pending = self.state.pending.lock().await;
            let next_id = self.state.next_batch_id.fetch_add(1, Ordering::Relaxed);
            std::mem::replace(&mut *pending, PendingBatch::new(next_id))
        };
        let PendingBatch {
            id,
            queries,
            resolve,
            ..
        } = batch;

        if let Some(metrics) = &self.metrics {
            metrics.batches_flushed.inc();
            metrics.queries_sent.inc_by(queries.len() as u64);
            metrics.batch_size.observe(queries.len() as f64);
        }

        let start = Instant::now();
        let outcome = match self.state.transport.query(&queries).await {
            Ok(responses) if responses.len() == queries.len() => Ok(Arc::new(responses)),
            Ok(responses) => Err(FetchError::ResponseLength {
                expected: queries.len(),
                actual: responses.len(),
            }),
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(_) => debug!(
                batch_id = id,
                queries = queries.len(),
                duration_ms = start.elapsed().as_millis(),
                "Batch flushed"
            ),
            Err(e) => {
                error!(
                    batch_id = id,
                    queries = queries.len(),
                    error = %e,
                    "Batch failed, rejecting all waiters"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.batch_failures.inc();
                }
            }
        }

        if resolve.send(outcome).is_err() {
            debug!(batch_id = id, "Batch completed with no remaining waiters");
        }
    }
}
