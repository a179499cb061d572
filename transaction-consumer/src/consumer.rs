use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::batcher::{BatchFlusher, Batcher};
use crate::error::{ConsumerError, FlushError, SourceError};
use crate::metrics_consts::{
    BATCHES_FLUSHED, BATCH_SIZE, BATCH_STORE_FAILED, BATCH_STORE_TIME, COMMIT_FAILED,
    CONSUMER_STATE, EVENTS_STORED,
};
use crate::source::{EventSource, ReceivedEvent};
use crate::store::TransactionEventStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Running,
    Draining,
    Stopped,
}

impl ConsumerState {
    fn gauge_value(self) -> f64 {
        match self {
            ConsumerState::Running => 0.0,
            ConsumerState::Draining => 1.0,
            ConsumerState::Stopped => 2.0,
        }
    }
}

/// Flushes a batch by storing its events, then acknowledging exactly the
/// offsets those events were read from.
pub struct StoreAndCommit<S, W> {
    source: Arc<S>,
    store: Arc<W>,
}

impl<S, W> StoreAndCommit<S, W> {
    pub fn new(source: Arc<S>, store: Arc<W>) -> Self {
        Self { source, store }
    }
}

#[async_trait]
impl<S, W> BatchFlusher<ReceivedEvent> for StoreAndCommit<S, W>
where
    S: EventSource,
    W: TransactionEventStore,
{
    type Error = FlushError;

    async fn flush(&self, batch: Vec<ReceivedEvent>) -> Result<(), FlushError> {
        let size = batch.len();
        let (events, offsets): (Vec<_>, Vec<_>) = batch
            .into_iter()
            .map(|received| (received.event, received.offset))
            .unzip();

        let store_time = common_metrics::timing_guard(BATCH_STORE_TIME, &[]);
        let stored = self.store.batch_store(&events).await;
        store_time.fin();

        if let Err(source) = stored {
            metrics::counter!(BATCH_STORE_FAILED).increment(1);
            return Err(FlushError::Store { size, source });
        }

        metrics::counter!(BATCHES_FLUSHED).increment(1);
        metrics::counter!(EVENTS_STORED).increment(size as u64);
        metrics::histogram!(BATCH_SIZE).record(size as f64);

        // The batch is durable, a failed commit only means redelivery
        if let Err(e) = self.source.commit(&offsets).await {
            metrics::counter!(COMMIT_FAILED).increment(1);
            warn!(error = %e, size, "failed to commit offsets of stored batch");
        }

        Ok(())
    }
}

/// Reads events from a source and stores them in batches. Offsets are only
/// committed once the batch holding them is stored.
pub struct TransactionConsumer<S, W> {
    source: Arc<S>,
    store: Arc<W>,
    batch_size: usize,
    batch_timeout: Duration,
    state: watch::Sender<ConsumerState>,
}

impl<S: EventSource, W: TransactionEventStore> TransactionConsumer<S, W> {
    pub fn new(source: Arc<S>, store: Arc<W>, batch_size: usize, batch_timeout: Duration) -> Self {
        let (state, _) = watch::channel(ConsumerState::Running);
        Self {
            source,
            store,
            batch_size,
            batch_timeout,
            state,
        }
    }

    pub fn state(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }

    /// Consume until `shutdown` fires or the source reports cancellation, then
    /// flush the partial batch and return. A store failure or a source error
    /// stops the loop and is returned.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ConsumerError> {
        let flusher = StoreAndCommit::new(self.source.clone(), self.store.clone());
        let batcher = match Batcher::new(self.batch_size, self.batch_timeout, flusher) {
            Ok(batcher) => batcher,
            Err(e) => {
                self.set_state(ConsumerState::Stopped);
                return Err(e.into());
            }
        };

        info!(
            batch_size = self.batch_size,
            batch_timeout_ms = self.batch_timeout.as_millis() as u64,
            "starting transaction consumer"
        );
        self.set_state(ConsumerState::Running);

        let result = self.consume(&batcher, &shutdown).await;

        self.set_state(ConsumerState::Stopped);
        info!("transaction consumer stopped");
        result
    }

    async fn consume(
        &self,
        batcher: &Batcher<ReceivedEvent, StoreAndCommit<S, W>>,
        shutdown: &CancellationToken,
    ) -> Result<(), ConsumerError> {
        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                received = self.source.recv() => Some(received),
            };

            match received {
                None | Some(Err(SourceError::Cancelled)) => {
                    self.set_state(ConsumerState::Draining);
                    info!("shutdown requested, flushing buffered events");
                    batcher.close().await?;
                    return Ok(());
                }
                Some(Ok(event)) => {
                    if let Err(e) = batcher.add(event).await {
                        error!(error = %e, "failed to store batch, stopping consumer");
                        if let Err(close_err) = batcher.close().await {
                            warn!(error = %close_err, "failed to close batcher");
                        }
                        return Err(e.into());
                    }
                }
                Some(Err(e)) => {
                    error!(error = %e, "failed to receive event, stopping consumer");
                    // Whatever was read so far can still be stored and committed
                    if let Err(close_err) = batcher.close().await {
                        warn!(error = %close_err, "failed to flush buffered events");
                    }
                    return Err(e.into());
                }
            }
        }
    }

    fn set_state(&self, state: ConsumerState) {
        common_metrics::gauge(CONSUMER_STATE, &[], state.gauge_value());
        self.state.send_replace(state);
    }
}
