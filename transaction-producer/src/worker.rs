use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::{ProducerError, SinkError};
use crate::generator::TransactionGenerator;
use crate::metrics_consts::{ACTIVE_WORKERS, EVENTS_PUBLISHED, PUBLISH_FAILED, PUBLISH_TIME};
use crate::sink::EventSink;

/// A job is a permit to generate and publish one event.
pub type Job = ();

pub fn worker_count(creation_rps: usize, min_workers: usize) -> usize {
    creation_rps.max(min_workers).max(1)
}

/// Workers sharing one job queue. The first publish failure cancels the
/// pool token, which stops every worker.
pub struct WorkerPool {
    workers: JoinSet<()>,
    failure: Arc<Mutex<Option<SinkError>>>,
}

impl WorkerPool {
    pub fn spawn<K: EventSink>(
        count: usize,
        jobs: mpsc::Receiver<Job>,
        generator: Arc<TransactionGenerator>,
        sink: Arc<K>,
        cancel: CancellationToken,
    ) -> Self {
        let jobs = Arc::new(Mutex::new(jobs));
        let failure = Arc::new(Mutex::new(None));

        let mut workers = JoinSet::new();
        for id in 0..count {
            workers.spawn(worker(
                id,
                jobs.clone(),
                generator.clone(),
                sink.clone(),
                cancel.clone(),
                failure.clone(),
            ));
        }
        common_metrics::gauge(ACTIVE_WORKERS, &[], count as f64);

        Self { workers, failure }
    }

    /// Wait for every worker to stop, then report the publish failure that
    /// stopped the pool, if any.
    pub async fn join(mut self) -> Result<(), ProducerError> {
        while let Some(joined) = self.workers.join_next().await {
            joined?;
        }
        common_metrics::gauge(ACTIVE_WORKERS, &[], 0.0);

        match self.failure.lock().await.take() {
            Some(e) => Err(ProducerError::Publish(e)),
            None => Ok(()),
        }
    }
}

async fn worker<K: EventSink>(
    id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
    generator: Arc<TransactionGenerator>,
    sink: Arc<K>,
    cancel: CancellationToken,
    failure: Arc<Mutex<Option<SinkError>>>,
) {
    debug!(worker = id, "worker started");

    loop {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            job = async { jobs.lock().await.recv().await } => job,
        };
        if job.is_none() {
            break;
        }
        // A job that raced with cancellation is dropped
        if cancel.is_cancelled() {
            break;
        }

        let event = generator.generate();
        let publish_time = common_metrics::timing_guard(PUBLISH_TIME, &[]);
        let published = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            published = sink.publish(&event) => published,
        };
        publish_time.fin();

        match published {
            Ok(()) => metrics::counter!(EVENTS_PUBLISHED).increment(1),
            Err(e) => {
                metrics::counter!(PUBLISH_FAILED).increment(1);
                error!(worker = id, error = %e, "failed to publish event, stopping workers");

                let mut failure = failure.lock().await;
                if failure.is_none() {
                    *failure = Some(e);
                }
                cancel.cancel();
            }
        }
    }

    debug!(worker = id, "worker stopped");
}
