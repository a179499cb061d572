use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::ProducerError;
use crate::generator::TransactionGenerator;
use crate::metrics_consts::JOBS_SCHEDULED;
use crate::sink::EventSink;
use crate::worker::{worker_count, Job, WorkerPool};

#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub initial_batch_size: usize,
    pub creation_rps: usize,
    pub min_workers: usize,
    pub tick: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            initial_batch_size: 100,
            creation_rps: 10,
            min_workers: 10,
            tick: Duration::from_secs(1),
        }
    }
}

/// Feeds the worker pool: one burst of jobs at startup, then `creation_rps`
/// jobs on every tick.
pub struct TransactionProducer<K> {
    generator: Arc<TransactionGenerator>,
    sink: Arc<K>,
    settings: DriverSettings,
}

impl<K: EventSink> TransactionProducer<K> {
    pub fn new(generator: TransactionGenerator, sink: Arc<K>, settings: DriverSettings) -> Self {
        Self {
            generator: Arc::new(generator),
            sink,
            settings,
        }
    }

    /// Run until `shutdown` fires, which returns `Ok`, or until a publish
    /// fails, which returns that failure.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), ProducerError> {
        let pool_token = shutdown.child_token();
        let (jobs, receiver) = mpsc::channel::<Job>((self.settings.creation_rps * 2).max(1));

        let workers = worker_count(self.settings.creation_rps, self.settings.min_workers);
        let pool = WorkerPool::spawn(
            workers,
            receiver,
            self.generator.clone(),
            self.sink.clone(),
            pool_token.clone(),
        );
        info!(
            workers,
            creation_rps = self.settings.creation_rps,
            initial_batch_size = self.settings.initial_batch_size,
            "starting transaction producer"
        );

        if schedule(&jobs, self.settings.initial_batch_size, &pool_token).await {
            let tick = self.settings.tick;
            let mut ticker = interval_at(Instant::now() + tick, tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = pool_token.cancelled() => break,
                    _ = ticker.tick() => {
                        if !schedule(&jobs, self.settings.creation_rps, &pool_token).await {
                            break;
                        }
                    }
                }
            }
        }

        // Closing the queue lets idle workers exit
        drop(jobs);
        pool_token.cancel();
        let result = pool.join().await;

        info!("transaction producer stopped");
        result
    }
}

/// Queue `count` jobs, waiting for room as needed. Returns false once the
/// pool is cancelled or gone.
async fn schedule(jobs: &mpsc::Sender<Job>, count: usize, cancel: &CancellationToken) -> bool {
    for _ in 0..count {
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => return false,
            sent = jobs.send(()) => sent,
        };
        if sent.is_err() {
            return false;
        }
        metrics::counter!(JOBS_SCHEDULED).increment(1);
    }
    true
}
