use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common_types::TransactionEvent;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use transaction_producer::error::{ProducerError, SinkError};
use transaction_producer::generator::TransactionGenerator;
use transaction_producer::producer::{DriverSettings, TransactionProducer};
use transaction_producer::sink::EventSink;

#[derive(Default)]
struct MockSink {
    attempts: AtomicUsize,
    published: Mutex<Vec<TransactionEvent>>,
    fail_on_attempt: Option<usize>,
    delay: Option<Duration>,
}

impl MockSink {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn failing_on(attempt: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_on_attempt: Some(attempt),
            ..Default::default()
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Default::default()
        })
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn published(&self) -> usize {
        self.published.lock().len()
    }
}

#[async_trait]
impl EventSink for MockSink {
    async fn publish(&self, event: &TransactionEvent) -> Result<(), SinkError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on_attempt == Some(attempt) {
            return Err(SinkError::Canceled);
        }
        self.published.lock().push(event.clone());
        Ok(())
    }
}

fn producer(sink: Arc<MockSink>, settings: DriverSettings) -> TransactionProducer<MockSink> {
    let generator = TransactionGenerator::new(10, 10, 1000).unwrap();
    TransactionProducer::new(generator, sink, settings)
}

#[tokio::test(start_paused = true)]
async fn test_initial_burst_is_published() {
    let sink = MockSink::new();
    let driver = producer(
        sink.clone(),
        DriverSettings {
            initial_batch_size: 25,
            creation_rps: 0,
            min_workers: 3,
            ..Default::default()
        },
    );

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { driver.run(shutdown).await }
    });

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(sink.published(), 25);

    shutdown.cancel();
    handle.await.unwrap().unwrap();
    assert_eq!(sink.published(), 25);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_add_rps_jobs_every_second() {
    let sink = MockSink::new();
    let driver = producer(
        sink.clone(),
        DriverSettings {
            initial_batch_size: 0,
            creation_rps: 10,
            min_workers: 2,
            ..Default::default()
        },
    );

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { driver.run(shutdown).await }
    });

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(sink.published(), 0);

    tokio::time::sleep(Duration::from_millis(3000)).await;
    assert_eq!(sink.published(), 30);

    shutdown.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_publish_failure_stops_all_workers() {
    let sink = MockSink::failing_on(5);
    let driver = producer(
        sink.clone(),
        DriverSettings {
            initial_batch_size: 100,
            creation_rps: 10,
            min_workers: 4,
            ..Default::default()
        },
    );

    let result = driver.run(CancellationToken::new()).await;

    assert!(matches!(
        result,
        Err(ProducerError::Publish(SinkError::Canceled))
    ));
    let attempts = sink.attempts();
    assert!(
        (5..=5 + 10).contains(&attempts),
        "unexpected attempts: {attempts}"
    );
    assert_eq!(sink.published(), attempts - 1);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(sink.attempts(), attempts);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_unblocks_full_queue() {
    let sink = MockSink::slow(Duration::from_secs(3600));
    let driver = producer(
        sink.clone(),
        DriverSettings {
            initial_batch_size: 1000,
            creation_rps: 5,
            min_workers: 2,
            ..Default::default()
        },
    );

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { driver.run(shutdown).await }
    });

    tokio::time::sleep(Duration::from_millis(1500)).await;
    // Every worker is stuck publishing, the rest of the burst waits for room
    assert_eq!(sink.attempts(), 5);

    shutdown.cancel();
    let result = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("driver did not stop");
    result.unwrap().unwrap();
    assert_eq!(sink.published(), 0);
}
