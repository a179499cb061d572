#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use chrono::{DateTime, TimeZone, Utc};
use common_kafka::kafka_consumer::Offset;
use common_types::{Money, TransactionEvent, TransactionEventFilter, TransactionType};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use transaction_consumer::app::{create_router, AppState};
use transaction_consumer::error::{SourceError, StoreError};
use transaction_consumer::source::{EventSource, ReceivedEvent};
use transaction_consumer::store::{TransactionEventReader, TransactionEventStore};

pub fn test_event(created_at_secs: i64) -> TransactionEvent {
    TransactionEvent::new(
        Uuid::new_v4(),
        TransactionType::Bet,
        Money::from_minor(1000),
        timestamp(created_at_secs),
    )
}

pub fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn received(partition: i32, offset: i64) -> ReceivedEvent {
    ReceivedEvent {
        event: test_event(offset),
        offset: Offset { partition, offset },
    }
}

/// A source fed through a channel. Once the channel is drained and closed,
/// `recv` waits forever, like an idle topic.
pub struct MockSource {
    events: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<ReceivedEvent, SourceError>>>,
    received: AtomicUsize,
    commits: Mutex<Vec<Vec<Offset>>>,
    fail_commits: AtomicBool,
}

impl MockSource {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedSender<Result<ReceivedEvent, SourceError>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Arc::new(Self {
            events: tokio::sync::Mutex::new(rx),
            received: AtomicUsize::new(0),
            commits: Mutex::new(Vec::new()),
            fail_commits: AtomicBool::new(false),
        });
        (source, tx)
    }

    pub fn received(&self) -> usize {
        self.received.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> Vec<Vec<Offset>> {
        self.commits.lock().clone()
    }

    pub fn fail_commits(&self) {
        self.fail_commits.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventSource for MockSource {
    async fn recv(&self) -> Result<ReceivedEvent, SourceError> {
        let mut events = self.events.lock().await;
        match events.recv().await {
            Some(item) => {
                self.received.fetch_add(1, Ordering::SeqCst);
                item
            }
            None => std::future::pending().await,
        }
    }

    async fn commit(&self, offsets: &[Offset]) -> Result<(), SourceError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(SourceError::Kafka(
                rdkafka::error::KafkaError::ConsumerCommit(
                    rdkafka::error::RDKafkaErrorCode::BrokerTransportFailure,
                ),
            ));
        }
        self.commits.lock().push(offsets.to_vec());
        Ok(())
    }
}

/// An in-memory store that can be told to fail a given flush (1-based).
pub struct MockStore {
    batches: Mutex<Vec<Vec<TransactionEvent>>>,
    fail_on_call: Option<usize>,
    calls: AtomicUsize,
    healthy: bool,
}

impl MockStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(Vec::new()),
            fail_on_call: None,
            calls: AtomicUsize::new(0),
            healthy: true,
        })
    }

    pub fn failing_on(call: usize) -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(Vec::new()),
            fail_on_call: Some(call),
            calls: AtomicUsize::new(0),
            healthy: true,
        })
    }

    pub fn with_events(events: Vec<TransactionEvent>) -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(vec![events]),
            fail_on_call: None,
            calls: AtomicUsize::new(0),
            healthy: true,
        })
    }

    pub fn unhealthy() -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(Vec::new()),
            fail_on_call: None,
            calls: AtomicUsize::new(0),
            healthy: false,
        })
    }

    pub fn batches(&self) -> Vec<Vec<TransactionEvent>> {
        self.batches.lock().clone()
    }

    pub fn stored(&self) -> Vec<TransactionEvent> {
        self.batches().into_iter().flatten().collect()
    }
}

#[async_trait]
impl TransactionEventStore for MockStore {
    async fn batch_store(&self, events: &[TransactionEvent]) -> Result<(), StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.batches.lock().push(events.to_vec());
        if self.fail_on_call == Some(call) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionEventReader for MockStore {
    async fn search(
        &self,
        filter: &TransactionEventFilter,
    ) -> Result<Vec<TransactionEvent>, StoreError> {
        if !self.healthy {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut events: Vec<TransactionEvent> = self
            .stored()
            .into_iter()
            .filter(|e| filter.user_id.map_or(true, |id| e.user_id == id))
            .filter(|e| {
                filter
                    .transaction_type
                    .map_or(true, |t| e.transaction_type == t)
            })
            .filter(|e| filter.amount_from.map_or(true, |a| e.amount >= a))
            .filter(|e| filter.amount_to.map_or(true, |a| e.amount <= a))
            .filter(|e| filter.created_from.map_or(true, |t| e.created_at >= t))
            .filter(|e| filter.created_to.map_or(true, |t| e.created_at <= t))
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = filter.effective_offset().unwrap_or(0) as usize;
        let limit = filter.effective_limit() as usize;
        Ok(events.into_iter().skip(offset).take(limit).collect())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        if self.healthy {
            Ok(())
        } else {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
    }
}

pub struct TestHarness {
    router: axum::Router,
}

impl TestHarness {
    pub fn new(store: Arc<MockStore>) -> Self {
        Self {
            router: create_router(AppState { reader: store }),
        }
    }

    pub async fn get(&self, path: &str) -> Response<Body> {
        self.router
            .clone()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post(&self, path: &str, body: &str) -> Response<Body> {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(path)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    pub async fn body_json<T: serde::de::DeserializeOwned>(response: Response<Body>) -> T {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }
}
