use async_trait::async_trait;
use common_kafka::kafka_consumer::{Offset, SingleTopicConsumer};
use common_types::TransactionEvent;
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::metrics_consts::{EVENTS_RECEIVED, EVENT_PARSE_ERROR};

/// An event together with the stream position it was read from.
#[derive(Debug, Clone)]
pub struct ReceivedEvent {
    pub event: TransactionEvent,
    pub offset: Offset,
}

/// A stream of transaction events with explicit acknowledgement.
#[async_trait]
pub trait EventSource: Send + Sync + 'static {
    /// Wait for the next event. Dropping the future abandons the wait.
    async fn recv(&self) -> Result<ReceivedEvent, SourceError>;

    /// Acknowledge every event at or before the given offsets.
    async fn commit(&self, offsets: &[Offset]) -> Result<(), SourceError>;
}

pub struct KafkaEventSource {
    consumer: SingleTopicConsumer,
}

impl KafkaEventSource {
    pub fn new(consumer: SingleTopicConsumer) -> Self {
        Self { consumer }
    }
}

#[async_trait]
impl EventSource for KafkaEventSource {
    // Malformed messages are skipped without a commit of their own. The commit
    // of any later offset on the same partition moves past them.
    async fn recv(&self) -> Result<ReceivedEvent, SourceError> {
        loop {
            let message = self.consumer.recv().await?;
            let offset = message.offset;

            let parsed = match message.payload.as_deref() {
                Some(payload) => TransactionEvent::from_payload(payload),
                None => {
                    warn!(
                        partition = offset.partition,
                        offset = offset.offset,
                        "received message without payload"
                    );
                    metrics::counter!(EVENT_PARSE_ERROR, "cause" => "empty").increment(1);
                    continue;
                }
            };

            match parsed {
                Ok(event) => {
                    metrics::counter!(EVENTS_RECEIVED).increment(1);
                    return Ok(ReceivedEvent { event, offset });
                }
                Err(e) => {
                    warn!(
                        partition = offset.partition,
                        offset = offset.offset,
                        error = %e,
                        "dropping malformed transaction event"
                    );
                    metrics::counter!(EVENT_PARSE_ERROR, "cause" => "decode").increment(1);
                }
            }
        }
    }

    async fn commit(&self, offsets: &[Offset]) -> Result<(), SourceError> {
        self.consumer.commit(offsets).await?;
        debug!(count = offsets.len(), "committed offsets");
        Ok(())
    }
}
