use async_trait::async_trait;
use common_kafka::kafka_producer::KafkaContext;
use common_types::TransactionEvent;
use rdkafka::producer::{FutureProducer, FutureRecord};

use crate::error::SinkError;

/// Destination for generated events.
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    async fn publish(&self, event: &TransactionEvent) -> Result<(), SinkError>;
}

pub struct KafkaEventSink {
    producer: FutureProducer<KafkaContext>,
    topic: String,
}

impl KafkaEventSink {
    pub fn new(producer: FutureProducer<KafkaContext>, topic: String) -> Self {
        Self { producer, topic }
    }
}

#[async_trait]
impl EventSink for KafkaEventSink {
    async fn publish(&self, event: &TransactionEvent) -> Result<(), SinkError> {
        let payload = event.to_payload()?;
        // Keyed by user so one user's events keep their order
        let key = event.user_id.to_string();

        let record = FutureRecord::to(&self.topic).key(&key).payload(&payload);

        match self.producer.send_result(record) {
            Err((e, _)) => Err(SinkError::Kafka(e)),
            Ok(delivery) => match delivery.await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err((e, _))) => Err(SinkError::Kafka(e)),
                Err(_) => Err(SinkError::Canceled),
            },
        }
    }
}
