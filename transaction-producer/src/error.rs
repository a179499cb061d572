use common_types::WireError;
use rdkafka::error::KafkaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] WireError),
    #[error("failed to publish to kafka: {0}")]
    Kafka(#[from] KafkaError),
    #[error("delivery of the event was cancelled")]
    Canceled,
}

#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("distinct user count must be greater than zero")]
    NoUsers,
    #[error("publish failed, producer stopped: {0}")]
    Publish(#[from] SinkError),
    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
