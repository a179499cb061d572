use std::collections::BTreeMap;
use std::sync::Arc;

use rdkafka::{
    consumer::{CommitMode, Consumer, StreamConsumer},
    error::KafkaError,
    ClientConfig, Message, TopicPartitionList,
};
use tracing::debug;

use crate::config::{ConsumerConfig, KafkaConfig};

/// A consumer subscribed to exactly one topic, with automatic offset
/// commits disabled. Offsets only move forward through `commit`.
#[derive(Clone)]
pub struct SingleTopicConsumer {
    inner: Arc<Inner>,
}

struct Inner {
    consumer: StreamConsumer,
    topic: String,
}

/// The position of a consumed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset {
    pub partition: i32,
    pub offset: i64,
}

pub struct ConsumedMessage {
    pub payload: Option<Vec<u8>>,
    pub offset: Offset,
}

#[derive(Debug, thiserror::Error)]
pub enum OffsetErr {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),
    #[error("Commit task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl SingleTopicConsumer {
    pub fn new(
        common_config: &KafkaConfig,
        consumer_config: &ConsumerConfig,
    ) -> Result<Self, KafkaError> {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &common_config.kafka_hosts)
            .set("statistics.interval.ms", "10000")
            .set("group.id", &consumer_config.kafka_consumer_group)
            .set(
                "auto.offset.reset",
                &consumer_config.kafka_consumer_offset_reset,
            )
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false");

        common_config.apply_security(&mut client_config);

        debug!("rdkafka configuration: {:?}", client_config);
        let consumer: StreamConsumer = client_config.create()?;
        consumer.subscribe(&[consumer_config.kafka_consumer_topic.as_str()])?;

        let inner = Inner {
            consumer,
            topic: consumer_config.kafka_consumer_topic.clone(),
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn topic(&self) -> &str {
        &self.inner.topic
    }

    /// Wait for the next message. Dropping the returned future cancels the wait.
    pub async fn recv(&self) -> Result<ConsumedMessage, KafkaError> {
        let message = self.inner.consumer.recv().await?;

        Ok(ConsumedMessage {
            payload: message.payload().map(<[u8]>::to_vec),
            offset: Offset {
                partition: message.partition(),
                offset: message.offset(),
            },
        })
    }

    /// Synchronously commit the given offsets for this consumer's group. For
    /// each partition, the committed position is one past the highest offset.
    pub async fn commit(&self, offsets: &[Offset]) -> Result<(), OffsetErr> {
        let positions = next_positions(offsets);
        if positions.is_empty() {
            return Ok(());
        }

        let mut list = TopicPartitionList::new();
        for (partition, position) in positions {
            list.add_partition_offset(
                &self.inner.topic,
                partition,
                rdkafka::Offset::Offset(position),
            )?;
        }

        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.consumer.commit(&list, CommitMode::Sync))
            .await??;

        Ok(())
    }
}

/// Reduce a set of consumed offsets to the position to commit per partition.
pub fn next_positions(offsets: &[Offset]) -> BTreeMap<i32, i64> {
    let mut positions = BTreeMap::new();
    for offset in offsets {
        let next = offset.offset + 1;
        positions
            .entry(offset.partition)
            .and_modify(|current: &mut i64| *current = (*current).max(next))
            .or_insert(next);
    }
    positions
}
