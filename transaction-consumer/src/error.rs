use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common_kafka::kafka_consumer::OffsetErr;
use rdkafka::error::KafkaError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatcherError<E> {
    #[error("batch capacity must be greater than zero")]
    InvalidCapacity,
    #[error("batch timeout must be greater than zero")]
    InvalidTimeout,
    #[error("batcher is closed")]
    Closed,
    #[error("batch flush failed: {0}")]
    Flush(E),
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("event source was cancelled")]
    Cancelled,
    #[error("kafka error: {0}")]
    Kafka(#[from] KafkaError),
    #[error("offset commit failed: {0}")]
    Commit(#[from] OffsetErr),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored row is invalid: {0}")]
    InvalidRow(String),
}

/// Failure of a single batch flush: the store rejected it. Offset commit
/// failures are not flush failures.
#[derive(Error, Debug)]
pub enum FlushError {
    #[error("failed to store batch of {size} events: {source}")]
    Store { size: usize, source: StoreError },
}

#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("failed to receive event: {0}")]
    Source(#[from] SourceError),
    #[error(transparent)]
    Batcher(#[from] BatcherError<FlushError>),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid filter parameters: {0}")]
    InvalidFilter(String),
    #[error("Failed to search transactions: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            ApiError::InvalidFilter(msg) => (
                StatusCode::BAD_REQUEST,
                "Invalid filter parameters",
                msg.clone(),
            ),
            ApiError::Store(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to search transactions",
                e.to_string(),
            ),
        };

        tracing::error!(error = ?self, status = %status, "Request error");

        let body = Json(json!({
            "error": error,
            "message": message,
        }));

        (status, body).into_response()
    }
}
