use chrono::{DateTime, Utc};
use common_types::{
    Money, TransactionEvent, TransactionEventFilter, TransactionEventMessage, TransactionType,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Search criteria as accepted over HTTP. Amounts are in major units.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TransactionSearchRequest {
    pub user_id: Option<String>,
    pub transaction_type: Option<String>,
    pub amount_from: Option<f64>,
    pub amount_to: Option<f64>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionSearchResponse {
    pub total: usize,
    pub limit: i64,
    pub offset: i64,
    pub transactions: Vec<TransactionEventMessage>,
}

impl TryFrom<&TransactionSearchRequest> for TransactionEventFilter {
    type Error = ApiError;

    fn try_from(request: &TransactionSearchRequest) -> Result<Self, Self::Error> {
        let user_id = match request.user_id.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(
                Uuid::parse_str(raw)
                    .map_err(|e| ApiError::InvalidFilter(format!("invalid user_id: {e}")))?,
            ),
        };

        // "all" is what clients send to mean "any type"
        let transaction_type = match request.transaction_type.as_deref() {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(
                raw.parse::<TransactionType>()
                    .map_err(|e| ApiError::InvalidFilter(e.to_string()))?,
            ),
        };

        Ok(TransactionEventFilter {
            user_id,
            transaction_type,
            amount_from: request.amount_from.map(Money::from_major),
            amount_to: request.amount_to.map(Money::from_major),
            created_from: request.created_from,
            created_to: request.created_to,
            limit: request.limit,
            offset: request.offset,
        })
    }
}

impl TransactionSearchResponse {
    pub fn new(request: &TransactionSearchRequest, events: &[TransactionEvent]) -> Self {
        Self {
            total: events.len(),
            limit: request.limit,
            offset: request.offset,
            transactions: events.iter().map(TransactionEventMessage::from).collect(),
        }
    }
}
