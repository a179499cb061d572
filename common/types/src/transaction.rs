use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Bet,
    Win,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Bet => "bet",
            TransactionType::Win => "win",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid transaction type: {0}")]
pub struct ParseTransactionTypeError(pub String);

impl FromStr for TransactionType {
    type Err = ParseTransactionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bet" => Ok(TransactionType::Bet),
            "win" => Ok(TransactionType::Win),
            other => Err(ParseTransactionTypeError(other.to_owned())),
        }
    }
}

/// A single bet or win, as stored in the transaction log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEvent {
    pub user_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
}

impl TransactionEvent {
    pub fn new(
        user_id: Uuid,
        transaction_type: TransactionType,
        amount: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            transaction_type,
            amount,
            created_at,
        }
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self, WireError> {
        let message: TransactionEventMessage = serde_json::from_slice(payload)?;
        Ok(message.into())
    }

    pub fn to_payload(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(&TransactionEventMessage::from(self))?)
    }
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("failed to (de)serialize transaction event: {0}")]
    Serde(#[from] serde_json::Error),
}

/// The JSON representation of a `TransactionEvent` on the message stream.
/// The amount travels in major units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEventMessage {
    pub user_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<&TransactionEvent> for TransactionEventMessage {
    fn from(event: &TransactionEvent) -> Self {
        Self {
            user_id: event.user_id,
            transaction_type: event.transaction_type,
            amount: event.amount.to_major(),
            timestamp: event.created_at,
        }
    }
}

impl From<TransactionEventMessage> for TransactionEvent {
    fn from(message: TransactionEventMessage) -> Self {
        Self {
            user_id: message.user_id,
            transaction_type: message.transaction_type,
            amount: Money::from_major(message.amount),
            created_at: message.timestamp,
        }
    }
}
