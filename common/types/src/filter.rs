use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Money, TransactionType};

pub const DEFAULT_SEARCH_LIMIT: i64 = 1000;

/// Search criteria for stored transaction events. Every bound is optional
/// and inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionEventFilter {
    pub user_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
    pub amount_from: Option<Money>,
    pub amount_to: Option<Money>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl TransactionEventFilter {
    /// The limit actually applied to a query: non-positive or oversized
    /// limits fall back to `DEFAULT_SEARCH_LIMIT`.
    pub fn effective_limit(&self) -> i64 {
        if self.limit <= 0 || self.limit > DEFAULT_SEARCH_LIMIT {
            DEFAULT_SEARCH_LIMIT
        } else {
            self.limit
        }
    }

    pub fn effective_offset(&self) -> Option<i64> {
        (self.offset > 0).then_some(self.offset)
    }
}
