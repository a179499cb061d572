use chrono::{DateTime, Utc};
use common_types::{Money, TransactionEvent, TransactionType};
use rand::Rng;
use uuid::Uuid;

use crate::error::ProducerError;

/// Amounts are generated on a grid of this many major units.
pub const AMOUNT_STEP: i64 = 5;

/// Builds synthetic transactions for a fixed pool of users.
#[derive(Debug, Clone)]
pub struct TransactionGenerator {
    users: Vec<Uuid>,
    amount_from: i64,
    amount_to: i64,
}

impl TransactionGenerator {
    pub fn new(
        distinct_users: usize,
        amount_from: i64,
        amount_to: i64,
    ) -> Result<Self, ProducerError> {
        if distinct_users == 0 {
            return Err(ProducerError::NoUsers);
        }

        let users = (0..distinct_users).map(|_| Uuid::new_v4()).collect();
        Ok(Self {
            users,
            amount_from,
            amount_to,
        })
    }

    pub fn users(&self) -> &[Uuid] {
        &self.users
    }

    pub fn generate(&self) -> TransactionEvent {
        let x = rand::thread_rng().gen_range(0..i64::MAX);
        self.generate_from(x, Utc::now())
    }

    /// Everything about the event is derived from `x`: the user, the type
    /// (even is a win) and the amount.
    pub fn generate_from(&self, x: i64, created_at: DateTime<Utc>) -> TransactionEvent {
        let user_index = x.unsigned_abs() % self.users.len() as u64;
        let user_id = self.users[user_index as usize];

        let transaction_type = if x % 2 == 0 {
            TransactionType::Win
        } else {
            TransactionType::Bet
        };

        TransactionEvent::new(
            user_id,
            transaction_type,
            calculate_amount(x, self.amount_from, self.amount_to),
            created_at,
        )
    }
}

/// Map `x` in `[0, i64::MAX)` onto the `AMOUNT_STEP` grid between `from` and
/// `to` (major units). Works for `from > to` as well.
pub fn calculate_amount(x: i64, from: i64, to: i64) -> Money {
    let steps = (to - from) / AMOUNT_STEP;
    let index = (x as f64 / i64::MAX as f64 * steps as f64) as i64;
    Money::from_major((from + index * AMOUNT_STEP) as f64)
}
