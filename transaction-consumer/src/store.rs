use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common_types::{Money, TransactionEvent, TransactionEventFilter, TransactionType};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::error::StoreError;

/// Durable storage for batches of events. A batch is stored entirely or not
/// at all.
#[async_trait]
pub trait TransactionEventStore: Send + Sync + 'static {
    async fn batch_store(&self, events: &[TransactionEvent]) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TransactionEventReader: Send + Sync + 'static {
    /// Matching events, newest first.
    async fn search(
        &self,
        filter: &TransactionEventFilter,
    ) -> Result<Vec<TransactionEvent>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgTransactionEventStore {
    pool: PgPool,
}

impl PgTransactionEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionEventStore for PgTransactionEventStore {
    async fn batch_store(&self, events: &[TransactionEvent]) -> Result<(), StoreError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut user_ids = Vec::with_capacity(events.len());
        let mut transaction_types = Vec::with_capacity(events.len());
        let mut amounts = Vec::with_capacity(events.len());
        let mut created_ats = Vec::with_capacity(events.len());
        for event in events {
            user_ids.push(event.user_id);
            transaction_types.push(event.transaction_type.as_str());
            amounts.push(event.amount.minor_units());
            created_ats.push(event.created_at);
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO transaction_events (user_id, transaction_type, amount, created_at)
                SELECT * FROM UNNEST($1::uuid[], $2::text[], $3::bigint[], $4::timestamptz[])"#,
        )
        .bind(&user_ids)
        .bind(&transaction_types)
        .bind(&amounts)
        .bind(&created_ats)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}

#[async_trait]
impl TransactionEventReader for PgTransactionEventStore {
    async fn search(
        &self,
        filter: &TransactionEventFilter,
    ) -> Result<Vec<TransactionEvent>, StoreError> {
        let mut query = search_query(filter);
        let rows = query.build().fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> Result<TransactionEvent, StoreError> {
                let user_id: Uuid = row.try_get("user_id")?;
                let transaction_type: String = row.try_get("transaction_type")?;
                let amount: i64 = row.try_get("amount")?;
                let created_at: DateTime<Utc> = row.try_get("created_at")?;

                let transaction_type = transaction_type
                    .parse::<TransactionType>()
                    .map_err(|e| StoreError::InvalidRow(e.to_string()))?;

                Ok(TransactionEvent::new(
                    user_id,
                    transaction_type,
                    Money::from_minor(amount),
                    created_at,
                ))
            })
            .collect()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn search_query(filter: &TransactionEventFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(
        "SELECT user_id, transaction_type, amount, created_at FROM transaction_events WHERE TRUE",
    );

    if let Some(user_id) = filter.user_id {
        query.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(transaction_type) = filter.transaction_type {
        query
            .push(" AND transaction_type = ")
            .push_bind(transaction_type.as_str());
    }
    if let Some(amount_from) = filter.amount_from {
        query
            .push(" AND amount >= ")
            .push_bind(amount_from.minor_units());
    }
    if let Some(amount_to) = filter.amount_to {
        query.push(" AND amount <= ").push_bind(amount_to.minor_units());
    }
    if let Some(created_from) = filter.created_from {
        query.push(" AND created_at >= ").push_bind(created_from);
    }
    if let Some(created_to) = filter.created_to {
        query.push(" AND created_at <= ").push_bind(created_to);
    }

    query
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(filter.effective_limit());
    if let Some(offset) = filter.effective_offset() {
        query.push(" OFFSET ").push_bind(offset);
    }

    query
}
