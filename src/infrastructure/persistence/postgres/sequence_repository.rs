use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{BillingError, SequenceCounterRepository};

/// Serialization failures surface as ConcurrencyConflict so the allocator
/// can retry; 40001 is serialization_failure, 40P01 deadlock_detected.
fn map_increment_error(e: sqlx::Error) -> BillingError {
  if let sqlx::Error::Database(db_err) = &e {
    if matches!(db_err.code().as_deref(), Some("40001") | Some("40P01")) {
      return BillingError::ConcurrencyConflict(db_err.to_string());
    }
  }
  BillingError::Database(e)
}

/// Counter rows live in a table per document family so invoice and
/// quotation numbering advance independently for the same pair.
pub struct PostgresSequenceCounterRepository {
  pool: PgPool,
  table: &'static str,
}

impl PostgresSequenceCounterRepository {
  pub fn invoice_counters(pool: PgPool) -> Self {
    Self {
      pool,
      table: "sequence_counters",
    }
  }

  pub fn quotation_counters(pool: PgPool) -> Self {
    Self {
      pool,
      table: "quotation_sequence_counters",
    }
  }
}

#[async_trait]
impl SequenceCounterRepository for PostgresSequenceCounterRepository {
  async fn next_value(&self, shop_id: Uuid, customer_id: Uuid) -> Result<i64, BillingError> {
    // Single-statement atomic upsert-and-increment: the row lock taken by
    // ON CONFLICT DO UPDATE serializes concurrent callers on the same key,
    // so no two of them can observe the same value
    let sql = format!(
      "INSERT INTO {table} (shop_id, customer_id, last_sequence_number) \
       VALUES ($1, $2, 1) \
       ON CONFLICT (shop_id, customer_id) \
       DO UPDATE SET last_sequence_number = {table}.last_sequence_number + 1 \
       RETURNING last_sequence_number",
      table = self.table
    );

    sqlx::query_scalar::<_, i64>(&sql)
      .bind(shop_id)
      .bind(customer_id)
      .fetch_one(&self.pool)
      .await
      .map_err(map_increment_error)
  }

  async fn current_value(&self, shop_id: Uuid, customer_id: Uuid) -> Result<i64, BillingError> {
    let sql = format!(
      "SELECT last_sequence_number FROM {table} \
       WHERE shop_id = $1 AND customer_id = $2",
      table = self.table
    );

    let value: Option<i64> = sqlx::query_scalar(&sql)
      .bind(shop_id)
      .bind(customer_id)
      .fetch_optional(&self.pool)
      .await?;

    Ok(value.unwrap_or(0))
  }
}
