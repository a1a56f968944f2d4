use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{BillingError, InventoryPort, StockMovement};

/// Stock levels plus a movement ledger. The ledger carries a uniqueness
/// key on (reference_type, reference_id, barcode), so even a caller that
/// lost its idempotency flag cannot deduct twice for the same document.
pub struct PostgresInventoryAdapter {
  pool: PgPool,
}

impl PostgresInventoryAdapter {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl InventoryPort for PostgresInventoryAdapter {
  async fn remove_stock(&self, movement: StockMovement) -> Result<Decimal, BillingError> {
    let mut tx = self.pool.begin().await?;

    // Guarded decrement: the quantity predicate keeps the level from ever
    // going negative under concurrency
    let new_level: Option<Decimal> = sqlx::query_scalar(
      r#"
            UPDATE stock_levels
            SET quantity = quantity - $3, updated_at = now()
            WHERE shop_id = $1 AND barcode = $2 AND quantity >= $3
            RETURNING quantity
            "#,
    )
    .bind(movement.shop_id)
    .bind(&movement.barcode)
    .bind(movement.quantity)
    .fetch_optional(&mut *tx)
    .await?;

    let new_level = match new_level {
      Some(level) => level,
      None => {
        let available: Option<Decimal> = sqlx::query_scalar(
          "SELECT quantity FROM stock_levels WHERE shop_id = $1 AND barcode = $2",
        )
        .bind(movement.shop_id)
        .bind(&movement.barcode)
        .fetch_optional(&mut *tx)
        .await?;

        return Err(match available {
          Some(available) => BillingError::InsufficientStock {
            barcode: movement.barcode,
            requested: movement.quantity,
            available,
          },
          None => BillingError::UnknownBarcode(movement.barcode),
        });
      }
    };

    sqlx::query(
      r#"
            INSERT INTO stock_movements (
                id, shop_id, barcode, quantity, direction, actor,
                reference_type, reference_id, reference_number, notes, created_at
            )
            VALUES ($1, $2, $3, $4, 'out', $5, $6, $7, $8, $9, now())
            "#,
    )
    .bind(Uuid::new_v4())
    .bind(movement.shop_id)
    .bind(&movement.barcode)
    .bind(movement.quantity)
    .bind(&movement.actor)
    .bind(&movement.reference_type)
    .bind(movement.reference_id)
    .bind(&movement.reference_number)
    .bind(movement.notes.as_deref())
    .execute(&mut *tx)
    .await
    .map_err(|e| {
      if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some("23505") {
          return BillingError::ConcurrencyConflict(format!(
            "stock already withdrawn for {} {}",
            movement.reference_type, movement.reference_number
          ));
        }
      }
      BillingError::Database(e)
    })?;

    tx.commit().await?;
    Ok(new_level)
  }

  async fn restore_stock(&self, movement: StockMovement) -> Result<Decimal, BillingError> {
    let mut tx = self.pool.begin().await?;

    let new_level: Option<Decimal> = sqlx::query_scalar(
      r#"
            UPDATE stock_levels
            SET quantity = quantity + $3, updated_at = now()
            WHERE shop_id = $1 AND barcode = $2
            RETURNING quantity
            "#,
    )
    .bind(movement.shop_id)
    .bind(&movement.barcode)
    .bind(movement.quantity)
    .fetch_optional(&mut *tx)
    .await?;

    let new_level = new_level.ok_or_else(|| BillingError::UnknownBarcode(movement.barcode.clone()))?;

    // Dropping the withdrawal entry lets a later retry re-withdraw under
    // the same reference without tripping the uniqueness key
    sqlx::query(
      r#"
            DELETE FROM stock_movements
            WHERE reference_type = $1 AND reference_id = $2
              AND barcode = $3 AND direction = 'out'
            "#,
    )
    .bind(&movement.reference_type)
    .bind(movement.reference_id)
    .bind(&movement.barcode)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(new_level)
  }
}
