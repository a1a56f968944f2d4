use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::invoice_repository::{INVOICE_COLUMNS, InvoiceRow};
use super::payment_repository::{PAYMENT_COLUMNS, PaymentRow};
use crate::domain::billing::{BillingError, StatementSnapshot, StatementSourceRepository};

pub struct PostgresStatementSourceRepository {
  pool: PgPool,
}

impl PostgresStatementSourceRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl StatementSourceRepository for PostgresStatementSourceRepository {
  async fn snapshot(&self, customer_id: Uuid) -> Result<StatementSnapshot, BillingError> {
    // Both reads run inside one repeatable-read transaction so the
    // debit/credit merge cannot be torn by a concurrent write
    let mut tx = self.pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
      .execute(&mut *tx)
      .await?;

    let invoice_rows = sqlx::query_as::<_, InvoiceRow>(&format!(
      "SELECT {INVOICE_COLUMNS} FROM invoices \
       WHERE customer_id = $1 \
       ORDER BY invoice_date ASC"
    ))
    .bind(customer_id)
    .fetch_all(&mut *tx)
    .await?;

    let payment_rows = sqlx::query_as::<_, PaymentRow>(&format!(
      "SELECT {PAYMENT_COLUMNS} FROM payments \
       WHERE customer_id = $1 \
       ORDER BY payment_date ASC"
    ))
    .bind(customer_id)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(StatementSnapshot {
      invoices: invoice_rows
        .into_iter()
        .map(|r| r.try_into())
        .collect::<Result<_, _>>()?,
      payments: payment_rows
        .into_iter()
        .map(|r| r.try_into())
        .collect::<Result<_, _>>()?,
    })
  }
}
