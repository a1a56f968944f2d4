use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::billing::{
  BillingError, Invoice, Payment, PaymentMethod, PaymentRepository,
};

#[derive(Debug, FromRow)]
pub(super) struct PaymentRow {
  pub id: Uuid,
  pub invoice_id: Uuid,
  pub customer_id: Uuid,
  pub amount_paid: Decimal,
  pub payment_date: NaiveDate,
  pub method: Option<String>,
  pub reference: Option<String>,
  pub created_at: DateTime<Utc>,
}

pub(super) const PAYMENT_COLUMNS: &str =
  "id, invoice_id, customer_id, amount_paid, payment_date, method, reference, created_at";

impl TryFrom<PaymentRow> for Payment {
  type Error = BillingError;

  fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
    let method = row
      .method
      .as_deref()
      .map(PaymentMethod::from_str)
      .transpose()?;

    Ok(Payment {
      id: row.id,
      invoice_id: row.invoice_id,
      customer_id: row.customer_id,
      amount_paid: row.amount_paid,
      payment_date: row.payment_date,
      method,
      reference: row.reference,
      created_at: row.created_at,
    })
  }
}

pub struct PostgresPaymentRepository {
  pool: PgPool,
}

impl PostgresPaymentRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

async fn write_invoice_accumulator(
  tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
  invoice: &Invoice,
) -> Result<(), BillingError> {
  let result = sqlx::query(
    r#"
        UPDATE invoices
        SET total_paid = $2, status = $3, updated_at = $4
        WHERE id = $1
        "#,
  )
  .bind(invoice.id)
  .bind(invoice.total_paid)
  .bind(invoice.status.as_str())
  .bind(invoice.updated_at)
  .execute(&mut **tx)
  .await?;

  if result.rows_affected() == 0 {
    return Err(BillingError::InvoiceNotFound(invoice.id));
  }
  Ok(())
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
  async fn create_with_invoice(
    &self,
    payment: Payment,
    invoice: &Invoice,
  ) -> Result<Payment, BillingError> {
    let mut tx = self.pool.begin().await?;

    sqlx::query(
      r#"
            INSERT INTO payments (
                id, invoice_id, customer_id, amount_paid, payment_date,
                method, reference, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
    )
    .bind(payment.id)
    .bind(payment.invoice_id)
    .bind(payment.customer_id)
    .bind(payment.amount_paid)
    .bind(payment.payment_date)
    .bind(payment.method.map(|m| m.as_str()))
    .bind(payment.reference.as_deref())
    .bind(payment.created_at)
    .execute(&mut *tx)
    .await?;

    write_invoice_accumulator(&mut tx, invoice).await?;
    tx.commit().await?;

    Ok(payment)
  }

  async fn delete_with_invoice(
    &self,
    payment_id: Uuid,
    invoice: &Invoice,
  ) -> Result<(), BillingError> {
    let mut tx = self.pool.begin().await?;

    let result = sqlx::query("DELETE FROM payments WHERE id = $1")
      .bind(payment_id)
      .execute(&mut *tx)
      .await?;
    if result.rows_affected() == 0 {
      return Err(BillingError::PaymentNotFound(payment_id));
    }

    write_invoice_accumulator(&mut tx, invoice).await?;
    tx.commit().await?;

    Ok(())
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, BillingError> {
    let row = sqlx::query_as::<_, PaymentRow>(&format!(
      "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;

    row.map(|r| r.try_into()).transpose()
  }
}
