use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::billing::{
  BillingError, DocumentNumber, Invoice, InvoiceItem, InvoiceRepository, InvoiceStatus,
  ItemDescription, Quantity, TaxRate, UnitRate,
};

#[derive(Debug, FromRow)]
pub(super) struct InvoiceRow {
  pub id: Uuid,
  pub invoice_number: String,
  pub shop_id: Uuid,
  pub customer_id: Uuid,
  pub customer_name: Option<String>,
  pub customer_address: Option<String>,
  pub invoice_date: NaiveDate,
  pub due_date: NaiveDate,
  pub apply_ppda_levy: bool,
  pub ppda_levy_percentage: Decimal,
  pub vat_percentage: Decimal,
  pub gross_total_amount: Decimal,
  pub ppda_levy_amount: Decimal,
  pub amount_before_vat: Decimal,
  pub vat_amount: Decimal,
  pub total_net_amount: Decimal,
  pub total_paid: Decimal,
  pub status: String,
  pub stock_deducted: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

pub(super) const INVOICE_COLUMNS: &str = "id, invoice_number, shop_id, customer_id, \
   customer_name, customer_address, invoice_date, due_date, apply_ppda_levy, \
   ppda_levy_percentage, vat_percentage, gross_total_amount, ppda_levy_amount, \
   amount_before_vat, vat_amount, total_net_amount, total_paid, status, \
   stock_deducted, created_at, updated_at";

impl TryFrom<InvoiceRow> for Invoice {
  type Error = BillingError;

  fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
    let invoice_number = DocumentNumber::new(row.invoice_number)?;
    let ppda_levy_percentage = TaxRate::new(row.ppda_levy_percentage)?;
    let vat_percentage = TaxRate::new(row.vat_percentage)?;
    let status = InvoiceStatus::from_str(&row.status)?;

    Ok(Invoice {
      id: row.id,
      invoice_number,
      shop_id: row.shop_id,
      customer_id: row.customer_id,
      customer_name: row.customer_name,
      customer_address: row.customer_address,
      invoice_date: row.invoice_date,
      due_date: row.due_date,
      apply_ppda_levy: row.apply_ppda_levy,
      ppda_levy_percentage,
      vat_percentage,
      gross_total_amount: row.gross_total_amount,
      ppda_levy_amount: row.ppda_levy_amount,
      amount_before_vat: row.amount_before_vat,
      vat_amount: row.vat_amount,
      total_net_amount: row.total_net_amount,
      total_paid: row.total_paid,
      status,
      stock_deducted: row.stock_deducted,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

#[derive(Debug, FromRow)]
struct InvoiceItemRow {
  id: Uuid,
  invoice_id: Uuid,
  description: String,
  quantity: Decimal,
  rate_per_unit: Decimal,
  product_id: Option<Uuid>,
  barcode: Option<String>,
  stock_tracked: bool,
  line_order: i32,
}

impl TryFrom<InvoiceItemRow> for InvoiceItem {
  type Error = BillingError;

  fn try_from(row: InvoiceItemRow) -> Result<Self, Self::Error> {
    Ok(InvoiceItem {
      id: row.id,
      invoice_id: row.invoice_id,
      description: ItemDescription::new(row.description)?,
      quantity: Quantity::new(row.quantity)?,
      rate_per_unit: UnitRate::new(row.rate_per_unit)?,
      product_id: row.product_id,
      barcode: row.barcode,
      stock_tracked: row.stock_tracked,
      line_order: row.line_order,
    })
  }
}

pub struct PostgresInvoiceRepository {
  pool: PgPool,
}

impl PostgresInvoiceRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

async fn insert_items(
  tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
  items: &[InvoiceItem],
) -> Result<(), BillingError> {
  for item in items {
    sqlx::query(
      r#"
            INSERT INTO invoice_items (
                id, invoice_id, description, quantity, rate_per_unit,
                product_id, barcode, stock_tracked, line_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
    )
    .bind(item.id)
    .bind(item.invoice_id)
    .bind(item.description.value())
    .bind(item.quantity.value())
    .bind(item.rate_per_unit.value())
    .bind(item.product_id)
    .bind(item.barcode.as_deref())
    .bind(item.stock_tracked)
    .bind(item.line_order)
    .execute(&mut **tx)
    .await?;
  }
  Ok(())
}

#[async_trait]
impl InvoiceRepository for PostgresInvoiceRepository {
  async fn create_with_items(
    &self,
    invoice: Invoice,
    items: Vec<InvoiceItem>,
  ) -> Result<Invoice, BillingError> {
    let invoice_number_value = invoice.invoice_number.value().to_string();
    let mut tx = self.pool.begin().await?;

    sqlx::query(
      r#"
            INSERT INTO invoices (
                id, invoice_number, shop_id, customer_id, customer_name,
                customer_address, invoice_date, due_date, apply_ppda_levy,
                ppda_levy_percentage, vat_percentage, gross_total_amount,
                ppda_levy_amount, amount_before_vat, vat_amount,
                total_net_amount, total_paid, status, stock_deducted,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21)
            "#,
    )
    .bind(invoice.id)
    .bind(invoice.invoice_number.value())
    .bind(invoice.shop_id)
    .bind(invoice.customer_id)
    .bind(invoice.customer_name.as_deref())
    .bind(invoice.customer_address.as_deref())
    .bind(invoice.invoice_date)
    .bind(invoice.due_date)
    .bind(invoice.apply_ppda_levy)
    .bind(invoice.ppda_levy_percentage.value())
    .bind(invoice.vat_percentage.value())
    .bind(invoice.gross_total_amount)
    .bind(invoice.ppda_levy_amount)
    .bind(invoice.amount_before_vat)
    .bind(invoice.vat_amount)
    .bind(invoice.total_net_amount)
    .bind(invoice.total_paid)
    .bind(invoice.status.as_str())
    .bind(invoice.stock_deducted)
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
      if let sqlx::Error::Database(db_err) = &e {
        // PostgreSQL unique violation code
        if db_err.code().as_deref() == Some("23505") {
          return BillingError::DocumentNumberAlreadyExists(invoice_number_value.clone());
        }
      }
      BillingError::Database(e)
    })?;

    insert_items(&mut tx, &items).await?;
    tx.commit().await?;

    Ok(invoice)
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, BillingError> {
    let row = sqlx::query_as::<_, InvoiceRow>(&format!(
      "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;

    row.map(|r| r.try_into()).transpose()
  }

  async fn items_of(&self, invoice_id: Uuid) -> Result<Vec<InvoiceItem>, BillingError> {
    let rows = sqlx::query_as::<_, InvoiceItemRow>(
      r#"
            SELECT id, invoice_id, description, quantity, rate_per_unit,
                   product_id, barcode, stock_tracked, line_order
            FROM invoice_items
            WHERE invoice_id = $1
            ORDER BY line_order ASC
            "#,
    )
    .bind(invoice_id)
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
  }

  async fn update_guarded(
    &self,
    invoice: &Invoice,
    expected_status: InvoiceStatus,
  ) -> Result<(), BillingError> {
    let result = sqlx::query(
      r#"
            UPDATE invoices
            SET status = $3, stock_deducted = $4, total_paid = $5,
                gross_total_amount = $6, ppda_levy_amount = $7,
                amount_before_vat = $8, vat_amount = $9,
                total_net_amount = $10, updated_at = $11
            WHERE id = $1 AND status = $2
            "#,
    )
    .bind(invoice.id)
    .bind(expected_status.as_str())
    .bind(invoice.status.as_str())
    .bind(invoice.stock_deducted)
    .bind(invoice.total_paid)
    .bind(invoice.gross_total_amount)
    .bind(invoice.ppda_levy_amount)
    .bind(invoice.amount_before_vat)
    .bind(invoice.vat_amount)
    .bind(invoice.total_net_amount)
    .bind(invoice.updated_at)
    .execute(&self.pool)
    .await?;

    // Zero rows means the invoice vanished or a concurrent writer already
    // moved it out of the expected status; either way the caller lost
    if result.rows_affected() == 0 {
      return Err(BillingError::ConcurrencyConflict(format!(
        "invoice {} missing or no longer {}",
        invoice.id, expected_status
      )));
    }
    Ok(())
  }

  async fn replace_items(
    &self,
    invoice: &Invoice,
    items: Vec<InvoiceItem>,
  ) -> Result<Vec<InvoiceItem>, BillingError> {
    let mut tx = self.pool.begin().await?;

    let result = sqlx::query(
      r#"
            UPDATE invoices
            SET gross_total_amount = $2, ppda_levy_amount = $3,
                amount_before_vat = $4, vat_amount = $5,
                total_net_amount = $6, updated_at = $7
            WHERE id = $1
            "#,
    )
    .bind(invoice.id)
    .bind(invoice.gross_total_amount)
    .bind(invoice.ppda_levy_amount)
    .bind(invoice.amount_before_vat)
    .bind(invoice.vat_amount)
    .bind(invoice.total_net_amount)
    .bind(invoice.updated_at)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
      return Err(BillingError::InvoiceNotFound(invoice.id));
    }

    sqlx::query("DELETE FROM invoice_items WHERE invoice_id = $1")
      .bind(invoice.id)
      .execute(&mut *tx)
      .await?;

    insert_items(&mut tx, &items).await?;
    tx.commit().await?;

    Ok(items)
  }

  async fn find_due_for_overdue(
    &self,
    current_date: NaiveDate,
  ) -> Result<Vec<Invoice>, BillingError> {
    let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
      "SELECT {INVOICE_COLUMNS} FROM invoices \
       WHERE status = 'sent' AND due_date < $1 \
       ORDER BY due_date ASC"
    ))
    .bind(current_date)
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
  }
}
