use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::domain::billing::{
  BillingError, DocumentNumber, ItemDescription, Quantity, Quotation, QuotationItem,
  QuotationRepository, TaxRate, UnitRate,
};

#[derive(Debug, FromRow)]
struct QuotationRow {
  id: Uuid,
  quotation_number: String,
  shop_id: Uuid,
  customer_id: Uuid,
  customer_name: Option<String>,
  customer_address: Option<String>,
  quotation_date: NaiveDate,
  valid_until: NaiveDate,
  apply_ppda_levy: bool,
  ppda_levy_percentage: Decimal,
  vat_percentage: Decimal,
  gross_total_amount: Decimal,
  ppda_levy_amount: Decimal,
  amount_before_vat: Decimal,
  vat_amount: Decimal,
  total_net_amount: Decimal,
  created_at: DateTime<Utc>,
}

impl TryFrom<QuotationRow> for Quotation {
  type Error = BillingError;

  fn try_from(row: QuotationRow) -> Result<Self, Self::Error> {
    Ok(Quotation {
      id: row.id,
      quotation_number: DocumentNumber::new(row.quotation_number)?,
      shop_id: row.shop_id,
      customer_id: row.customer_id,
      customer_name: row.customer_name,
      customer_address: row.customer_address,
      quotation_date: row.quotation_date,
      valid_until: row.valid_until,
      apply_ppda_levy: row.apply_ppda_levy,
      ppda_levy_percentage: TaxRate::new(row.ppda_levy_percentage)?,
      vat_percentage: TaxRate::new(row.vat_percentage)?,
      gross_total_amount: row.gross_total_amount,
      ppda_levy_amount: row.ppda_levy_amount,
      amount_before_vat: row.amount_before_vat,
      vat_amount: row.vat_amount,
      total_net_amount: row.total_net_amount,
      created_at: row.created_at,
    })
  }
}

#[derive(Debug, FromRow)]
struct QuotationItemRow {
  id: Uuid,
  quotation_id: Uuid,
  description: String,
  quantity: Decimal,
  rate_per_unit: Decimal,
  product_id: Option<Uuid>,
  line_order: i32,
}

impl TryFrom<QuotationItemRow> for QuotationItem {
  type Error = BillingError;

  fn try_from(row: QuotationItemRow) -> Result<Self, Self::Error> {
    Ok(QuotationItem {
      id: row.id,
      quotation_id: row.quotation_id,
      description: ItemDescription::new(row.description)?,
      quantity: Quantity::new(row.quantity)?,
      rate_per_unit: UnitRate::new(row.rate_per_unit)?,
      product_id: row.product_id,
      line_order: row.line_order,
    })
  }
}

pub struct PostgresQuotationRepository {
  pool: PgPool,
}

impl PostgresQuotationRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl QuotationRepository for PostgresQuotationRepository {
  async fn create_with_items(
    &self,
    quotation: Quotation,
    items: Vec<QuotationItem>,
  ) -> Result<Quotation, BillingError> {
    let quotation_number_value = quotation.quotation_number.value().to_string();
    let mut tx = self.pool.begin().await?;

    sqlx::query(
      r#"
            INSERT INTO quotations (
                id, quotation_number, shop_id, customer_id, customer_name,
                customer_address, quotation_date, valid_until, apply_ppda_levy,
                ppda_levy_percentage, vat_percentage, gross_total_amount,
                ppda_levy_amount, amount_before_vat, vat_amount,
                total_net_amount, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17)
            "#,
    )
    .bind(quotation.id)
    .bind(quotation.quotation_number.value())
    .bind(quotation.shop_id)
    .bind(quotation.customer_id)
    .bind(quotation.customer_name.as_deref())
    .bind(quotation.customer_address.as_deref())
    .bind(quotation.quotation_date)
    .bind(quotation.valid_until)
    .bind(quotation.apply_ppda_levy)
    .bind(quotation.ppda_levy_percentage.value())
    .bind(quotation.vat_percentage.value())
    .bind(quotation.gross_total_amount)
    .bind(quotation.ppda_levy_amount)
    .bind(quotation.amount_before_vat)
    .bind(quotation.vat_amount)
    .bind(quotation.total_net_amount)
    .bind(quotation.created_at)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
      if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some("23505") {
          return BillingError::DocumentNumberAlreadyExists(quotation_number_value.clone());
        }
      }
      BillingError::Database(e)
    })?;

    for item in &items {
      sqlx::query(
        r#"
            INSERT INTO quotation_items (
                id, quotation_id, description, quantity, rate_per_unit,
                product_id, line_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
      )
      .bind(item.id)
      .bind(item.quotation_id)
      .bind(item.description.value())
      .bind(item.quantity.value())
      .bind(item.rate_per_unit.value())
      .bind(item.product_id)
      .bind(item.line_order)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(quotation)
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Quotation>, BillingError> {
    let row = sqlx::query_as::<_, QuotationRow>(
      r#"
            SELECT id, quotation_number, shop_id, customer_id, customer_name,
                   customer_address, quotation_date, valid_until, apply_ppda_levy,
                   ppda_levy_percentage, vat_percentage, gross_total_amount,
                   ppda_levy_amount, amount_before_vat, vat_amount,
                   total_net_amount, created_at
            FROM quotations
            WHERE id = $1
            "#,
    )
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;

    row.map(|r| r.try_into()).transpose()
  }

  async fn items_of(&self, quotation_id: Uuid) -> Result<Vec<QuotationItem>, BillingError> {
    let rows = sqlx::query_as::<_, QuotationItemRow>(
      r#"
            SELECT id, quotation_id, description, quantity, rate_per_unit,
                   product_id, line_order
            FROM quotation_items
            WHERE quotation_id = $1
            ORDER BY line_order ASC
            "#,
    )
    .bind(quotation_id)
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
  }
}
