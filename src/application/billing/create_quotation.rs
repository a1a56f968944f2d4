use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{
  BillingError, ItemDescription, Quantity, Quotation, QuotationItem, QuotationRepository,
  SequenceAllocator, TaxDefaults, TaxRate, TaxableLine, Totals, UnitRate,
};

#[derive(Debug, Clone, Deserialize)]
pub struct QuotationItemDto {
  pub description: String,
  pub quantity: Decimal,
  pub rate_per_unit: Decimal,
  pub product_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuotationCommand {
  pub shop_id: Uuid,
  pub customer_id: Uuid,
  pub customer_name: Option<String>,
  pub customer_address: Option<String>,
  pub quotation_date: NaiveDate,
  pub valid_until: NaiveDate,
  pub apply_ppda_levy: Option<bool>,
  pub ppda_levy_percentage: Option<Decimal>,
  pub vat_percentage: Option<Decimal>,
  pub items: Vec<QuotationItemDto>,
}

#[derive(Debug, Serialize)]
pub struct CreateQuotationResponse {
  pub quotation_id: Uuid,
  pub quotation_number: String,
  pub gross_total_amount: Decimal,
  pub ppda_levy_amount: Decimal,
  pub amount_before_vat: Decimal,
  pub vat_amount: Decimal,
  pub total_net_amount: Decimal,
}

/// Quotations run through the same numbering and tax arithmetic as
/// invoices, against their own counter and the quotation prefix.
pub struct CreateQuotationUseCase {
  allocator: Arc<SequenceAllocator>,
  quotations: Arc<dyn QuotationRepository>,
  tax_defaults: TaxDefaults,
}

impl CreateQuotationUseCase {
  pub fn new(
    allocator: Arc<SequenceAllocator>,
    quotations: Arc<dyn QuotationRepository>,
    tax_defaults: TaxDefaults,
  ) -> Self {
    Self {
      allocator,
      quotations,
      tax_defaults,
    }
  }

  pub async fn execute(
    &self,
    command: CreateQuotationCommand,
  ) -> Result<CreateQuotationResponse, BillingError> {
    if command.items.is_empty() {
      return Err(BillingError::NoLineItems);
    }

    let apply_ppda = command
      .apply_ppda_levy
      .unwrap_or(self.tax_defaults.apply_ppda_levy);
    let ppda_pct = match command.ppda_levy_percentage {
      Some(value) => TaxRate::new(value)?,
      None => self.tax_defaults.ppda_levy_percentage,
    };
    let vat_pct = match command.vat_percentage {
      Some(value) => TaxRate::new(value)?,
      None => self.tax_defaults.vat_percentage,
    };

    let parsed_items: Vec<(ItemDescription, Quantity, UnitRate, Option<Uuid>)> = command
      .items
      .into_iter()
      .map(|dto| {
        let description = ItemDescription::new(dto.description)?;
        let quantity = Quantity::new(dto.quantity)?;
        let rate = UnitRate::new(dto.rate_per_unit)?;
        Ok((description, quantity, rate, dto.product_id))
      })
      .collect::<Result<Vec<_>, BillingError>>()?;

    let lines: Vec<TaxableLine> = parsed_items
      .iter()
      .map(|(_, quantity, rate, _)| TaxableLine::new(*quantity, *rate))
      .collect();
    let totals = Totals::compute(&lines, apply_ppda, ppda_pct, vat_pct);
    totals.verify()?;

    let (_, quotation_number) = self
      .allocator
      .allocate(command.shop_id, command.customer_id)
      .await?;

    let quotation = Quotation::new(
      quotation_number,
      command.shop_id,
      command.customer_id,
      command.customer_name,
      command.customer_address,
      command.quotation_date,
      command.valid_until,
      apply_ppda,
      ppda_pct,
      vat_pct,
      totals,
    );

    let items: Vec<QuotationItem> = parsed_items
      .into_iter()
      .enumerate()
      .map(|(i, (description, quantity, rate, product_id))| {
        QuotationItem::new(
          quotation.id,
          description,
          quantity,
          rate,
          product_id,
          (i + 1) as i32,
        )
      })
      .collect();

    let quotation = self.quotations.create_with_items(quotation, items).await?;

    Ok(CreateQuotationResponse {
      quotation_id: quotation.id,
      quotation_number: quotation.quotation_number.into_inner(),
      gross_total_amount: quotation.gross_total_amount,
      ppda_levy_amount: quotation.ppda_levy_amount,
      amount_before_vat: quotation.amount_before_vat,
      vat_amount: quotation.vat_amount,
      total_net_amount: quotation.total_net_amount,
    })
  }
}
