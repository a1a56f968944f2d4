use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{
  BillingError, Invoice, InvoiceItem, InvoiceRepository, ItemDescription, Quantity,
  SequenceAllocator, TaxDefaults, TaxRate, TaxableLine, Totals, UnitRate,
};

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceItemDto {
  pub description: String,
  pub quantity: Decimal,
  pub rate_per_unit: Decimal,
  pub product_id: Option<Uuid>,
  pub barcode: Option<String>,
  #[serde(default)]
  pub stock_tracked: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceCommand {
  pub shop_id: Uuid,
  pub customer_id: Uuid,
  pub customer_name: Option<String>,
  pub customer_address: Option<String>,
  pub invoice_date: NaiveDate,
  pub due_date: NaiveDate,
  /// Levy/VAT overrides; configured defaults apply when absent.
  pub apply_ppda_levy: Option<bool>,
  pub ppda_levy_percentage: Option<Decimal>,
  pub vat_percentage: Option<Decimal>,
  pub items: Vec<InvoiceItemDto>,
}

#[derive(Debug, Serialize)]
pub struct CreateInvoiceResponse {
  pub invoice_id: Uuid,
  pub invoice_number: String,
  pub status: String,
  pub gross_total_amount: Decimal,
  pub ppda_levy_amount: Decimal,
  pub amount_before_vat: Decimal,
  pub vat_amount: Decimal,
  pub total_net_amount: Decimal,
}

pub struct CreateInvoiceUseCase {
  allocator: Arc<SequenceAllocator>,
  invoices: Arc<dyn InvoiceRepository>,
  tax_defaults: TaxDefaults,
}

impl CreateInvoiceUseCase {
  pub fn new(
    allocator: Arc<SequenceAllocator>,
    invoices: Arc<dyn InvoiceRepository>,
    tax_defaults: TaxDefaults,
  ) -> Self {
    Self {
      allocator,
      invoices,
      tax_defaults,
    }
  }

  pub async fn execute(
    &self,
    command: CreateInvoiceCommand,
  ) -> Result<CreateInvoiceResponse, BillingError> {
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

    let parsed_items: Vec<(ItemDescription, Quantity, UnitRate, InvoiceItemDto)> = command
      .items
      .into_iter()
      .map(|dto| {
        let description = ItemDescription::new(dto.description.clone())?;
        let quantity = Quantity::new(dto.quantity)?;
        let rate = UnitRate::new(dto.rate_per_unit)?;
        Ok((description, quantity, rate, dto))
      })
      .collect::<Result<Vec<_>, BillingError>>()?;

    let lines: Vec<TaxableLine> = parsed_items
      .iter()
      .map(|(_, quantity, rate, _)| TaxableLine::new(*quantity, *rate))
      .collect();
    let totals = Totals::compute(&lines, apply_ppda, ppda_pct, vat_pct);
    totals.verify()?;

    let (_, invoice_number) = self
      .allocator
      .allocate(command.shop_id, command.customer_id)
      .await?;

    let invoice = Invoice::new(
      invoice_number,
      command.shop_id,
      command.customer_id,
      command.customer_name,
      command.customer_address,
      command.invoice_date,
      command.due_date,
      apply_ppda,
      ppda_pct,
      vat_pct,
      totals,
    );

    let items: Vec<InvoiceItem> = parsed_items
      .into_iter()
      .enumerate()
      .map(|(i, (description, quantity, rate, dto))| {
        InvoiceItem::new(
          invoice.id,
          description,
          quantity,
          rate,
          dto.product_id,
          dto.barcode,
          dto.stock_tracked,
          (i + 1) as i32,
        )
      })
      .collect();

    let invoice = self.invoices.create_with_items(invoice, items).await?;

    Ok(CreateInvoiceResponse {
      invoice_id: invoice.id,
      invoice_number: invoice.invoice_number.into_inner(),
      status: invoice.status.as_str().to_string(),
      gross_total_amount: invoice.gross_total_amount,
      ppda_levy_amount: invoice.ppda_levy_amount,
      amount_before_vat: invoice.amount_before_vat,
      vat_amount: invoice.vat_amount,
      total_net_amount: invoice.total_net_amount,
    })
  }
}
