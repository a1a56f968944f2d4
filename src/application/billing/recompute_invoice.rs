use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::create_invoice::InvoiceItemDto;
use crate::domain::billing::{
  BillingError, InvoiceItem, InvoiceRepository, ItemDescription, Quantity, TaxableLine, Totals,
  UnitRate,
};

#[derive(Debug, Deserialize)]
pub struct RecomputeInvoiceCommand {
  pub invoice_id: Uuid,
  pub items: Vec<InvoiceItemDto>,
}

#[derive(Debug, Serialize)]
pub struct RecomputeInvoiceResponse {
  pub invoice_id: Uuid,
  pub gross_total_amount: Decimal,
  pub ppda_levy_amount: Decimal,
  pub amount_before_vat: Decimal,
  pub vat_amount: Decimal,
  pub total_net_amount: Decimal,
}

/// Replaces a draft invoice's items and recomputes the five totals through
/// the same arithmetic as creation, against the invoice's levy/VAT
/// snapshot.
pub struct RecomputeInvoiceUseCase {
  invoices: Arc<dyn InvoiceRepository>,
}

impl RecomputeInvoiceUseCase {
  pub fn new(invoices: Arc<dyn InvoiceRepository>) -> Self {
    Self { invoices }
  }

  pub async fn execute(
    &self,
    command: RecomputeInvoiceCommand,
  ) -> Result<RecomputeInvoiceResponse, BillingError> {
    if command.items.is_empty() {
      return Err(BillingError::NoLineItems);
    }

    let mut invoice = self
      .invoices
      .find_by_id(command.invoice_id)
      .await?
      .ok_or(BillingError::InvoiceNotFound(command.invoice_id))?;

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
    let totals = Totals::compute(
      &lines,
      invoice.apply_ppda_levy,
      invoice.ppda_levy_percentage,
      invoice.vat_percentage,
    );
    totals.verify()?;

    invoice.apply_recomputed_totals(totals)?;

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

    self.invoices.replace_items(&invoice, items).await?;

    Ok(RecomputeInvoiceResponse {
      invoice_id: invoice.id,
      gross_total_amount: invoice.gross_total_amount,
      ppda_levy_amount: invoice.ppda_levy_amount,
      amount_before_vat: invoice.amount_before_vat,
      vat_amount: invoice.vat_amount,
      total_net_amount: invoice.total_net_amount,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::billing::testing::InMemoryBillingStore;
  use crate::domain::billing::{DocumentNumber, Invoice, InvoiceStatus, TaxRate};
  use chrono::NaiveDate;
  use rust_decimal_macros::dec;

  fn draft_invoice() -> Invoice {
    let totals = Totals::compute(
      &[TaxableLine {
        quantity: dec!(2),
        rate_per_unit: dec!(100),
      }],
      true,
      TaxRate::new(dec!(1.0)).unwrap(),
      TaxRate::new(dec!(16.5)).unwrap(),
    );
    Invoice::new(
      DocumentNumber::new("I-MAIN/CUST001-001".to_string()).unwrap(),
      Uuid::new_v4(),
      Uuid::new_v4(),
      None,
      None,
      NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
      NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
      true,
      TaxRate::new(dec!(1.0)).unwrap(),
      TaxRate::new(dec!(16.5)).unwrap(),
      totals,
    )
  }

  fn item(quantity: Decimal, rate: Decimal) -> InvoiceItemDto {
    InvoiceItemDto {
      description: "Cement 50kg".to_string(),
      quantity,
      rate_per_unit: rate,
      product_id: None,
      barcode: None,
      stock_tracked: false,
    }
  }

  #[tokio::test]
  async fn test_recompute_reuses_the_snapshot_rates() {
    let store = Arc::new(InMemoryBillingStore::default());
    let invoice = draft_invoice();
    let invoice_id = invoice.id;
    store.create_with_items(invoice, Vec::new()).await.unwrap();

    let use_case = RecomputeInvoiceUseCase::new(store.clone());
    let response = use_case
      .execute(RecomputeInvoiceCommand {
        invoice_id,
        items: vec![item(dec!(4), dec!(100))],
      })
      .await
      .unwrap();

    // Same derivation chain at double the gross
    assert_eq!(response.gross_total_amount, dec!(400.00));
    assert_eq!(response.ppda_levy_amount, dec!(4.00));
    assert_eq!(response.vat_amount, dec!(66.66));
    assert_eq!(response.total_net_amount, dec!(470.66));

    let stored = store.invoice(invoice_id).await.unwrap();
    assert_eq!(stored.total_net_amount, dec!(470.66));
  }

  #[tokio::test]
  async fn test_recompute_rejected_for_sent_invoice() {
    let store = Arc::new(InMemoryBillingStore::default());
    let mut invoice = draft_invoice();
    invoice.change_status(InvoiceStatus::Sent).unwrap();
    let invoice_id = invoice.id;
    store.create_with_items(invoice, Vec::new()).await.unwrap();

    let use_case = RecomputeInvoiceUseCase::new(store);
    assert!(matches!(
      use_case
        .execute(RecomputeInvoiceCommand {
          invoice_id,
          items: vec![item(dec!(1), dec!(10))],
        })
        .await,
      Err(BillingError::InvalidStatusTransition(_))
    ));
  }
}
