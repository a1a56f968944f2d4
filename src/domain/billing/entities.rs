use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::BillingError;
use super::tax::Totals;
use super::value_objects::{
  CustomerCode, DocumentNumber, InvoiceStatus, ItemDescription, PaymentMethod, Quantity, ShopCode,
  TaxRate, UnitRate, money_tolerance,
};

// Shop - supply point; its code is immutable once referenced by a sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
  pub id: Uuid,
  pub shop_code: ShopCode,
  pub name: String,
  pub created_at: DateTime<Utc>,
}

impl Shop {
  pub fn new(shop_code: ShopCode, name: String) -> Self {
    Self {
      id: Uuid::new_v4(),
      shop_code,
      name,
      created_at: Utc::now(),
    }
  }
}

// Customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
  pub id: Uuid,
  pub customer_code: CustomerCode,
  pub name: String,
  pub address: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl Customer {
  pub fn new(customer_code: CustomerCode, name: String, address: Option<String>) -> Self {
    Self {
      id: Uuid::new_v4(),
      customer_code,
      name,
      address,
      created_at: Utc::now(),
    }
  }
}

// Sequence Counter - one row per (shop, customer), created lazily
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceCounter {
  pub shop_id: Uuid,
  pub customer_id: Uuid,
  pub last_sequence_number: i64,
}

// Invoice - the central commercial document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
  pub id: Uuid,
  pub invoice_number: DocumentNumber,
  pub shop_id: Uuid,
  pub customer_id: Uuid,
  /// Snapshot overrides for ad-hoc recipients; the customer record stays
  /// authoritative when these are None.
  pub customer_name: Option<String>,
  pub customer_address: Option<String>,
  pub invoice_date: NaiveDate,
  pub due_date: NaiveDate,
  pub apply_ppda_levy: bool,
  pub ppda_levy_percentage: TaxRate,
  pub vat_percentage: TaxRate,
  pub gross_total_amount: Decimal,
  pub ppda_levy_amount: Decimal,
  pub amount_before_vat: Decimal,
  pub vat_amount: Decimal,
  pub total_net_amount: Decimal,
  pub total_paid: Decimal,
  pub status: InvoiceStatus,
  /// Set the first time stock is deducted for this invoice; guards against
  /// double deduction when a status is toggled back and forth.
  pub stock_deducted: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Invoice {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    invoice_number: DocumentNumber,
    shop_id: Uuid,
    customer_id: Uuid,
    customer_name: Option<String>,
    customer_address: Option<String>,
    invoice_date: NaiveDate,
    due_date: NaiveDate,
    apply_ppda_levy: bool,
    ppda_levy_percentage: TaxRate,
    vat_percentage: TaxRate,
    totals: Totals,
  ) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      invoice_number,
      shop_id,
      customer_id,
      customer_name,
      customer_address,
      invoice_date,
      due_date,
      apply_ppda_levy,
      ppda_levy_percentage,
      vat_percentage,
      gross_total_amount: totals.gross_total_amount,
      ppda_levy_amount: totals.ppda_levy_amount,
      amount_before_vat: totals.amount_before_vat,
      vat_amount: totals.vat_amount,
      total_net_amount: totals.total_net_amount,
      total_paid: Decimal::ZERO,
      status: InvoiceStatus::Draft,
      stock_deducted: false,
      created_at: now,
      updated_at: now,
    }
  }

  /// Always derived, never an independently settable field.
  pub fn balance_due(&self) -> Decimal {
    self.total_net_amount - self.total_paid
  }

  pub fn totals(&self) -> Totals {
    Totals {
      gross_total_amount: self.gross_total_amount,
      ppda_levy_amount: self.ppda_levy_amount,
      amount_before_vat: self.amount_before_vat,
      vat_amount: self.vat_amount,
      total_net_amount: self.total_net_amount,
    }
  }

  pub fn is_editable(&self) -> bool {
    self.status.is_editable()
  }

  pub fn is_overdue(&self, current_date: NaiveDate) -> bool {
    self.status == InvoiceStatus::Sent && self.due_date < current_date
  }

  pub fn change_status(&mut self, new_status: InvoiceStatus) -> Result<(), BillingError> {
    if !self.status.can_transition_to(new_status) {
      return Err(BillingError::InvalidStatusTransition(format!(
        "{} -> {}",
        self.status, new_status
      )));
    }
    self.status = new_status;
    self.updated_at = Utc::now();
    Ok(())
  }

  /// Accumulates a payment and recomputes the status from the paid-amount
  /// math, independent of the transition table.
  pub fn apply_payment(&mut self, amount: Decimal) {
    self.total_paid += amount;
    self.status = if self.balance_due() <= money_tolerance() {
      InvoiceStatus::Paid
    } else {
      InvoiceStatus::PartiallyPaid
    };
    self.updated_at = Utc::now();
  }

  /// Undoes a recorded payment exactly. Returns true when the status fell
  /// back to Sent because no payments remain; the true prior status is not
  /// reconstructible without a history log.
  pub fn revert_payment(&mut self, amount: Decimal) -> bool {
    self.total_paid -= amount;
    let fell_back = if self.balance_due() <= money_tolerance() {
      self.status = InvoiceStatus::Paid;
      false
    } else if self.total_paid > Decimal::ZERO {
      self.status = InvoiceStatus::PartiallyPaid;
      false
    } else {
      self.status = InvoiceStatus::Sent;
      true
    };
    self.updated_at = Utc::now();
    fell_back
  }

  /// Replaces the computed totals after a draft edit.
  pub fn apply_recomputed_totals(&mut self, totals: Totals) -> Result<(), BillingError> {
    if !self.is_editable() {
      return Err(BillingError::InvalidStatusTransition(format!(
        "invoice is {} and its items can no longer change",
        self.status
      )));
    }
    self.gross_total_amount = totals.gross_total_amount;
    self.ppda_levy_amount = totals.ppda_levy_amount;
    self.amount_before_vat = totals.amount_before_vat;
    self.vat_amount = totals.vat_amount;
    self.total_net_amount = totals.total_net_amount;
    self.updated_at = Utc::now();
    Ok(())
  }

  pub fn mark_stock_deducted(&mut self) {
    self.stock_deducted = true;
    self.updated_at = Utc::now();
  }

  pub fn clear_stock_deducted(&mut self) {
    self.stock_deducted = false;
    self.updated_at = Utc::now();
  }
}

// Invoice Line Item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
  pub id: Uuid,
  pub invoice_id: Uuid,
  pub description: ItemDescription,
  pub quantity: Quantity,
  pub rate_per_unit: UnitRate,
  pub product_id: Option<Uuid>,
  pub barcode: Option<String>,
  pub stock_tracked: bool,
  pub line_order: i32,
}

impl InvoiceItem {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    invoice_id: Uuid,
    description: ItemDescription,
    quantity: Quantity,
    rate_per_unit: UnitRate,
    product_id: Option<Uuid>,
    barcode: Option<String>,
    stock_tracked: bool,
    line_order: i32,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      invoice_id,
      description,
      quantity,
      rate_per_unit,
      product_id,
      barcode,
      stock_tracked,
      line_order,
    }
  }

  /// Unrounded; always derivable, never stored.
  pub fn line_total(&self) -> Decimal {
    self.quantity.value() * self.rate_per_unit.value()
  }

  pub fn is_stockable(&self) -> bool {
    self.stock_tracked && self.product_id.is_some()
  }
}

// Quotation - same commercial arithmetic as an invoice, no lifecycle,
// no payments, no stock effects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quotation {
  pub id: Uuid,
  pub quotation_number: DocumentNumber,
  pub shop_id: Uuid,
  pub customer_id: Uuid,
  pub customer_name: Option<String>,
  pub customer_address: Option<String>,
  pub quotation_date: NaiveDate,
  pub valid_until: NaiveDate,
  pub apply_ppda_levy: bool,
  pub ppda_levy_percentage: TaxRate,
  pub vat_percentage: TaxRate,
  pub gross_total_amount: Decimal,
  pub ppda_levy_amount: Decimal,
  pub amount_before_vat: Decimal,
  pub vat_amount: Decimal,
  pub total_net_amount: Decimal,
  pub created_at: DateTime<Utc>,
}

impl Quotation {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    quotation_number: DocumentNumber,
    shop_id: Uuid,
    customer_id: Uuid,
    customer_name: Option<String>,
    customer_address: Option<String>,
    quotation_date: NaiveDate,
    valid_until: NaiveDate,
    apply_ppda_levy: bool,
    ppda_levy_percentage: TaxRate,
    vat_percentage: TaxRate,
    totals: Totals,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      quotation_number,
      shop_id,
      customer_id,
      customer_name,
      customer_address,
      quotation_date,
      valid_until,
      apply_ppda_levy,
      ppda_levy_percentage,
      vat_percentage,
      gross_total_amount: totals.gross_total_amount,
      ppda_levy_amount: totals.ppda_levy_amount,
      amount_before_vat: totals.amount_before_vat,
      vat_amount: totals.vat_amount,
      total_net_amount: totals.total_net_amount,
      created_at: Utc::now(),
    }
  }
}

// Quotation Line Item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotationItem {
  pub id: Uuid,
  pub quotation_id: Uuid,
  pub description: ItemDescription,
  pub quantity: Quantity,
  pub rate_per_unit: UnitRate,
  pub product_id: Option<Uuid>,
  pub line_order: i32,
}

impl QuotationItem {
  pub fn new(
    quotation_id: Uuid,
    description: ItemDescription,
    quantity: Quantity,
    rate_per_unit: UnitRate,
    product_id: Option<Uuid>,
    line_order: i32,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      quotation_id,
      description,
      quantity,
      rate_per_unit,
      product_id,
      line_order,
    }
  }

  pub fn line_total(&self) -> Decimal {
    self.quantity.value() * self.rate_per_unit.value()
  }
}

// Payment - created only through the ledger, removed only through reversal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
  pub id: Uuid,
  pub invoice_id: Uuid,
  pub customer_id: Uuid,
  pub amount_paid: Decimal,
  pub payment_date: NaiveDate,
  pub method: Option<PaymentMethod>,
  pub reference: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl Payment {
  pub fn new(
    invoice_id: Uuid,
    customer_id: Uuid,
    amount_paid: Decimal,
    payment_date: NaiveDate,
    method: Option<PaymentMethod>,
    reference: Option<String>,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      invoice_id,
      customer_id,
      amount_paid,
      payment_date,
      method,
      reference,
      created_at: Utc::now(),
    }
  }
}
