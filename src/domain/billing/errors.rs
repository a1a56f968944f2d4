use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use super::value_objects::ValueObjectError;

/// Every fallible billing operation returns one of these kinds. Mutations
/// are atomic: any error leaves the persisted invariants intact.
#[derive(Debug, Error)]
pub enum BillingError {
  #[error("Validation error: {0}")]
  Validation(#[from] ValueObjectError),

  #[error("Shop not found: {0}")]
  ShopNotFound(Uuid),

  #[error("Customer not found: {0}")]
  CustomerNotFound(Uuid),

  #[error("Invoice not found: {0}")]
  InvoiceNotFound(Uuid),

  #[error("Quotation not found: {0}")]
  QuotationNotFound(Uuid),

  #[error("Payment not found: {0}")]
  PaymentNotFound(Uuid),

  #[error("Document number '{0}' already exists")]
  DocumentNumberAlreadyExists(String),

  #[error("No line items provided")]
  NoLineItems,

  #[error("Payment amount must be a positive amount with at most 2 decimal places")]
  InvalidPaymentAmount,

  #[error("Payment of {amount} would exceed the outstanding balance of {balance_due}")]
  Overpayment {
    amount: Decimal,
    balance_due: Decimal,
  },

  #[error("Statement period start {start} is after end {end}")]
  InvalidDateRange { start: NaiveDate, end: NaiveDate },

  #[error("Invalid status transition: {0}")]
  InvalidStatusTransition(String),

  #[error("Concurrent update detected: {0}")]
  ConcurrencyConflict(String),

  #[error("Insufficient stock for barcode {barcode}: requested {requested}, available {available}")]
  InsufficientStock {
    barcode: String,
    requested: Decimal,
    available: Decimal,
  },

  #[error("No stock record for barcode: {0}")]
  UnknownBarcode(String),

  #[error("Arithmetic invariant violated: {0}")]
  ArithmeticInvariant(String),

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),
}
