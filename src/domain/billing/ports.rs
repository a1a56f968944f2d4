use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::entities::{Invoice, InvoiceItem, Payment, Quotation, QuotationItem};
use super::errors::BillingError;
use super::value_objects::{CustomerCode, InvoiceStatus, ShopCode};

#[async_trait]
pub trait ShopDirectory: Send + Sync {
  /// Fails with ShopNotFound when the shop is missing or its code is blank.
  async fn code_of(&self, shop_id: Uuid) -> Result<ShopCode, BillingError>;
}

#[async_trait]
pub trait CustomerDirectory: Send + Sync {
  /// Fails with CustomerNotFound when the customer is missing or its code
  /// is blank.
  async fn code_of(&self, customer_id: Uuid) -> Result<CustomerCode, BillingError>;
  async fn exists(&self, customer_id: Uuid) -> Result<bool, BillingError>;
}

#[async_trait]
pub trait SequenceCounterRepository: Send + Sync {
  /// Atomically increments and returns the counter for (shop, customer),
  /// creating it at 1 on first use. Two concurrent callers for the same
  /// key must never receive the same value; a serialization failure is
  /// surfaced as ConcurrencyConflict and is safe to retry.
  async fn next_value(&self, shop_id: Uuid, customer_id: Uuid) -> Result<i64, BillingError>;

  /// Non-mutating read of the current counter value; 0 when no counter
  /// exists yet.
  async fn current_value(&self, shop_id: Uuid, customer_id: Uuid) -> Result<i64, BillingError>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
  /// Persists the invoice and its items in one atomic unit.
  async fn create_with_items(
    &self,
    invoice: Invoice,
    items: Vec<InvoiceItem>,
  ) -> Result<Invoice, BillingError>;

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, BillingError>;

  async fn items_of(&self, invoice_id: Uuid) -> Result<Vec<InvoiceItem>, BillingError>;

  /// Compare-and-swap write: persists `invoice` only while the stored row
  /// still carries `expected_status`. Zero rows matched means a concurrent
  /// writer got there first and is reported as ConcurrencyConflict.
  async fn update_guarded(
    &self,
    invoice: &Invoice,
    expected_status: InvoiceStatus,
  ) -> Result<(), BillingError>;

  /// Replaces the item list and the stored totals in one atomic unit.
  async fn replace_items(
    &self,
    invoice: &Invoice,
    items: Vec<InvoiceItem>,
  ) -> Result<Vec<InvoiceItem>, BillingError>;

  /// Sent invoices whose due date has passed, for the overdue sweep.
  async fn find_due_for_overdue(
    &self,
    current_date: NaiveDate,
  ) -> Result<Vec<Invoice>, BillingError>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
  /// Inserts the payment and writes the invoice's accumulator/status in
  /// one atomic unit; a crash between them must leave neither visible.
  async fn create_with_invoice(
    &self,
    payment: Payment,
    invoice: &Invoice,
  ) -> Result<Payment, BillingError>;

  /// Deletes the payment and writes the reverted invoice in the same
  /// all-or-nothing unit as create_with_invoice.
  async fn delete_with_invoice(
    &self,
    payment_id: Uuid,
    invoice: &Invoice,
  ) -> Result<(), BillingError>;

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, BillingError>;
}

#[async_trait]
pub trait QuotationRepository: Send + Sync {
  async fn create_with_items(
    &self,
    quotation: Quotation,
    items: Vec<QuotationItem>,
  ) -> Result<Quotation, BillingError>;

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Quotation>, BillingError>;

  async fn items_of(&self, quotation_id: Uuid) -> Result<Vec<QuotationItem>, BillingError>;
}

/// Everything the statement builder reads, taken in one consistent
/// snapshot so the debit/credit merge is not torn by a concurrent write.
#[derive(Debug, Clone)]
pub struct StatementSnapshot {
  pub invoices: Vec<Invoice>,
  pub payments: Vec<Payment>,
}

#[async_trait]
pub trait StatementSourceRepository: Send + Sync {
  async fn snapshot(&self, customer_id: Uuid) -> Result<StatementSnapshot, BillingError>;
}

/// One stock movement against the inventory ledger, keyed by the document
/// that caused it.
#[derive(Debug, Clone)]
pub struct StockMovement {
  pub barcode: String,
  pub quantity: Decimal,
  pub shop_id: Uuid,
  pub actor: String,
  pub reference_type: String,
  pub reference_id: Uuid,
  pub reference_number: String,
  pub notes: Option<String>,
}

#[async_trait]
pub trait InventoryPort: Send + Sync {
  /// Withdraws stock; returns the new stock level. Refusals surface as
  /// InsufficientStock or UnknownBarcode.
  async fn remove_stock(&self, movement: StockMovement) -> Result<Decimal, BillingError>;

  /// Puts a prior withdrawal back; returns the new stock level.
  async fn restore_stock(&self, movement: StockMovement) -> Result<Decimal, BillingError>;
}
