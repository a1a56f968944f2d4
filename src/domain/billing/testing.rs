//! In-memory port implementations backing the service tests. A single
//! mutex around each store stands in for the database's transaction scope,
//! which keeps the multi-entity operations atomic the same way the
//! Postgres implementations do.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::entities::{Invoice, InvoiceItem, Payment, Quotation, QuotationItem};
use super::errors::BillingError;
use super::ports::{
  CustomerDirectory, InventoryPort, InvoiceRepository, PaymentRepository, QuotationRepository,
  SequenceCounterRepository, ShopDirectory, StatementSnapshot, StatementSourceRepository,
  StockMovement,
};
use super::value_objects::{CustomerCode, InvoiceStatus, ShopCode};

#[derive(Default)]
pub struct InMemoryShopDirectory {
  codes: Mutex<HashMap<Uuid, ShopCode>>,
}

impl InMemoryShopDirectory {
  pub fn insert(&self, code: &str) -> Uuid {
    let id = Uuid::new_v4();
    self
      .codes
      .lock()
      .unwrap()
      .insert(id, ShopCode::new(code.to_string()).unwrap());
    id
  }
}

#[async_trait]
impl ShopDirectory for InMemoryShopDirectory {
  async fn code_of(&self, shop_id: Uuid) -> Result<ShopCode, BillingError> {
    self
      .codes
      .lock()
      .unwrap()
      .get(&shop_id)
      .cloned()
      .ok_or(BillingError::ShopNotFound(shop_id))
  }
}

#[derive(Default)]
pub struct InMemoryCustomerDirectory {
  codes: Mutex<HashMap<Uuid, CustomerCode>>,
}

impl InMemoryCustomerDirectory {
  pub fn insert(&self, code: &str) -> Uuid {
    let id = Uuid::new_v4();
    self
      .codes
      .lock()
      .unwrap()
      .insert(id, CustomerCode::new(code.to_string()).unwrap());
    id
  }
}

#[async_trait]
impl CustomerDirectory for InMemoryCustomerDirectory {
  async fn code_of(&self, customer_id: Uuid) -> Result<CustomerCode, BillingError> {
    self
      .codes
      .lock()
      .unwrap()
      .get(&customer_id)
      .cloned()
      .ok_or(BillingError::CustomerNotFound(customer_id))
  }

  async fn exists(&self, customer_id: Uuid) -> Result<bool, BillingError> {
    Ok(self.codes.lock().unwrap().contains_key(&customer_id))
  }
}

#[derive(Default)]
pub struct InMemorySequenceCounters {
  counters: Mutex<HashMap<(Uuid, Uuid), i64>>,
}

#[async_trait]
impl SequenceCounterRepository for InMemorySequenceCounters {
  async fn next_value(&self, shop_id: Uuid, customer_id: Uuid) -> Result<i64, BillingError> {
    let mut counters = self.counters.lock().unwrap();
    let value = counters.entry((shop_id, customer_id)).or_insert(0);
    *value += 1;
    Ok(*value)
  }

  async fn current_value(&self, shop_id: Uuid, customer_id: Uuid) -> Result<i64, BillingError> {
    Ok(
      self
        .counters
        .lock()
        .unwrap()
        .get(&(shop_id, customer_id))
        .copied()
        .unwrap_or(0),
    )
  }
}

/// Reports a serialization conflict for the first `failures` increments,
/// then behaves normally; exercises the allocator's bounded retry.
pub struct FlakyCounters {
  inner: InMemorySequenceCounters,
  failures_remaining: Mutex<u32>,
}

impl FlakyCounters {
  pub fn new(failures: u32) -> Self {
    Self {
      inner: InMemorySequenceCounters::default(),
      failures_remaining: Mutex::new(failures),
    }
  }
}

#[async_trait]
impl SequenceCounterRepository for FlakyCounters {
  async fn next_value(&self, shop_id: Uuid, customer_id: Uuid) -> Result<i64, BillingError> {
    {
      let mut remaining = self.failures_remaining.lock().unwrap();
      if *remaining > 0 {
        *remaining -= 1;
        return Err(BillingError::ConcurrencyConflict(
          "could not serialize access to counter".to_string(),
        ));
      }
    }
    self.inner.next_value(shop_id, customer_id).await
  }

  async fn current_value(&self, shop_id: Uuid, customer_id: Uuid) -> Result<i64, BillingError> {
    self.inner.current_value(shop_id, customer_id).await
  }
}

#[derive(Default)]
struct BillingState {
  invoices: HashMap<Uuid, Invoice>,
  items: HashMap<Uuid, Vec<InvoiceItem>>,
  payments: HashMap<Uuid, Payment>,
}

/// Invoice, payment and statement storage behind one mutex.
#[derive(Default)]
pub struct InMemoryBillingStore {
  state: Mutex<BillingState>,
}

impl InMemoryBillingStore {
  pub async fn invoice(&self, id: Uuid) -> Option<Invoice> {
    self.state.lock().unwrap().invoices.get(&id).cloned()
  }

  pub async fn payment(&self, id: Uuid) -> Option<Payment> {
    self.state.lock().unwrap().payments.get(&id).cloned()
  }

  pub fn insert_invoice(&self, invoice: Invoice) {
    self
      .state
      .lock()
      .unwrap()
      .invoices
      .insert(invoice.id, invoice);
  }

  pub fn insert_payment(&self, payment: Payment) {
    self
      .state
      .lock()
      .unwrap()
      .payments
      .insert(payment.id, payment);
  }
}

#[async_trait]
impl InvoiceRepository for InMemoryBillingStore {
  async fn create_with_items(
    &self,
    invoice: Invoice,
    items: Vec<InvoiceItem>,
  ) -> Result<Invoice, BillingError> {
    let mut state = self.state.lock().unwrap();
    if state
      .invoices
      .values()
      .any(|existing| existing.invoice_number == invoice.invoice_number)
    {
      return Err(BillingError::DocumentNumberAlreadyExists(
        invoice.invoice_number.value().to_string(),
      ));
    }
    state.items.insert(invoice.id, items);
    state.invoices.insert(invoice.id, invoice.clone());
    Ok(invoice)
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, BillingError> {
    Ok(self.state.lock().unwrap().invoices.get(&id).cloned())
  }

  async fn items_of(&self, invoice_id: Uuid) -> Result<Vec<InvoiceItem>, BillingError> {
    Ok(
      self
        .state
        .lock()
        .unwrap()
        .items
        .get(&invoice_id)
        .cloned()
        .unwrap_or_default(),
    )
  }

  async fn update_guarded(
    &self,
    invoice: &Invoice,
    expected_status: InvoiceStatus,
  ) -> Result<(), BillingError> {
    let mut state = self.state.lock().unwrap();
    let still_expected = state
      .invoices
      .get(&invoice.id)
      .is_some_and(|stored| stored.status == expected_status);
    if !still_expected {
      return Err(BillingError::ConcurrencyConflict(format!(
        "invoice {} missing or no longer {}",
        invoice.id, expected_status
      )));
    }
    state.invoices.insert(invoice.id, invoice.clone());
    Ok(())
  }

  async fn replace_items(
    &self,
    invoice: &Invoice,
    items: Vec<InvoiceItem>,
  ) -> Result<Vec<InvoiceItem>, BillingError> {
    let mut state = self.state.lock().unwrap();
    if !state.invoices.contains_key(&invoice.id) {
      return Err(BillingError::InvoiceNotFound(invoice.id));
    }
    state.invoices.insert(invoice.id, invoice.clone());
    state.items.insert(invoice.id, items.clone());
    Ok(items)
  }

  async fn find_due_for_overdue(
    &self,
    current_date: NaiveDate,
  ) -> Result<Vec<Invoice>, BillingError> {
    Ok(
      self
        .state
        .lock()
        .unwrap()
        .invoices
        .values()
        .filter(|invoice| {
          invoice.status == InvoiceStatus::Sent && invoice.due_date < current_date
        })
        .cloned()
        .collect(),
    )
  }
}

#[async_trait]
impl PaymentRepository for InMemoryBillingStore {
  async fn create_with_invoice(
    &self,
    payment: Payment,
    invoice: &Invoice,
  ) -> Result<Payment, BillingError> {
    let mut state = self.state.lock().unwrap();
    if !state.invoices.contains_key(&invoice.id) {
      return Err(BillingError::InvoiceNotFound(invoice.id));
    }
    state.payments.insert(payment.id, payment.clone());
    state.invoices.insert(invoice.id, invoice.clone());
    Ok(payment)
  }

  async fn delete_with_invoice(
    &self,
    payment_id: Uuid,
    invoice: &Invoice,
  ) -> Result<(), BillingError> {
    let mut state = self.state.lock().unwrap();
    if state.payments.remove(&payment_id).is_none() {
      return Err(BillingError::PaymentNotFound(payment_id));
    }
    state.invoices.insert(invoice.id, invoice.clone());
    Ok(())
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, BillingError> {
    Ok(self.state.lock().unwrap().payments.get(&id).cloned())
  }
}

#[async_trait]
impl StatementSourceRepository for InMemoryBillingStore {
  async fn snapshot(&self, customer_id: Uuid) -> Result<StatementSnapshot, BillingError> {
    let state = self.state.lock().unwrap();
    Ok(StatementSnapshot {
      invoices: state
        .invoices
        .values()
        .filter(|invoice| invoice.customer_id == customer_id)
        .cloned()
        .collect(),
      payments: state
        .payments
        .values()
        .filter(|payment| payment.customer_id == customer_id)
        .cloned()
        .collect(),
    })
  }
}

#[derive(Default)]
struct QuotationState {
  quotations: HashMap<Uuid, Quotation>,
  items: HashMap<Uuid, Vec<QuotationItem>>,
}

#[derive(Default)]
pub struct InMemoryQuotationStore {
  state: Mutex<QuotationState>,
}

impl InMemoryQuotationStore {
  pub async fn quotation(&self, id: Uuid) -> Option<Quotation> {
    self.state.lock().unwrap().quotations.get(&id).cloned()
  }
}

#[async_trait]
impl QuotationRepository for InMemoryQuotationStore {
  async fn create_with_items(
    &self,
    quotation: Quotation,
    items: Vec<QuotationItem>,
  ) -> Result<Quotation, BillingError> {
    let mut state = self.state.lock().unwrap();
    state.items.insert(quotation.id, items);
    state.quotations.insert(quotation.id, quotation.clone());
    Ok(quotation)
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Quotation>, BillingError> {
    Ok(self.state.lock().unwrap().quotations.get(&id).cloned())
  }

  async fn items_of(&self, quotation_id: Uuid) -> Result<Vec<QuotationItem>, BillingError> {
    Ok(
      self
        .state
        .lock()
        .unwrap()
        .items
        .get(&quotation_id)
        .cloned()
        .unwrap_or_default(),
    )
  }
}

struct InventoryState {
  levels: HashMap<String, Decimal>,
  removals: u32,
  restorations: u32,
}

/// Stock levels plus call counters, for asserting deduction happens
/// exactly once.
pub struct RecordingInventory {
  state: Mutex<InventoryState>,
}

impl RecordingInventory {
  pub fn with_stock(levels: &[(&str, Decimal)]) -> Self {
    Self {
      state: Mutex::new(InventoryState {
        levels: levels
          .iter()
          .map(|(barcode, quantity)| (barcode.to_string(), *quantity))
          .collect(),
        removals: 0,
        restorations: 0,
      }),
    }
  }

  pub fn level(&self, barcode: &str) -> Decimal {
    self
      .state
      .lock()
      .unwrap()
      .levels
      .get(barcode)
      .copied()
      .unwrap_or(Decimal::ZERO)
  }

  pub fn removals(&self) -> u32 {
    self.state.lock().unwrap().removals
  }

  pub fn restorations(&self) -> u32 {
    self.state.lock().unwrap().restorations
  }
}

#[async_trait]
impl InventoryPort for RecordingInventory {
  async fn remove_stock(&self, movement: StockMovement) -> Result<Decimal, BillingError> {
    let mut guard = self.state.lock().unwrap();
    let state = &mut *guard;
    let level = state
      .levels
      .get_mut(&movement.barcode)
      .ok_or_else(|| BillingError::UnknownBarcode(movement.barcode.clone()))?;
    if *level < movement.quantity {
      return Err(BillingError::InsufficientStock {
        barcode: movement.barcode,
        requested: movement.quantity,
        available: *level,
      });
    }
    *level -= movement.quantity;
    let new_level = *level;
    state.removals += 1;
    Ok(new_level)
  }

  async fn restore_stock(&self, movement: StockMovement) -> Result<Decimal, BillingError> {
    let mut guard = self.state.lock().unwrap();
    let state = &mut *guard;
    let level = state
      .levels
      .entry(movement.barcode)
      .or_insert(Decimal::ZERO);
    *level += movement.quantity;
    let new_level = *level;
    state.restorations += 1;
    Ok(new_level)
  }
}
