use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::errors::BillingError;
use super::ports::{CustomerDirectory, StatementSourceRepository};
use super::value_objects::{money_tolerance, round_money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementEntryKind {
  Invoice,
  Payment,
}

impl StatementEntryKind {
  /// Invoices sort before payments on the same calendar date.
  fn sort_rank(&self) -> u8 {
    match self {
      StatementEntryKind::Invoice => 0,
      StatementEntryKind::Payment => 1,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementEntry {
  pub date: NaiveDate,
  pub kind: StatementEntryKind,
  pub reference: String,
  pub debit: Decimal,
  pub credit: Decimal,
  pub running_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
  pub customer_id: Uuid,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub opening_balance: Decimal,
  pub entries: Vec<StatementEntry>,
  pub total_debits: Decimal,
  pub total_credits: Decimal,
  pub closing_balance: Decimal,
}

/// Read-only: merges a customer's invoice debits and payment credits into
/// one chronologically ordered running balance over a date range.
pub struct StatementBuilder {
  customers: Arc<dyn CustomerDirectory>,
  sources: Arc<dyn StatementSourceRepository>,
}

impl StatementBuilder {
  pub fn new(
    customers: Arc<dyn CustomerDirectory>,
    sources: Arc<dyn StatementSourceRepository>,
  ) -> Self {
    Self { customers, sources }
  }

  pub async fn build(
    &self,
    customer_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
  ) -> Result<Statement, BillingError> {
    if start_date > end_date {
      return Err(BillingError::InvalidDateRange {
        start: start_date,
        end: end_date,
      });
    }
    if !self.customers.exists(customer_id).await? {
      return Err(BillingError::CustomerNotFound(customer_id));
    }

    let snapshot = self.sources.snapshot(customer_id).await?;

    // Draft, Cancelled and Void invoices never contribute to any balance
    let opening_balance = round_money(
      snapshot
        .invoices
        .iter()
        .filter(|invoice| invoice.status.affects_balance() && invoice.invoice_date < start_date)
        .map(|invoice| invoice.balance_due())
        .sum(),
    );

    let mut entries: Vec<StatementEntry> = Vec::new();
    for invoice in &snapshot.invoices {
      if invoice.status.affects_balance()
        && invoice.invoice_date >= start_date
        && invoice.invoice_date <= end_date
      {
        entries.push(StatementEntry {
          date: invoice.invoice_date,
          kind: StatementEntryKind::Invoice,
          reference: invoice.invoice_number.value().to_string(),
          debit: invoice.total_net_amount,
          credit: Decimal::ZERO,
          running_balance: Decimal::ZERO,
        });
      }
    }
    for payment in &snapshot.payments {
      if payment.payment_date >= start_date && payment.payment_date <= end_date {
        entries.push(StatementEntry {
          date: payment.payment_date,
          kind: StatementEntryKind::Payment,
          reference: payment
            .reference
            .clone()
            .unwrap_or_else(|| payment.id.to_string()),
          debit: Decimal::ZERO,
          credit: payment.amount_paid,
          running_balance: Decimal::ZERO,
        });
      }
    }

    entries.sort_by_key(|entry| (entry.date, entry.kind.sort_rank()));

    let mut running_balance = opening_balance;
    let mut total_debits = Decimal::ZERO;
    let mut total_credits = Decimal::ZERO;
    for entry in &mut entries {
      total_debits += entry.debit;
      total_credits += entry.credit;
      running_balance = round_money(running_balance + entry.debit - entry.credit);
      entry.running_balance = running_balance;
    }
    let closing_balance = running_balance;

    // The merge must reconcile; a mismatch is a defect, never accepted
    let expected = round_money(opening_balance + total_debits - total_credits);
    if (closing_balance - expected).abs() > money_tolerance() {
      tracing::error!(
        %customer_id,
        %opening_balance,
        %total_debits,
        %total_credits,
        %closing_balance,
        %expected,
        "statement closing balance failed reconciliation"
      );
      return Err(BillingError::ArithmeticInvariant(format!(
        "statement closing balance {} does not reconcile with {}",
        closing_balance, expected
      )));
    }

    Ok(Statement {
      customer_id,
      start_date,
      end_date,
      opening_balance,
      entries,
      total_debits,
      total_credits,
      closing_balance,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::billing::entities::{Invoice, Payment};
  use crate::domain::billing::tax::{TaxableLine, Totals};
  use crate::domain::billing::testing::{InMemoryBillingStore, InMemoryCustomerDirectory};
  use crate::domain::billing::value_objects::{DocumentNumber, InvoiceStatus, TaxRate};
  use rust_decimal_macros::dec;

  fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, day).unwrap()
  }

  fn flat_invoice(
    customer_id: Uuid,
    number: &str,
    invoice_date: NaiveDate,
    amount: Decimal,
    status: InvoiceStatus,
    paid: Decimal,
  ) -> Invoice {
    // Zero-rate totals keep the net equal to the gross amount
    let totals = Totals::compute(
      &[TaxableLine {
        quantity: dec!(1),
        rate_per_unit: amount,
      }],
      false,
      TaxRate::zero(),
      TaxRate::zero(),
    );
    let mut invoice = Invoice::new(
      DocumentNumber::new(number.to_string()).unwrap(),
      Uuid::new_v4(),
      customer_id,
      None,
      None,
      invoice_date,
      invoice_date + chrono::Duration::days(30),
      false,
      TaxRate::zero(),
      TaxRate::zero(),
      totals,
    );
    invoice.status = status;
    invoice.total_paid = paid;
    invoice
  }

  fn payment(customer_id: Uuid, invoice_id: Uuid, on: NaiveDate, amount: Decimal) -> Payment {
    Payment::new(invoice_id, customer_id, amount, on, None, None)
  }

  fn builder(
    customers: &Arc<InMemoryCustomerDirectory>,
    store: &Arc<InMemoryBillingStore>,
  ) -> StatementBuilder {
    StatementBuilder::new(customers.clone(), store.clone())
  }

  #[tokio::test]
  async fn test_invalid_date_range() {
    let customers = Arc::new(InMemoryCustomerDirectory::default());
    let store = Arc::new(InMemoryBillingStore::default());
    let customer_id = customers.insert("CUST001");
    let builder = builder(&customers, &store);

    assert!(matches!(
      builder
        .build(customer_id, date(1, 31), date(1, 1))
        .await,
      Err(BillingError::InvalidDateRange { .. })
    ));
  }

  #[tokio::test]
  async fn test_unknown_customer() {
    let customers = Arc::new(InMemoryCustomerDirectory::default());
    let store = Arc::new(InMemoryBillingStore::default());
    let builder = builder(&customers, &store);

    assert!(matches!(
      builder.build(Uuid::new_v4(), date(1, 1), date(1, 31)).await,
      Err(BillingError::CustomerNotFound(_))
    ));
  }

  #[tokio::test]
  async fn test_empty_statement() {
    let customers = Arc::new(InMemoryCustomerDirectory::default());
    let store = Arc::new(InMemoryBillingStore::default());
    let customer_id = customers.insert("CUST001");
    let builder = builder(&customers, &store);

    let statement = builder
      .build(customer_id, date(1, 1), date(1, 31))
      .await
      .unwrap();
    assert_eq!(statement.opening_balance, dec!(0));
    assert_eq!(statement.closing_balance, dec!(0));
    assert!(statement.entries.is_empty());
  }

  #[tokio::test]
  async fn test_opening_balance_from_prior_invoices() {
    let customers = Arc::new(InMemoryCustomerDirectory::default());
    let store = Arc::new(InMemoryBillingStore::default());
    let customer_id = customers.insert("CUST001");

    // December invoice, partly paid, lands in the opening balance
    let prior = flat_invoice(
      customer_id,
      "I-MAIN/CUST001-001",
      date(1, 15) - chrono::Duration::days(31),
      dec!(500.00),
      InvoiceStatus::PartiallyPaid,
      dec!(200.00),
    );
    store.insert_invoice(prior);
    // January invoice lands in the period
    store.insert_invoice(flat_invoice(
      customer_id,
      "I-MAIN/CUST001-002",
      date(1, 15),
      dec!(200.00),
      InvoiceStatus::Sent,
      dec!(0),
    ));

    let statement = builder(&customers, &store)
      .build(customer_id, date(1, 1), date(1, 31))
      .await
      .unwrap();

    assert_eq!(statement.opening_balance, dec!(300.00));
    assert_eq!(statement.entries.len(), 1);
    assert_eq!(statement.closing_balance, dec!(500.00));
  }

  #[tokio::test]
  async fn test_draft_cancelled_void_never_contribute() {
    let customers = Arc::new(InMemoryCustomerDirectory::default());
    let store = Arc::new(InMemoryBillingStore::default());
    let customer_id = customers.insert("CUST001");

    for (n, status) in [
      ("I-MAIN/CUST001-001", InvoiceStatus::Draft),
      ("I-MAIN/CUST001-002", InvoiceStatus::Cancelled),
      ("I-MAIN/CUST001-003", InvoiceStatus::Void),
    ] {
      store.insert_invoice(flat_invoice(
        customer_id,
        n,
        date(1, 10),
        dec!(100.00),
        status,
        dec!(0),
      ));
      store.insert_invoice(flat_invoice(
        customer_id,
        &format!("{n}X"),
        date(1, 10) - chrono::Duration::days(60),
        dec!(100.00),
        status,
        dec!(0),
      ));
    }

    let statement = builder(&customers, &store)
      .build(customer_id, date(1, 1), date(1, 31))
      .await
      .unwrap();
    assert_eq!(statement.opening_balance, dec!(0));
    assert!(statement.entries.is_empty());
    assert_eq!(statement.closing_balance, dec!(0));
  }

  #[tokio::test]
  async fn test_running_balance_merge_and_ordering() {
    let customers = Arc::new(InMemoryCustomerDirectory::default());
    let store = Arc::new(InMemoryBillingStore::default());
    let customer_id = customers.insert("CUST001");

    let inv1 = flat_invoice(
      customer_id,
      "I-MAIN/CUST001-001",
      date(1, 5),
      dec!(100.00),
      InvoiceStatus::PartiallyPaid,
      dec!(40.00),
    );
    let inv1_id = inv1.id;
    store.insert_invoice(inv1);
    // Payment shares the invoice date of the second invoice; the invoice
    // entry must come first
    let inv2 = flat_invoice(
      customer_id,
      "I-MAIN/CUST001-002",
      date(1, 10),
      dec!(200.00),
      InvoiceStatus::Sent,
      dec!(0),
    );
    store.insert_invoice(inv2);
    store.insert_payment(payment(customer_id, inv1_id, date(1, 10), dec!(40.00)));

    let statement = builder(&customers, &store)
      .build(customer_id, date(1, 1), date(1, 31))
      .await
      .unwrap();

    assert_eq!(statement.opening_balance, dec!(0));
    assert_eq!(statement.entries.len(), 3);

    assert_eq!(statement.entries[0].kind, StatementEntryKind::Invoice);
    assert_eq!(statement.entries[0].running_balance, dec!(100.00));

    assert_eq!(statement.entries[1].date, date(1, 10));
    assert_eq!(statement.entries[1].kind, StatementEntryKind::Invoice);
    assert_eq!(statement.entries[1].running_balance, dec!(300.00));

    assert_eq!(statement.entries[2].date, date(1, 10));
    assert_eq!(statement.entries[2].kind, StatementEntryKind::Payment);
    assert_eq!(statement.entries[2].running_balance, dec!(260.00));

    assert_eq!(statement.total_debits, dec!(300.00));
    assert_eq!(statement.total_credits, dec!(40.00));
    assert_eq!(statement.closing_balance, dec!(260.00));
  }

  #[tokio::test]
  async fn test_closing_balance_reconciles() {
    let customers = Arc::new(InMemoryCustomerDirectory::default());
    let store = Arc::new(InMemoryBillingStore::default());
    let customer_id = customers.insert("CUST001");

    let mut expected_debits = Decimal::ZERO;
    let mut expected_credits = Decimal::ZERO;
    for day in 1..=20 {
      let amount = Decimal::new(1_000 + i64::from(day) * 137, 2);
      let invoice = flat_invoice(
        customer_id,
        &format!("I-MAIN/CUST001-{day:03}"),
        date(1, day),
        amount,
        InvoiceStatus::Sent,
        dec!(0),
      );
      let invoice_id = invoice.id;
      expected_debits += invoice.total_net_amount;
      store.insert_invoice(invoice);

      if day % 3 == 0 {
        let paid = Decimal::new(500 + i64::from(day) * 7, 2);
        store.insert_payment(payment(customer_id, invoice_id, date(1, day), paid));
        expected_credits += paid;
      }
    }

    let statement = builder(&customers, &store)
      .build(customer_id, date(1, 1), date(1, 31))
      .await
      .unwrap();

    assert_eq!(statement.total_debits, expected_debits);
    assert_eq!(statement.total_credits, expected_credits);
    let expected_closing =
      round_money(statement.opening_balance + expected_debits - expected_credits);
    assert!((statement.closing_balance - expected_closing).abs() <= money_tolerance());
  }
}
