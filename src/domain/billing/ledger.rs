use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::entities::{Invoice, Payment};
use super::errors::BillingError;
use super::ports::{InvoiceRepository, PaymentRepository};
use super::value_objects::{PaymentMethod, money_tolerance};

/// Records and reverses payments against invoices, keeping the invoice's
/// paid/outstanding amounts and status consistent.
pub struct PaymentLedger {
  invoices: Arc<dyn InvoiceRepository>,
  payments: Arc<dyn PaymentRepository>,
}

impl PaymentLedger {
  pub fn new(invoices: Arc<dyn InvoiceRepository>, payments: Arc<dyn PaymentRepository>) -> Self {
    Self { invoices, payments }
  }

  /// Inserts the payment and applies it to the invoice in one atomic unit.
  /// Without `allow_overpayment`, an amount pushing total_paid beyond
  /// total_net by more than the tolerance is rejected.
  #[allow(clippy::too_many_arguments)]
  pub async fn record(
    &self,
    invoice_id: Uuid,
    amount: Decimal,
    payment_date: NaiveDate,
    method: Option<PaymentMethod>,
    reference: Option<String>,
    allow_overpayment: bool,
  ) -> Result<Payment, BillingError> {
    if amount <= Decimal::ZERO || amount.scale() > 2 {
      return Err(BillingError::InvalidPaymentAmount);
    }

    let mut invoice = self
      .invoices
      .find_by_id(invoice_id)
      .await?
      .ok_or(BillingError::InvoiceNotFound(invoice_id))?;

    if invoice.status.is_terminal() {
      return Err(BillingError::InvalidStatusTransition(format!(
        "invoice is {} and accepts no payments",
        invoice.status
      )));
    }

    let balance_due = invoice.balance_due();
    if amount > balance_due + money_tolerance() && !allow_overpayment {
      return Err(BillingError::Overpayment {
        amount,
        balance_due,
      });
    }

    invoice.apply_payment(amount);
    let payment = Payment::new(
      invoice.id,
      invoice.customer_id,
      amount,
      payment_date,
      method,
      reference,
    );
    let payment = self.payments.create_with_invoice(payment, &invoice).await?;

    tracing::info!(
      invoice = %invoice.invoice_number,
      payment_id = %payment.id,
      amount = %amount,
      status = %invoice.status,
      "payment recorded"
    );
    Ok(payment)
  }

  /// Deletes the payment and restores the invoice's paid amount to its
  /// pre-payment value exactly, in the same atomic unit as record.
  pub async fn reverse(&self, payment_id: Uuid, actor: &str) -> Result<Invoice, BillingError> {
    let payment = self
      .payments
      .find_by_id(payment_id)
      .await?
      .ok_or(BillingError::PaymentNotFound(payment_id))?;

    let mut invoice = self
      .invoices
      .find_by_id(payment.invoice_id)
      .await?
      .ok_or(BillingError::InvoiceNotFound(payment.invoice_id))?;

    if invoice.status.is_terminal() {
      return Err(BillingError::InvalidStatusTransition(format!(
        "invoice is {} and its payments can no longer change",
        invoice.status
      )));
    }

    let fell_back = invoice.revert_payment(payment.amount_paid);
    if fell_back {
      // The true prior status would need a history log; Sent is the
      // documented approximation.
      tracing::warn!(
        invoice = %invoice.invoice_number,
        payment_id = %payment.id,
        "last payment reversed; status falls back to sent"
      );
    }

    self
      .payments
      .delete_with_invoice(payment.id, &invoice)
      .await?;

    tracing::info!(
      invoice = %invoice.invoice_number,
      payment_id = %payment.id,
      amount = %payment.amount_paid,
      status = %invoice.status,
      actor,
      "payment reversed"
    );
    Ok(invoice)
  }
}
