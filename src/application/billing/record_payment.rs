use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, PaymentLedger, PaymentMethod};

#[derive(Debug, Deserialize)]
pub struct RecordPaymentCommand {
  pub invoice_id: Uuid,
  pub amount: Decimal,
  pub payment_date: NaiveDate,
  pub method: Option<String>,
  pub reference: Option<String>,
  /// Explicit business exception; without it an amount beyond the
  /// outstanding balance is rejected.
  #[serde(default)]
  pub allow_overpayment: bool,
}

#[derive(Debug, Serialize)]
pub struct RecordPaymentResponse {
  pub payment_id: Uuid,
  pub invoice_id: Uuid,
  pub amount_paid: Decimal,
}

pub struct RecordPaymentUseCase {
  ledger: Arc<PaymentLedger>,
}

impl RecordPaymentUseCase {
  pub fn new(ledger: Arc<PaymentLedger>) -> Self {
    Self { ledger }
  }

  pub async fn execute(
    &self,
    command: RecordPaymentCommand,
  ) -> Result<RecordPaymentResponse, BillingError> {
    let method = command
      .method
      .as_deref()
      .map(PaymentMethod::from_str)
      .transpose()?;

    let payment = self
      .ledger
      .record(
        command.invoice_id,
        command.amount,
        command.payment_date,
        method,
        command.reference,
        command.allow_overpayment,
      )
      .await?;

    Ok(RecordPaymentResponse {
      payment_id: payment.id,
      invoice_id: payment.invoice_id,
      amount_paid: payment.amount_paid,
    })
  }
}
