use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, PaymentLedger};

#[derive(Debug, Deserialize)]
pub struct ReversePaymentCommand {
  pub payment_id: Uuid,
  pub actor: String,
}

#[derive(Debug, Serialize)]
pub struct ReversePaymentResponse {
  pub invoice_id: Uuid,
  pub status: String,
  pub total_paid: Decimal,
  pub balance_due: Decimal,
}

pub struct ReversePaymentUseCase {
  ledger: Arc<PaymentLedger>,
}

impl ReversePaymentUseCase {
  pub fn new(ledger: Arc<PaymentLedger>) -> Self {
    Self { ledger }
  }

  pub async fn execute(
    &self,
    command: ReversePaymentCommand,
  ) -> Result<ReversePaymentResponse, BillingError> {
    let invoice = self
      .ledger
      .reverse(command.payment_id, &command.actor)
      .await?;

    Ok(ReversePaymentResponse {
      invoice_id: invoice.id,
      status: invoice.status.as_str().to_string(),
      total_paid: invoice.total_paid,
      balance_due: invoice.balance_due(),
    })
  }
}
