use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, InvoiceLifecycle, InvoiceStatus};

#[derive(Debug, Deserialize)]
pub struct ChangeInvoiceStatusCommand {
  pub invoice_id: Uuid,
  pub new_status: String,
  pub actor: String,
}

#[derive(Debug, Serialize)]
pub struct ChangeInvoiceStatusResponse {
  pub invoice_id: Uuid,
  pub status: String,
  pub stock_deducted: bool,
}

pub struct ChangeInvoiceStatusUseCase {
  lifecycle: Arc<InvoiceLifecycle>,
}

impl ChangeInvoiceStatusUseCase {
  pub fn new(lifecycle: Arc<InvoiceLifecycle>) -> Self {
    Self { lifecycle }
  }

  pub async fn execute(
    &self,
    command: ChangeInvoiceStatusCommand,
  ) -> Result<ChangeInvoiceStatusResponse, BillingError> {
    let new_status = InvoiceStatus::from_str(&command.new_status)?;

    let invoice = self
      .lifecycle
      .transition(command.invoice_id, new_status, &command.actor)
      .await?;

    Ok(ChangeInvoiceStatusResponse {
      invoice_id: invoice.id,
      status: invoice.status.as_str().to_string(),
      stock_deducted: invoice.stock_deducted,
    })
  }
}
