use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, InvoiceLifecycle};

#[derive(Debug, Deserialize)]
pub struct MarkOverdueInvoicesCommand {
  /// Defaults to today when absent.
  pub as_of: Option<NaiveDate>,
  pub actor: String,
}

#[derive(Debug, Serialize)]
pub struct MarkOverdueInvoicesResponse {
  pub updated_invoice_ids: Vec<Uuid>,
}

pub struct MarkOverdueInvoicesUseCase {
  lifecycle: Arc<InvoiceLifecycle>,
}

impl MarkOverdueInvoicesUseCase {
  pub fn new(lifecycle: Arc<InvoiceLifecycle>) -> Self {
    Self { lifecycle }
  }

  pub async fn execute(
    &self,
    command: MarkOverdueInvoicesCommand,
  ) -> Result<MarkOverdueInvoicesResponse, BillingError> {
    let as_of = command.as_of.unwrap_or_else(|| Utc::now().date_naive());

    let updated = self.lifecycle.mark_overdue(as_of, &command.actor).await?;

    Ok(MarkOverdueInvoicesResponse {
      updated_invoice_ids: updated.into_iter().map(|invoice| invoice.id).collect(),
    })
  }
}
