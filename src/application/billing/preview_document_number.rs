use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, SequenceAllocator};

#[derive(Debug, Deserialize)]
pub struct PreviewDocumentNumberCommand {
  pub shop_id: Uuid,
  pub customer_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PreviewDocumentNumberResponse {
  /// Display value only; a concurrent allocation can race ahead of it.
  pub document_number: String,
}

pub struct PreviewDocumentNumberUseCase {
  allocator: Arc<SequenceAllocator>,
}

impl PreviewDocumentNumberUseCase {
  pub fn new(allocator: Arc<SequenceAllocator>) -> Self {
    Self { allocator }
  }

  pub async fn execute(
    &self,
    command: PreviewDocumentNumberCommand,
  ) -> Result<PreviewDocumentNumberResponse, BillingError> {
    let number = self
      .allocator
      .preview(command.shop_id, command.customer_id)
      .await?;

    Ok(PreviewDocumentNumberResponse {
      document_number: number.into_inner(),
    })
  }
}
