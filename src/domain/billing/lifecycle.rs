use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use super::entities::{Invoice, InvoiceItem};
use super::errors::BillingError;
use super::ports::{InventoryPort, InvoiceRepository, StockMovement};
use super::value_objects::InvoiceStatus;

pub const INVOICE_REFERENCE_TYPE: &str = "invoice";

/// State machine over an invoice's status. Entering Sent, Paid or
/// PartiallyPaid deducts stock for stockable line items exactly once per
/// invoice; entering a terminal state restores a prior deduction.
pub struct InvoiceLifecycle {
  invoices: Arc<dyn InvoiceRepository>,
  inventory: Arc<dyn InventoryPort>,
}

impl InvoiceLifecycle {
  pub fn new(invoices: Arc<dyn InvoiceRepository>, inventory: Arc<dyn InventoryPort>) -> Self {
    Self { invoices, inventory }
  }

  pub async fn transition(
    &self,
    invoice_id: Uuid,
    new_status: InvoiceStatus,
    actor: &str,
  ) -> Result<Invoice, BillingError> {
    let mut invoice = self
      .invoices
      .find_by_id(invoice_id)
      .await?
      .ok_or(BillingError::InvoiceNotFound(invoice_id))?;

    let previous_status = invoice.status;
    invoice.change_status(new_status)?;

    let deducting = new_status.triggers_stock_deduction() && !invoice.stock_deducted;
    let restoring = new_status.is_terminal() && invoice.stock_deducted;

    let mut applied: Vec<StockMovement> = Vec::new();
    if deducting {
      let items = self.invoices.items_of(invoice_id).await?;
      let movements = self.stock_movements(&invoice, &items, actor)?;
      for movement in movements {
        match self.inventory.remove_stock(movement.clone()).await {
          Ok(new_level) => {
            tracing::debug!(
              invoice = %invoice.invoice_number,
              barcode = %movement.barcode,
              quantity = %movement.quantity,
              new_level = %new_level,
              "stock deducted"
            );
            applied.push(movement);
          }
          Err(err) => {
            // Undo this call's partial deductions; the invoice must not be
            // left in the new status with partially deducted stock.
            self.undo_removals(&applied).await;
            return Err(err);
          }
        }
      }
      invoice.mark_stock_deducted();
    } else if restoring {
      let items = self.invoices.items_of(invoice_id).await?;
      let movements = self.stock_movements(&invoice, &items, actor)?;
      for movement in movements {
        match self.inventory.restore_stock(movement.clone()).await {
          Ok(_) => applied.push(movement),
          Err(err) => {
            self.undo_restorations(&applied).await;
            return Err(err);
          }
        }
      }
      invoice.clear_stock_deducted();
    }

    match self
      .invoices
      .update_guarded(&invoice, previous_status)
      .await
    {
      Ok(()) => {
        tracing::info!(
          invoice = %invoice.invoice_number,
          from = %previous_status,
          to = %new_status,
          actor,
          "invoice status changed"
        );
        Ok(invoice)
      }
      Err(err) => {
        // A concurrent writer won the status race; this call's stock
        // effects must not stand.
        if deducting {
          self.undo_removals(&applied).await;
        } else if restoring {
          self.undo_restorations(&applied).await;
        }
        Err(err)
      }
    }
  }

  /// Moves Sent invoices past their due date to Overdue. Conflicting
  /// concurrent updates are skipped, not failed: the sweep is re-run.
  pub async fn mark_overdue(
    &self,
    current_date: NaiveDate,
    actor: &str,
  ) -> Result<Vec<Invoice>, BillingError> {
    let due = self.invoices.find_due_for_overdue(current_date).await?;

    let mut updated = Vec::new();
    for invoice in due {
      if !invoice.is_overdue(current_date) {
        continue;
      }
      match self
        .transition(invoice.id, InvoiceStatus::Overdue, actor)
        .await
      {
        Ok(invoice) => updated.push(invoice),
        Err(BillingError::ConcurrencyConflict(reason)) => {
          tracing::debug!(invoice_id = %invoice.id, %reason, "skipping contested invoice in overdue sweep");
        }
        Err(err) => return Err(err),
      }
    }
    Ok(updated)
  }

  fn stock_movements(
    &self,
    invoice: &Invoice,
    items: &[InvoiceItem],
    actor: &str,
  ) -> Result<Vec<StockMovement>, BillingError> {
    let mut movements = Vec::new();
    for item in items.iter().filter(|item| item.is_stockable()) {
      let barcode = item
        .barcode
        .clone()
        .ok_or_else(|| BillingError::UnknownBarcode(item.description.value().to_string()))?;
      movements.push(StockMovement {
        barcode,
        quantity: item.quantity.value(),
        shop_id: invoice.shop_id,
        actor: actor.to_string(),
        reference_type: INVOICE_REFERENCE_TYPE.to_string(),
        reference_id: invoice.id,
        reference_number: invoice.invoice_number.value().to_string(),
        notes: None,
      });
    }
    Ok(movements)
  }

  async fn undo_removals(&self, applied: &[StockMovement]) {
    for movement in applied {
      if let Err(err) = self.inventory.restore_stock(movement.clone()).await {
        tracing::error!(
          barcode = %movement.barcode,
          reference = %movement.reference_number,
          %err,
          "failed to restore stock while aborting a transition"
        );
      }
    }
  }

  async fn undo_restorations(&self, applied: &[StockMovement]) {
    for movement in applied {
      if let Err(err) = self.inventory.remove_stock(movement.clone()).await {
        tracing::error!(
          barcode = %movement.barcode,
          reference = %movement.reference_number,
          %err,
          "failed to re-withdraw stock while aborting a reversal"
        );
      }
    }
  }
}
