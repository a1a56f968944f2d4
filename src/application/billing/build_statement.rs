use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, StatementBuilder, StatementEntryKind};

#[derive(Debug, Deserialize)]
pub struct BuildStatementCommand {
  pub customer_id: Uuid,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct StatementEntryDto {
  pub date: NaiveDate,
  pub kind: String,
  pub reference: String,
  pub debit: Decimal,
  pub credit: Decimal,
  pub running_balance: Decimal,
}

#[derive(Debug, Serialize)]
pub struct BuildStatementResponse {
  pub customer_id: Uuid,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub opening_balance: Decimal,
  pub entries: Vec<StatementEntryDto>,
  pub total_debits: Decimal,
  pub total_credits: Decimal,
  pub closing_balance: Decimal,
}

pub struct BuildStatementUseCase {
  builder: Arc<StatementBuilder>,
}

impl BuildStatementUseCase {
  pub fn new(builder: Arc<StatementBuilder>) -> Self {
    Self { builder }
  }

  pub async fn execute(
    &self,
    command: BuildStatementCommand,
  ) -> Result<BuildStatementResponse, BillingError> {
    let statement = self
      .builder
      .build(command.customer_id, command.start_date, command.end_date)
      .await?;

    let entries = statement
      .entries
      .into_iter()
      .map(|entry| StatementEntryDto {
        date: entry.date,
        kind: match entry.kind {
          StatementEntryKind::Invoice => "invoice".to_string(),
          StatementEntryKind::Payment => "payment".to_string(),
        },
        reference: entry.reference,
        debit: entry.debit,
        credit: entry.credit,
        running_balance: entry.running_balance,
      })
      .collect();

    Ok(BuildStatementResponse {
      customer_id: statement.customer_id,
      start_date: statement.start_date,
      end_date: statement.end_date,
      opening_balance: statement.opening_balance,
      entries,
      total_debits: statement.total_debits,
      total_credits: statement.total_credits,
      closing_balance: statement.closing_balance,
    })
  }
}
