use std::sync::Arc;
use uuid::Uuid;

use super::errors::BillingError;
use super::ports::{CustomerDirectory, SequenceCounterRepository, ShopDirectory};
use super::value_objects::{CustomerCode, DocumentNumber, ShopCode, ValueObjectError};

/// Bounded transparent retry for serialization failures reported by the
/// counter's atomic increment primitive.
const MAX_INCREMENT_ATTEMPTS: u32 = 3;

/// Document number grammar:
///   prefix shop_code "/" customer_code separator zero_padded(sequence)
/// e.g. "I-MAIN/CUST001-001". Codes are alphanumeric, so the separator
/// before the digits is unambiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberingFormat {
  pub prefix: String,
  pub separator: String,
  pub pad_width: usize,
}

impl Default for NumberingFormat {
  fn default() -> Self {
    Self {
      prefix: "I-".to_string(),
      separator: "-".to_string(),
      pad_width: 3,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocumentNumber {
  pub prefix: String,
  pub shop_code: String,
  pub customer_code: String,
  pub sequence: i64,
}

impl NumberingFormat {
  pub fn render(
    &self,
    shop_code: &ShopCode,
    customer_code: &CustomerCode,
    sequence: i64,
  ) -> Result<DocumentNumber, ValueObjectError> {
    DocumentNumber::new(format!(
      "{}{}/{}{}{:0width$}",
      self.prefix,
      shop_code,
      customer_code,
      self.separator,
      sequence,
      width = self.pad_width
    ))
  }

  /// Pure, total over the grammar; any non-matching string is a
  /// validation failure.
  pub fn parse(&self, raw: &str) -> Result<ParsedDocumentNumber, ValueObjectError> {
    let invalid = || ValueObjectError::InvalidDocumentNumber(raw.to_string());

    let rest = raw.strip_prefix(self.prefix.as_str()).ok_or_else(invalid)?;
    let (shop_code, rest) = rest.split_once('/').ok_or_else(invalid)?;
    let (customer_code, digits) = rest
      .rsplit_once(self.separator.as_str())
      .ok_or_else(invalid)?;

    if shop_code.is_empty() || !shop_code.chars().all(|c| c.is_ascii_alphanumeric()) {
      return Err(invalid());
    }
    if customer_code.is_empty() || !customer_code.chars().all(|c| c.is_ascii_alphanumeric()) {
      return Err(invalid());
    }
    if digits.len() < self.pad_width || !digits.chars().all(|c| c.is_ascii_digit()) {
      return Err(invalid());
    }
    let sequence: i64 = digits.parse().map_err(|_| invalid())?;

    Ok(ParsedDocumentNumber {
      prefix: self.prefix.clone(),
      shop_code: shop_code.to_string(),
      customer_code: customer_code.to_string(),
      sequence,
    })
  }
}

/// Hands out strictly increasing, never-reused sequence numbers per
/// (shop, customer) pair and formats them into document numbers.
pub struct SequenceAllocator {
  shops: Arc<dyn ShopDirectory>,
  customers: Arc<dyn CustomerDirectory>,
  counters: Arc<dyn SequenceCounterRepository>,
  format: NumberingFormat,
}

impl SequenceAllocator {
  pub fn new(
    shops: Arc<dyn ShopDirectory>,
    customers: Arc<dyn CustomerDirectory>,
    counters: Arc<dyn SequenceCounterRepository>,
    format: NumberingFormat,
  ) -> Self {
    Self {
      shops,
      customers,
      counters,
      format,
    }
  }

  /// Atomically claims the next sequence for the pair and formats it.
  /// Errors other than a retryable increment conflict propagate; the
  /// caller must not assume a number was issued on failure.
  pub async fn allocate(
    &self,
    shop_id: Uuid,
    customer_id: Uuid,
  ) -> Result<(i64, DocumentNumber), BillingError> {
    let shop_code = self.shops.code_of(shop_id).await?;
    let customer_code = self.customers.code_of(customer_id).await?;

    let mut attempt = 1;
    let sequence = loop {
      match self.counters.next_value(shop_id, customer_id).await {
        Ok(value) => break value,
        Err(BillingError::ConcurrencyConflict(reason)) if attempt < MAX_INCREMENT_ATTEMPTS => {
          tracing::debug!(
            %shop_id,
            %customer_id,
            attempt,
            %reason,
            "retrying sequence increment after serialization conflict"
          );
          attempt += 1;
        }
        Err(err) => return Err(err),
      }
    };

    let number = self.format.render(&shop_code, &customer_code, sequence)?;
    tracing::info!(%shop_id, %customer_id, sequence, number = %number, "allocated document number");
    Ok((sequence, number))
  }

  /// What the next number would be, without mutating state. Display only:
  /// another allocate call can race ahead of a preview, so this is never
  /// a reservation.
  pub async fn preview(
    &self,
    shop_id: Uuid,
    customer_id: Uuid,
  ) -> Result<DocumentNumber, BillingError> {
    let shop_code = self.shops.code_of(shop_id).await?;
    let customer_code = self.customers.code_of(customer_id).await?;
    let current = self.counters.current_value(shop_id, customer_id).await?;
    Ok(self.format.render(&shop_code, &customer_code, current + 1)?)
  }

  pub fn parse(&self, raw: &str) -> Result<ParsedDocumentNumber, BillingError> {
    Ok(self.format.parse(raw)?)
  }
}
