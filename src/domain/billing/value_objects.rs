use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueObjectError {
  #[error("Invalid shop code: {0}")]
  InvalidShopCode(String),
  #[error("Invalid customer code: {0}")]
  InvalidCustomerCode(String),
  #[error("Invalid document number: {0}")]
  InvalidDocumentNumber(String),
  #[error("Invalid item description: {0}")]
  InvalidDescription(String),
  #[error("Invalid quantity: {0}")]
  InvalidQuantity(String),
  #[error("Invalid rate: {0}")]
  InvalidRate(String),
  #[error("Invalid tax rate: {0}")]
  InvalidTaxRate(String),
  #[error("Invalid invoice status: {0}")]
  InvalidStatus(String),
  #[error("Invalid payment method: {0}")]
  InvalidPaymentMethod(String),
}

/// Monetary amounts are reported to two decimal places, rounding halves
/// away from zero. Applied once per derived field, never cumulatively.
pub fn round_money(amount: Decimal) -> Decimal {
  amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Float-tolerance band for paid/outstanding comparisons.
pub fn money_tolerance() -> Decimal {
  Decimal::new(5, 3) // 0.005
}

// Shop Code - unique short identifier, part of the document number grammar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopCode(String);

impl ShopCode {
  pub fn new(value: String) -> Result<Self, ValueObjectError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
      return Err(ValueObjectError::InvalidShopCode(
        "Shop code cannot be empty".to_string(),
      ));
    }
    if trimmed.len() > 20 {
      return Err(ValueObjectError::InvalidShopCode(
        "Shop code cannot exceed 20 characters".to_string(),
      ));
    }
    // Codes stay alphanumeric so the document number grammar is unambiguous
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
      return Err(ValueObjectError::InvalidShopCode(
        "Shop code must be alphanumeric".to_string(),
      ));
    }
    Ok(Self(trimmed.to_uppercase()))
  }

  pub fn value(&self) -> &str {
    &self.0
  }

  pub fn into_inner(self) -> String {
    self.0
  }
}

impl fmt::Display for ShopCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// Customer Code - same grammar constraints as ShopCode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerCode(String);

impl CustomerCode {
  pub fn new(value: String) -> Result<Self, ValueObjectError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
      return Err(ValueObjectError::InvalidCustomerCode(
        "Customer code cannot be empty".to_string(),
      ));
    }
    if trimmed.len() > 20 {
      return Err(ValueObjectError::InvalidCustomerCode(
        "Customer code cannot exceed 20 characters".to_string(),
      ));
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
      return Err(ValueObjectError::InvalidCustomerCode(
        "Customer code must be alphanumeric".to_string(),
      ));
    }
    Ok(Self(trimmed.to_uppercase()))
  }

  pub fn value(&self) -> &str {
    &self.0
  }

  pub fn into_inner(self) -> String {
    self.0
  }
}

impl fmt::Display for CustomerCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// Document Number - formatted by the allocator, stored verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentNumber(String);

impl DocumentNumber {
  pub fn new(value: String) -> Result<Self, ValueObjectError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
      return Err(ValueObjectError::InvalidDocumentNumber(
        "Document number cannot be empty".to_string(),
      ));
    }
    if trimmed.len() > 100 {
      return Err(ValueObjectError::InvalidDocumentNumber(
        "Document number cannot exceed 100 characters".to_string(),
      ));
    }
    Ok(Self(trimmed.to_string()))
  }

  pub fn value(&self) -> &str {
    &self.0
  }

  pub fn into_inner(self) -> String {
    self.0
  }
}

impl fmt::Display for DocumentNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// Invoice Status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
  Draft,
  Sent,
  Paid,
  PartiallyPaid,
  Overdue,
  Cancelled,
  Void,
}

impl InvoiceStatus {
  pub fn can_transition_to(&self, new_status: InvoiceStatus) -> bool {
    use InvoiceStatus::*;
    match (self, new_status) {
      // Draft is either sent out or abandoned
      (Draft, Sent | Cancelled) => true,
      // Sent moves with payment activity, the overdue sweep, or closure
      (Sent, Paid | PartiallyPaid | Overdue | Cancelled | Void) => true,
      // The settlement states move among themselves and close out
      (Paid, PartiallyPaid | Overdue | Cancelled | Void) => true,
      (PartiallyPaid, Paid | Overdue | Cancelled | Void) => true,
      (Overdue, Paid | PartiallyPaid | Cancelled | Void) => true,
      // Cancelled and Void are terminal
      _ => false,
    }
  }

  /// Terminal states reject every further mutation: status, payments, items.
  pub fn is_terminal(&self) -> bool {
    matches!(self, InvoiceStatus::Cancelled | InvoiceStatus::Void)
  }

  pub fn is_editable(&self) -> bool {
    matches!(self, InvoiceStatus::Draft)
  }

  /// Statuses whose invoices contribute to customer balances.
  pub fn affects_balance(&self) -> bool {
    matches!(
      self,
      InvoiceStatus::Sent
        | InvoiceStatus::Paid
        | InvoiceStatus::PartiallyPaid
        | InvoiceStatus::Overdue
    )
  }

  /// Entering one of these statuses deducts stock for stockable items.
  pub fn triggers_stock_deduction(&self) -> bool {
    matches!(
      self,
      InvoiceStatus::Sent | InvoiceStatus::Paid | InvoiceStatus::PartiallyPaid
    )
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      InvoiceStatus::Draft => "draft",
      InvoiceStatus::Sent => "sent",
      InvoiceStatus::Paid => "paid",
      InvoiceStatus::PartiallyPaid => "partially_paid",
      InvoiceStatus::Overdue => "overdue",
      InvoiceStatus::Cancelled => "cancelled",
      InvoiceStatus::Void => "void",
    }
  }
}

impl FromStr for InvoiceStatus {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "draft" => Ok(InvoiceStatus::Draft),
      "sent" => Ok(InvoiceStatus::Sent),
      "paid" => Ok(InvoiceStatus::Paid),
      "partially_paid" => Ok(InvoiceStatus::PartiallyPaid),
      "overdue" => Ok(InvoiceStatus::Overdue),
      "cancelled" => Ok(InvoiceStatus::Cancelled),
      "void" => Ok(InvoiceStatus::Void),
      _ => Err(ValueObjectError::InvalidStatus(format!(
        "Unknown status: {}",
        s
      ))),
    }
  }
}

impl fmt::Display for InvoiceStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

// Payment Method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
  Cash,
  BankTransfer,
  MobileMoney,
  Cheque,
}

impl PaymentMethod {
  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentMethod::Cash => "cash",
      PaymentMethod::BankTransfer => "bank_transfer",
      PaymentMethod::MobileMoney => "mobile_money",
      PaymentMethod::Cheque => "cheque",
    }
  }
}

impl FromStr for PaymentMethod {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "cash" => Ok(PaymentMethod::Cash),
      "bank_transfer" => Ok(PaymentMethod::BankTransfer),
      "mobile_money" => Ok(PaymentMethod::MobileMoney),
      "cheque" => Ok(PaymentMethod::Cheque),
      _ => Err(ValueObjectError::InvalidPaymentMethod(format!(
        "Unknown payment method: {}",
        s
      ))),
    }
  }
}

impl fmt::Display for PaymentMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

// Item Description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDescription(String);

impl ItemDescription {
  pub fn new(value: String) -> Result<Self, ValueObjectError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
      return Err(ValueObjectError::InvalidDescription(
        "Description cannot be empty".to_string(),
      ));
    }
    if trimmed.len() > 500 {
      return Err(ValueObjectError::InvalidDescription(
        "Description cannot exceed 500 characters".to_string(),
      ));
    }
    Ok(Self(trimmed.to_string()))
  }

  pub fn value(&self) -> &str {
    &self.0
  }
}

// Quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity(Decimal);

impl Quantity {
  pub fn new(value: Decimal) -> Result<Self, ValueObjectError> {
    if value <= Decimal::ZERO {
      return Err(ValueObjectError::InvalidQuantity(
        "Quantity must be positive".to_string(),
      ));
    }
    // Max 4 decimal places
    if value.scale() > 4 {
      return Err(ValueObjectError::InvalidQuantity(
        "Quantity cannot have more than 4 decimal places".to_string(),
      ));
    }
    Ok(Self(value))
  }

  pub fn value(&self) -> Decimal {
    self.0
  }
}

// Unit Rate - price per unit of measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRate(Decimal);

impl UnitRate {
  pub fn new(value: Decimal) -> Result<Self, ValueObjectError> {
    if value.is_sign_negative() {
      return Err(ValueObjectError::InvalidRate(
        "Rate cannot be negative".to_string(),
      ));
    }
    if value.scale() > 4 {
      return Err(ValueObjectError::InvalidRate(
        "Rate cannot have more than 4 decimal places".to_string(),
      ));
    }
    Ok(Self(value))
  }

  pub fn value(&self) -> Decimal {
    self.0
  }
}

// Tax Rate - percentage used for both the PPDA levy and VAT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(Decimal);

impl TaxRate {
  pub fn new(value: Decimal) -> Result<Self, ValueObjectError> {
    if value < Decimal::ZERO || value > Decimal::from(100) {
      return Err(ValueObjectError::InvalidTaxRate(
        "Tax rate must be between 0 and 100".to_string(),
      ));
    }
    if value.scale() > 3 {
      return Err(ValueObjectError::InvalidTaxRate(
        "Tax rate cannot have more than 3 decimal places".to_string(),
      ));
    }
    Ok(Self(value))
  }

  pub fn zero() -> Self {
    Self(Decimal::ZERO)
  }

  pub fn value(&self) -> Decimal {
    self.0
  }

  pub fn as_multiplier(&self) -> Decimal {
    self.0 / Decimal::from(100)
  }
}

impl fmt::Display for TaxRate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}%", self.0)
  }
}
