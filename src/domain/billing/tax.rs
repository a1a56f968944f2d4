use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::BillingError;
use super::value_objects::{Quantity, TaxRate, UnitRate, round_money};

/// Levy/VAT settings resolved by the caller, either from request-supplied
/// overrides or from configuration. Passed explicitly into every compute
/// call site; there is no process-wide settings cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxDefaults {
  pub apply_ppda_levy: bool,
  pub ppda_levy_percentage: TaxRate,
  pub vat_percentage: TaxRate,
}

/// One line of quantity times rate, unrounded until summation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxableLine {
  pub quantity: Decimal,
  pub rate_per_unit: Decimal,
}

impl TaxableLine {
  pub fn new(quantity: Quantity, rate_per_unit: UnitRate) -> Self {
    Self {
      quantity: quantity.value(),
      rate_per_unit: rate_per_unit.value(),
    }
  }

  fn total(&self) -> Decimal {
    self.quantity * self.rate_per_unit
  }
}

/// The five canonical monetary totals of a commercial document.
///
/// Derivation chain, each derived field rounded exactly once:
///   gross            = round(sum of line totals)
///   ppda_levy_amount = apply_ppda ? round(gross * ppda_pct / 100) : 0
///   amount_before_vat = gross + ppda_levy_amount
///   vat_amount       = round(amount_before_vat * vat_pct / 100)
///   total_net_amount = gross + ppda_levy_amount + vat_amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
  pub gross_total_amount: Decimal,
  pub ppda_levy_amount: Decimal,
  pub amount_before_vat: Decimal,
  pub vat_amount: Decimal,
  pub total_net_amount: Decimal,
}

impl Totals {
  /// Pure computation, no I/O. The single source of truth for document
  /// arithmetic: invoice creation, invoice recomputation and quotation
  /// creation all go through here.
  pub fn compute(
    lines: &[TaxableLine],
    apply_ppda: bool,
    ppda_pct: TaxRate,
    vat_pct: TaxRate,
  ) -> Self {
    let gross = round_money(lines.iter().map(TaxableLine::total).sum());

    let ppda_levy_amount = if apply_ppda {
      round_money(gross * ppda_pct.as_multiplier())
    } else {
      Decimal::ZERO
    };

    let amount_before_vat = gross + ppda_levy_amount;
    let vat_amount = round_money(amount_before_vat * vat_pct.as_multiplier());
    let total_net_amount = gross + ppda_levy_amount + vat_amount;

    Self {
      gross_total_amount: gross,
      ppda_levy_amount,
      amount_before_vat,
      vat_amount,
      total_net_amount,
    }
  }

  pub fn zero() -> Self {
    Self {
      gross_total_amount: Decimal::ZERO,
      ppda_levy_amount: Decimal::ZERO,
      amount_before_vat: Decimal::ZERO,
      vat_amount: Decimal::ZERO,
      total_net_amount: Decimal::ZERO,
    }
  }

  /// Reconciliation check over the additive identities. A violation is
  /// never silently swallowed by callers.
  pub fn verify(&self) -> Result<(), BillingError> {
    if self.amount_before_vat != self.gross_total_amount + self.ppda_levy_amount {
      return Err(BillingError::ArithmeticInvariant(format!(
        "amount_before_vat {} != gross {} + ppda {}",
        self.amount_before_vat, self.gross_total_amount, self.ppda_levy_amount
      )));
    }
    if self.total_net_amount
      != self.gross_total_amount + self.ppda_levy_amount + self.vat_amount
    {
      return Err(BillingError::ArithmeticInvariant(format!(
        "total_net {} != gross {} + ppda {} + vat {}",
        self.total_net_amount, self.gross_total_amount, self.ppda_levy_amount, self.vat_amount
      )));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  fn line(quantity: Decimal, rate: Decimal) -> TaxableLine {
    TaxableLine {
      quantity,
      rate_per_unit: rate,
    }
  }

  #[test]
  fn test_canonical_example() {
    // 2 x 100 with 1% PPDA and 16.5% VAT
    let totals = Totals::compute(
      &[line(dec!(2), dec!(100))],
      true,
      TaxRate::new(dec!(1.0)).unwrap(),
      TaxRate::new(dec!(16.5)).unwrap(),
    );

    assert_eq!(totals.gross_total_amount, dec!(200.00));
    assert_eq!(totals.ppda_levy_amount, dec!(2.00));
    assert_eq!(totals.amount_before_vat, dec!(202.00));
    assert_eq!(totals.vat_amount, dec!(33.33));
    assert_eq!(totals.total_net_amount, dec!(235.33));
    totals.verify().unwrap();
  }

  #[test]
  fn test_ppda_not_applied() {
    let totals = Totals::compute(
      &[line(dec!(2), dec!(100))],
      false,
      TaxRate::new(dec!(1.0)).unwrap(),
      TaxRate::new(dec!(16.5)).unwrap(),
    );

    assert_eq!(totals.gross_total_amount, dec!(200.00));
    assert_eq!(totals.ppda_levy_amount, dec!(0));
    assert_eq!(totals.amount_before_vat, dec!(200.00));
    assert_eq!(totals.vat_amount, dec!(33.00));
    assert_eq!(totals.total_net_amount, dec!(233.00));
  }

  #[test]
  fn test_lines_unrounded_before_summation() {
    // 1.115 + 1.115 = 2.23; per-line rounding would give 1.12 + 1.12 = 2.24
    let totals = Totals::compute(
      &[line(dec!(1.115), dec!(1)), line(dec!(1.115), dec!(1))],
      false,
      TaxRate::zero(),
      TaxRate::zero(),
    );
    assert_eq!(totals.gross_total_amount, dec!(2.23));
  }

  #[test]
  fn test_no_cumulative_rounding() {
    // VAT is computed from the exact amount_before_vat, not from a
    // re-rounded intermediate.
    let totals = Totals::compute(
      &[line(dec!(3), dec!(33.333))],
      true,
      TaxRate::new(dec!(1.0)).unwrap(),
      TaxRate::new(dec!(16.5)).unwrap(),
    );
    // gross = round(99.999) = 100.00, ppda = 1.00, before_vat = 101.00
    assert_eq!(totals.gross_total_amount, dec!(100.00));
    assert_eq!(totals.ppda_levy_amount, dec!(1.00));
    assert_eq!(totals.amount_before_vat, dec!(101.00));
    assert_eq!(totals.vat_amount, dec!(16.67));
    assert_eq!(totals.total_net_amount, dec!(117.67));
  }

  #[test]
  fn test_empty_lines() {
    let totals = Totals::compute(
      &[],
      true,
      TaxRate::new(dec!(1.0)).unwrap(),
      TaxRate::new(dec!(16.5)).unwrap(),
    );
    assert_eq!(totals, Totals::zero());
  }

  #[test]
  fn test_verify_rejects_tampered_totals() {
    let mut totals = Totals::compute(
      &[line(dec!(2), dec!(100))],
      true,
      TaxRate::new(dec!(1.0)).unwrap(),
      TaxRate::new(dec!(16.5)).unwrap(),
    );
    totals.total_net_amount += dec!(0.01);
    assert!(matches!(
      totals.verify(),
      Err(BillingError::ArithmeticInvariant(_))
    ));
  }
}
