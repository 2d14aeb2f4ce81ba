//! Pricing
//!
//! Pure derivation of checkout totals from a cart subtotal: shipping is free
//! above a threshold and a flat fee below it, tax is a single percentage
//! applied once to the subtotal (not per line, which would accumulate rounding
//! drift), and the grand total is the sum of the three.
//!
//! A subtotal of zero still pays the flat shipping fee. Checkout is never
//! reachable with an empty cart; [`crate::checkout`] guards that precondition
//! before a quote is computed.

use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::Money;
use thiserror::Error;

use crate::prices::{Amount, AmountError};

/// Errors that can occur while deriving a pricing quote.
#[derive(Debug, Error)]
pub enum PricingError {
    /// The tax calculation could not be safely represented in minor units.
    #[error("tax conversion overflowed or was not finite")]
    TaxConversion,

    /// Wrapped amount arithmetic error.
    #[error(transparent)]
    Amount(#[from] AmountError),
}

/// Shipping and tax parameters for a storefront.
///
/// Thresholds and fees are in minor units so a single policy applies to any
/// currency the cart happens to use.
#[derive(Debug, Clone)]
pub struct PricingPolicy {
    /// Orders at or above this subtotal ship free.
    pub free_shipping_threshold: i64,

    /// Flat shipping fee charged below the threshold.
    pub flat_shipping_fee: i64,

    /// Tax rate applied once to the subtotal.
    pub tax_rate: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        PricingPolicy {
            free_shipping_threshold: 999,
            flat_shipping_fee: 99,
            tax_rate: Decimal::new(18, 2),
        }
    }
}

/// Totals derived from a cart subtotal at checkout time.
///
/// The invariant `total = subtotal + shipping_cost + tax` holds by
/// construction and the quote is never recomputed once an order is persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingQuote {
    /// Sum of line totals before shipping and tax
    pub subtotal: Amount,

    /// Shipping charge
    pub shipping_cost: Amount,

    /// Tax on the subtotal
    pub tax: Amount,

    /// Grand total
    pub total: Amount,
}

impl PricingPolicy {
    /// Shipping cost for a subtotal: zero at or above the free-shipping
    /// threshold, the flat fee below it.
    pub fn shipping_cost(&self, subtotal: &Amount) -> Amount {
        let minor = if subtotal.to_minor_units() >= self.free_shipping_threshold {
            0
        } else {
            self.flat_shipping_fee
        };

        Money::from_minor(minor, subtotal.currency())
    }

    /// Tax on a subtotal, rounded half-up to the nearest minor unit.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::TaxConversion`] if the scaled value cannot be
    /// represented in `i64` minor units.
    pub fn tax(&self, subtotal: &Amount) -> Result<Amount, PricingError> {
        let Some(minor) = Decimal::from_i64(subtotal.to_minor_units()) else {
            unreachable!("always returns `Some` for every `i64`")
        };

        let Some(applied) = self.tax_rate.checked_mul(minor) else {
            return Err(PricingError::TaxConversion);
        };

        let rounded = applied.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        let Some(rounded) = rounded.to_i64() else {
            return Err(PricingError::TaxConversion);
        };

        Ok(Money::from_minor(rounded, subtotal.currency()))
    }

    /// Derive the full quote for a subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the tax conversion fails or the final
    /// addition overflows.
    pub fn quote(&self, subtotal: Amount) -> Result<PricingQuote, PricingError> {
        let shipping_cost = self.shipping_cost(&subtotal);
        let tax = self.tax(&subtotal)?;

        let total = subtotal
            .add(shipping_cost)
            .and_then(|sum| sum.add(tax))
            .map_err(AmountError::from)?;

        Ok(PricingQuote {
            subtotal,
            shipping_cost,
            tax,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso;
    use testresult::TestResult;

    use super::*;

    fn inr(minor: i64) -> Amount {
        Money::from_minor(minor, iso::INR)
    }

    #[test]
    fn shipping_free_at_threshold() {
        let policy = PricingPolicy::default();

        assert_eq!(policy.shipping_cost(&inr(999)), inr(0));
        assert_eq!(policy.shipping_cost(&inr(1500)), inr(0));
    }

    #[test]
    fn shipping_flat_fee_below_threshold() {
        let policy = PricingPolicy::default();

        assert_eq!(policy.shipping_cost(&inr(998)), inr(99));
        assert_eq!(policy.shipping_cost(&inr(0)), inr(99));
    }

    #[test]
    fn tax_is_eighteen_percent_rounded() -> TestResult {
        let policy = PricingPolicy::default();

        assert_eq!(policy.tax(&inr(1000))?, inr(180));
        assert_eq!(policy.tax(&inr(1050))?, inr(189));

        Ok(())
    }

    #[test]
    fn tax_rounds_half_up() -> TestResult {
        // 25 × 0.18 = 4.5, which rounds away from zero to 5.
        let policy = PricingPolicy::default();

        assert_eq!(policy.tax(&inr(25))?, inr(5));

        Ok(())
    }

    #[test]
    fn quote_total_is_sum_of_parts() -> TestResult {
        let policy = PricingPolicy::default();

        let quote = policy.quote(inr(1300))?;

        assert_eq!(quote.subtotal, inr(1300));
        assert_eq!(quote.shipping_cost, inr(0));
        assert_eq!(quote.tax, inr(234));
        assert_eq!(quote.total, inr(1534));

        Ok(())
    }

    #[test]
    fn quote_below_threshold_charges_shipping() -> TestResult {
        let policy = PricingPolicy::default();

        let quote = policy.quote(inr(500))?;

        assert_eq!(quote.shipping_cost, inr(99));
        assert_eq!(quote.tax, inr(90));
        assert_eq!(quote.total, inr(689));

        Ok(())
    }
}
