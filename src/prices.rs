//! Prices
//!
//! Monetary amounts are held in minor units via [`rusty_money`], always with a
//! `'static` ISO currency. Arithmetic goes through the checked helpers here so
//! that overflow and currency mismatches surface as errors instead of panics.

use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

/// A monetary amount in minor units with a `'static` ISO currency.
pub type Amount = Money<'static, Currency>;

/// Errors from checked amount arithmetic.
#[derive(Debug, Error)]
pub enum AmountError {
    /// A minor-unit multiplication overflowed `i64`.
    #[error("amount arithmetic overflowed")]
    Overflow,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Calculate `price × quantity` without overflow.
///
/// # Errors
///
/// Returns [`AmountError::Overflow`] if the product does not fit in `i64`
/// minor units.
pub fn line_total(price: &Amount, quantity: u32) -> Result<Amount, AmountError> {
    let minor = price
        .to_minor_units()
        .checked_mul(i64::from(quantity))
        .ok_or(AmountError::Overflow)?;

    Ok(Money::from_minor(minor, price.currency()))
}

/// Sum a sequence of amounts, starting from zero in the given currency.
///
/// # Errors
///
/// Returns an [`AmountError`] on currency mismatch or arithmetic failure.
pub fn sum_amounts<I>(amounts: I, currency: &'static Currency) -> Result<Amount, AmountError>
where
    I: IntoIterator<Item = Amount>,
{
    let total = amounts
        .into_iter()
        .try_fold(Money::from_minor(0, currency), |acc, amount| acc.add(amount))?;

    Ok(total)
}

#[cfg(test)]
mod tests {
    use rusty_money::iso;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn line_total_multiplies_by_quantity() -> TestResult {
        let price = Money::from_minor(500, iso::INR);

        assert_eq!(line_total(&price, 3)?, Money::from_minor(1500, iso::INR));

        Ok(())
    }

    #[test]
    fn line_total_overflow_errors() {
        let price = Money::from_minor(i64::MAX, iso::INR);

        assert!(matches!(line_total(&price, 2), Err(AmountError::Overflow)));
    }

    #[test]
    fn sum_amounts_of_nothing_is_zero() -> TestResult {
        let total = sum_amounts([], iso::INR)?;

        assert_eq!(total, Money::from_minor(0, iso::INR));

        Ok(())
    }

    #[test]
    fn sum_amounts_mismatched_currency_errors() {
        let amounts = [
            Money::from_minor(100, iso::INR),
            Money::from_minor(100, iso::USD),
        ];

        assert!(matches!(
            sum_amounts(amounts, iso::INR),
            Err(AmountError::Money(_))
        ));
    }
}
