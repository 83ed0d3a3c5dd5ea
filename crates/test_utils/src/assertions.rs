//! Custom test assertions
//!
//! Assertion helpers for money values that give more meaningful failure
//! messages than standard assertions.

use rust_decimal::Decimal;

use core_kernel::Money;

/// Asserts that a money value has exactly the expected decimal amount
///
/// # Panics
///
/// Panics with both values in the message when the amounts differ.
pub fn assert_money_eq(actual: Money, expected: Decimal) {
    assert_eq!(
        actual.amount(),
        expected,
        "Money amount mismatch: actual={}, expected={}",
        actual.amount(),
        expected
    );
}

/// Asserts that a money value is strictly positive
pub fn assert_money_positive(money: Money) {
    assert!(
        money.is_positive(),
        "Expected positive money, got {} {}",
        money.currency().symbol(),
        money.amount()
    );
}

/// Asserts that a money value is exactly zero
pub fn assert_money_zero(money: Money) {
    assert!(
        money.is_zero(),
        "Expected zero money, got {} {}",
        money.currency().symbol(),
        money.amount()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::cny;
    use rust_decimal_macros::dec;

    #[test]
    fn test_assert_money_eq_passes_on_equal_amounts() {
        assert_money_eq(cny(dec!(10.50)), dec!(10.50));
    }

    #[test]
    #[should_panic(expected = "Money amount mismatch")]
    fn test_assert_money_eq_panics_on_mismatch() {
        assert_money_eq(cny(dec!(10.50)), dec!(10.51));
    }
}
