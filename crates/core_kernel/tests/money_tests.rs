//! Integration tests for the money types

use core_kernel::{Currency, Money, MoneyError};
use rust_decimal_macros::dec;

#[test]
fn test_rounding_to_currency_precision() {
    let m = Money::new(dec!(10.0051), Currency::CNY);
    // Internal precision keeps 4 decimal places
    assert_eq!(m.amount(), dec!(10.0051));
    // Currency precision rounds to 2
    assert_eq!(m.round_to_currency().amount(), dec!(10.01));
}

#[test]
fn test_rounding_midpoint_goes_to_even() {
    // banker's rounding: exact midpoints round to the even neighbor
    let m = Money::new(dec!(10.005), Currency::CNY);
    assert_eq!(m.round_to_currency().amount(), dec!(10.00));

    let m = Money::new(dec!(10.015), Currency::CNY);
    assert_eq!(m.round_to_currency().amount(), dec!(10.02));
}

#[test]
fn test_display_uses_currency_symbol() {
    let m = Money::new(dec!(1234.5), Currency::CNY);
    assert_eq!(m.to_string(), "¥ 1234.50");

    let m = Money::new(dec!(0.5), Currency::USD);
    assert_eq!(m.to_string(), "$ 0.50");
}

#[test]
fn test_checked_sub_can_go_negative() {
    // The money type itself allows negatives; balance floors are a domain rule
    let a = Money::new(dec!(10), Currency::CNY);
    let b = Money::new(dec!(25), Currency::CNY);
    let diff = a.checked_sub(&b).unwrap();
    assert!(diff.is_negative());
    assert_eq!(diff.amount(), dec!(-15));
}

#[test]
fn test_cross_currency_subtraction_rejected() {
    let a = Money::new(dec!(10), Currency::CNY);
    let b = Money::new(dec!(10), Currency::EUR);
    assert!(matches!(
        a.checked_sub(&b),
        Err(MoneyError::CurrencyMismatch(_, _))
    ));
}

#[test]
fn test_zero_round_trip_through_minor_units() {
    let z = Money::zero(Currency::CNY);
    assert_eq!(z, Money::from_minor(0, Currency::CNY));
}
