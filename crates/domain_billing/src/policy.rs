//! Billing policy
//!
//! Operational limits injected into every service: the platform currency and
//! the single-operation amount ceiling (a risk-control limit inherited from
//! the payment gateway integration).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, Money, MoneyError};

use crate::error::BillingError;

/// Platform-wide billing policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BillingPolicy {
    /// Currency every account is denominated in
    pub currency: Currency,
    /// Largest amount a single operation may move
    pub ceiling: Decimal,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            currency: Currency::CNY,
            ceiling: dec!(1_000_000),
        }
    }
}

impl BillingPolicy {
    /// Validates an operation amount against currency, sign, and ceiling
    pub fn validate_amount(&self, amount: Money) -> Result<(), BillingError> {
        if amount.currency() != self.currency {
            return Err(MoneyError::CurrencyMismatch(
                amount.currency().to_string(),
                self.currency.to_string(),
            )
            .into());
        }
        if !amount.is_positive() {
            return Err(BillingError::invalid_amount(
                amount.amount(),
                "amount must be positive",
            ));
        }
        if amount.amount() > self.ceiling {
            return Err(BillingError::invalid_amount(
                amount.amount(),
                format!("amount exceeds the single-operation ceiling of {}", self.ceiling),
            ));
        }
        Ok(())
    }

    /// The platform currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Zero money in the platform currency
    pub fn zero(&self) -> Money {
        Money::zero(self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive_amounts() {
        let policy = BillingPolicy::default();
        assert!(matches!(
            policy.validate_amount(Money::new(dec!(0), Currency::CNY)),
            Err(BillingError::InvalidAmount { .. })
        ));
        assert!(matches!(
            policy.validate_amount(Money::new(dec!(-10), Currency::CNY)),
            Err(BillingError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_rejects_amounts_over_ceiling() {
        let policy = BillingPolicy::default();
        assert!(matches!(
            policy.validate_amount(Money::new(dec!(1_000_001), Currency::CNY)),
            Err(BillingError::InvalidAmount { .. })
        ));
        assert!(policy
            .validate_amount(Money::new(dec!(1_000_000), Currency::CNY))
            .is_ok());
    }

    #[test]
    fn test_rejects_foreign_currency() {
        let policy = BillingPolicy::default();
        assert!(matches!(
            policy.validate_amount(Money::new(dec!(10), Currency::USD)),
            Err(BillingError::Money(_))
        ));
    }
}
