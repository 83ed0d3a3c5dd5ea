//! Billing domain errors
//!
//! Every operation returns a typed error with a stable kind; callers inspect
//! the variant, never the Display text. A failed multi-step operation leaves
//! all accounts untouched (the storage transaction rolls back on drop).

use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

use core_kernel::{CardId, FeeId, MoneyError, PortError, PropertyId, UserId};

use crate::coordinator::CallerRole;
use crate::fee::SettlementChannel;

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    /// Amount is non-positive or exceeds the configured ceiling
    #[error("Invalid amount {amount}: {reason}")]
    InvalidAmount { amount: Decimal, reason: String },

    /// A referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The fee has already been settled
    #[error("Fee already paid: {0}")]
    AlreadyPaid(FeeId),

    /// The fee's settlement channel does not permit this funding source
    #[error("Fee {fee} settles via {channel}, not from this account")]
    WrongChannel {
        fee: FeeId,
        channel: SettlementChannel,
    },

    /// The funding account balance cannot cover the amount
    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: Decimal, required: Decimal },

    /// Wallet-class arrears block this wallet-funded operation
    #[error("Locked by arrears: {reason}")]
    ArrearsLocked {
        reason: String,
        /// The property carrying the unpaid wallet-class fees, when known
        property: Option<PropertyId>,
    },

    /// The caller's role does not permit this operation
    #[error("Operation forbidden for role {role}: {reason}")]
    RoleForbidden { role: CallerRole, reason: String },

    /// The card does not belong to the paying user
    #[error("Card {card} does not belong to user {user}")]
    OwnershipMismatch { card: CardId, user: UserId },

    /// Decimal or currency fault
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Storage or collaborator failure
    #[error("Storage error: {0}")]
    Store(PortError),
}

impl BillingError {
    /// Creates a NotFound error
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        BillingError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates an InvalidAmount error
    pub fn invalid_amount(amount: Decimal, reason: impl Into<String>) -> Self {
        BillingError::InvalidAmount {
            amount,
            reason: reason.into(),
        }
    }

    /// Returns true for the NotFound kind
    pub fn is_not_found(&self) -> bool {
        matches!(self, BillingError::NotFound { .. })
    }
}

impl From<PortError> for BillingError {
    fn from(error: PortError) -> Self {
        match error {
            // A missing entity reported by a port keeps its NotFound kind
            PortError::NotFound { entity_type, id } => BillingError::NotFound {
                entity: entity_type,
                id,
            },
            other => BillingError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_port_not_found_keeps_its_kind() {
        let err: BillingError = PortError::not_found("Wallet", "WAL-1").into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_other_port_errors_map_to_store() {
        let err: BillingError = PortError::connection("lost").into();
        assert!(matches!(err, BillingError::Store(_)));
    }

    #[test]
    fn test_display_carries_reason() {
        let err = BillingError::invalid_amount(dec!(-5), "amount must be positive");
        assert!(err.to_string().contains("must be positive"));
    }
}
