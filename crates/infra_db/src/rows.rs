//! Typed row structs and their conversions into domain types
//!
//! Each table maps to one `FromRow` struct; conversion into the domain type
//! is fallible and reports bad stored tokens as row-mapping errors instead
//! of panicking.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use core_kernel::{CardId, Currency, FeeId, Money, PropertyId, TransactionId, UserId, WalletId};
use domain_billing::{Fee, TransactionKind, UtilityCard, Wallet, WalletTransaction};
use domain_property::{Owner, Property};

use crate::error::DatabaseError;

fn parse_currency(token: &str) -> Result<Currency, DatabaseError> {
    token
        .parse()
        .map_err(|_| DatabaseError::RowMapping(format!("unknown currency token: {token}")))
}

/// A row of the `fees` table
#[derive(Debug, FromRow)]
pub struct FeeRow {
    pub id: Uuid,
    pub property_id: Uuid,
    pub category: String,
    pub channel: String,
    pub amount: Decimal,
    pub currency: String,
    pub paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<FeeRow> for Fee {
    type Error = DatabaseError;

    fn try_from(row: FeeRow) -> Result<Self, Self::Error> {
        let category = row
            .category
            .parse()
            .map_err(DatabaseError::RowMapping)?;
        let channel = row
            .channel
            .parse()
            .map_err(DatabaseError::RowMapping)?;
        let currency = parse_currency(&row.currency)?;

        Ok(Fee::from_parts(
            FeeId::from_uuid(row.id),
            PropertyId::from_uuid(row.property_id),
            category,
            channel,
            Money::new(row.amount, currency),
            row.paid,
            row.paid_at,
            row.created_at,
        ))
    }
}

/// A row of the `wallets` table
#[derive(Debug, FromRow)]
pub struct WalletRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: Decimal,
    pub total_recharged: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<WalletRow> for Wallet {
    type Error = DatabaseError;

    fn try_from(row: WalletRow) -> Result<Self, Self::Error> {
        let currency = parse_currency(&row.currency)?;
        Ok(Wallet::from_parts(
            WalletId::from_uuid(row.id),
            UserId::from_uuid(row.user_id),
            Money::new(row.balance, currency),
            Money::new(row.total_recharged, currency),
            row.created_at,
            row.updated_at,
        ))
    }
}

/// A row of the `utility_cards` table
#[derive(Debug, FromRow)]
pub struct CardRow {
    pub id: Uuid,
    pub property_id: Uuid,
    pub card_type: String,
    pub balance: Decimal,
    pub currency: String,
    pub last_topup: Option<DateTime<Utc>>,
}

impl TryFrom<CardRow> for UtilityCard {
    type Error = DatabaseError;

    fn try_from(row: CardRow) -> Result<Self, Self::Error> {
        let card_type = row
            .card_type
            .parse()
            .map_err(DatabaseError::RowMapping)?;
        let currency = parse_currency(&row.currency)?;
        Ok(UtilityCard::from_parts(
            CardId::from_uuid(row.id),
            PropertyId::from_uuid(row.property_id),
            card_type,
            Money::new(row.balance, currency),
            row.last_topup,
        ))
    }
}

/// A row of the `wallet_transactions` table
#[derive(Debug, FromRow)]
pub struct TransactionRow {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub kind: String,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub currency: String,
    pub related_id: Option<Uuid>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for WalletTransaction {
    type Error = DatabaseError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let kind: TransactionKind = row.kind.parse().map_err(DatabaseError::RowMapping)?;
        let currency = parse_currency(&row.currency)?;
        Ok(WalletTransaction {
            id: TransactionId::from_uuid(row.id),
            wallet_id: WalletId::from_uuid(row.wallet_id),
            kind,
            amount: Money::new(row.amount, currency),
            balance_after: Money::new(row.balance_after, currency),
            related_id: row.related_id,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

/// A row of the `properties` table
#[derive(Debug, FromRow)]
pub struct PropertyRow {
    pub id: Uuid,
    pub owner_id: Option<Uuid>,
    pub building_no: String,
    pub unit_no: String,
    pub room_no: String,
}

impl From<PropertyRow> for Property {
    fn from(row: PropertyRow) -> Self {
        Property::new(
            PropertyId::from_uuid(row.id),
            row.owner_id.map(UserId::from_uuid),
            row.building_no,
            row.unit_no,
            row.room_no,
        )
    }
}

/// A row of the `users` table
#[derive(Debug, FromRow)]
pub struct OwnerRow {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
}

impl From<OwnerRow> for Owner {
    fn from(row: OwnerRow) -> Self {
        Owner::new(UserId::from_uuid(row.id), row.name, row.phone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fee_row_maps_tokens() {
        let row = FeeRow {
            id: Uuid::new_v4(),
            property_id: Uuid::new_v4(),
            category: "WATER".into(),
            channel: "WATER_CARD".into(),
            amount: dec!(35.20),
            currency: "CNY".into(),
            paid: false,
            paid_at: None,
            created_at: Utc::now(),
        };
        let fee = Fee::try_from(row).unwrap();
        assert_eq!(fee.category().as_str(), "WATER");
        assert_eq!(fee.amount().amount(), dec!(35.20));
    }

    #[test]
    fn test_bad_token_is_a_row_mapping_error() {
        let row = FeeRow {
            id: Uuid::new_v4(),
            property_id: Uuid::new_v4(),
            category: "GAS".into(),
            channel: "WALLET".into(),
            amount: dec!(1),
            currency: "CNY".into(),
            paid: false,
            paid_at: None,
            created_at: Utc::now(),
        };
        assert!(matches!(
            Fee::try_from(row),
            Err(DatabaseError::RowMapping(_))
        ));
    }
}
