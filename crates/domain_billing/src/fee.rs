//! Fee bills and the fee ledger
//!
//! A fee is a bill owned by exactly one property. Its category fixes the
//! settlement channel at creation: property and heating fees settle from the
//! owner's wallet, water and electricity fees settle from the matching
//! utility card. A fee transitions unpaid → paid exactly once and is never
//! reversed.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use core_kernel::{FeeId, Money, PropertyId};
use domain_property::PropertyDirectory;

use crate::card::CardType;
use crate::error::BillingError;
use crate::policy::BillingPolicy;
use crate::ports::{BillingStore, BillingTx};

/// Category of a fee bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeeCategory {
    Property,
    Heating,
    Water,
    Electricity,
}

impl FeeCategory {
    /// The funding pool that may legally retire a fee of this category
    pub fn settlement_channel(&self) -> SettlementChannel {
        match self {
            FeeCategory::Water => SettlementChannel::WaterCard,
            FeeCategory::Electricity => SettlementChannel::ElecCard,
            FeeCategory::Property | FeeCategory::Heating => SettlementChannel::Wallet,
        }
    }

    /// Stable storage/display token
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeCategory::Property => "PROPERTY",
            FeeCategory::Heating => "HEATING",
            FeeCategory::Water => "WATER",
            FeeCategory::Electricity => "ELECTRICITY",
        }
    }
}

impl fmt::Display for FeeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FeeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROPERTY" => Ok(FeeCategory::Property),
            "HEATING" => Ok(FeeCategory::Heating),
            "WATER" => Ok(FeeCategory::Water),
            "ELECTRICITY" => Ok(FeeCategory::Electricity),
            other => Err(format!("unknown fee category: {other}")),
        }
    }
}

/// The funding pool a fee settles from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementChannel {
    Wallet,
    WaterCard,
    ElecCard,
}

impl SettlementChannel {
    /// The utility-card type this channel debits, if it is card-settled
    pub fn card_type(&self) -> Option<CardType> {
        match self {
            SettlementChannel::WaterCard => Some(CardType::Water),
            SettlementChannel::ElecCard => Some(CardType::Electricity),
            SettlementChannel::Wallet => None,
        }
    }

    /// Stable storage/display token
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementChannel::Wallet => "WALLET",
            SettlementChannel::WaterCard => "WATER_CARD",
            SettlementChannel::ElecCard => "ELEC_CARD",
        }
    }
}

impl fmt::Display for SettlementChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SettlementChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WALLET" => Ok(SettlementChannel::Wallet),
            "WATER_CARD" => Ok(SettlementChannel::WaterCard),
            "ELEC_CARD" => Ok(SettlementChannel::ElecCard),
            other => Err(format!("unknown settlement channel: {other}")),
        }
    }
}

/// A fee bill
///
/// # Invariants
///
/// - `amount` is strictly positive
/// - the settlement channel is derived from the category at creation and
///   never changes
/// - `paid == true` ⇔ `paid_at.is_some()`, set exactly once
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fee {
    id: FeeId,
    property_id: PropertyId,
    category: FeeCategory,
    channel: SettlementChannel,
    amount: Money,
    paid: bool,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl Fee {
    /// Creates an unpaid fee, deriving the settlement channel from the category
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for a non-positive amount.
    pub fn new(
        property_id: PropertyId,
        category: FeeCategory,
        amount: Money,
    ) -> Result<Self, BillingError> {
        if !amount.is_positive() {
            return Err(BillingError::invalid_amount(
                amount.amount(),
                "fee amount must be positive",
            ));
        }
        Ok(Self {
            id: FeeId::new_v7(),
            property_id,
            category,
            channel: category.settlement_channel(),
            amount,
            paid: false,
            paid_at: None,
            created_at: Utc::now(),
        })
    }

    /// Rehydrates a fee from storage; storage adapters only
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: FeeId,
        property_id: PropertyId,
        category: FeeCategory,
        channel: SettlementChannel,
        amount: Money,
        paid: bool,
        paid_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            property_id,
            category,
            channel,
            amount,
            paid,
            paid_at,
            created_at,
        }
    }

    pub fn id(&self) -> FeeId {
        self.id
    }

    pub fn property_id(&self) -> PropertyId {
        self.property_id
    }

    pub fn category(&self) -> FeeCategory {
        self.category
    }

    pub fn channel(&self) -> SettlementChannel {
        self.channel
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn is_paid(&self) -> bool {
        self.paid
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Transitions the fee unpaid → paid, stamping the payment time
    ///
    /// # Errors
    ///
    /// Returns `AlreadyPaid` if the fee is already settled; the payment
    /// timestamp is never overwritten.
    pub fn settle(&mut self) -> Result<(), BillingError> {
        if self.paid {
            return Err(BillingError::AlreadyPaid(self.id));
        }
        self.paid = true;
        self.paid_at = Some(Utc::now());
        Ok(())
    }
}

/// One row of the operator arrears report: an unpaid fee denormalized with
/// property location and owner contact details
#[derive(Debug, Clone, Serialize)]
pub struct ArrearsRecord {
    pub fee_id: FeeId,
    pub property_id: PropertyId,
    pub category: FeeCategory,
    pub channel: SettlementChannel,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
    pub building_no: Option<String>,
    pub unit_no: Option<String>,
    pub room_no: Option<String>,
    pub owner_name: Option<String>,
    pub owner_phone: Option<String>,
}

/// Bill lifecycle and arrears classification
///
/// The fee ledger creates bills, settles them exactly once, and answers the
/// arrears predicates the payment coordinator gates on.
pub struct FeeLedger<S: BillingStore> {
    store: S,
    directory: Arc<dyn PropertyDirectory>,
    policy: BillingPolicy,
}

impl<S: BillingStore> FeeLedger<S> {
    /// Creates a fee ledger over the given store and property directory
    pub fn new(store: S, directory: Arc<dyn PropertyDirectory>, policy: BillingPolicy) -> Self {
        Self {
            store,
            directory,
            policy,
        }
    }

    /// Creates a single unpaid fee for a property
    pub async fn create_fee(
        &self,
        property_id: PropertyId,
        category: FeeCategory,
        amount: Money,
    ) -> Result<FeeId, BillingError> {
        self.policy.validate_amount(amount)?;
        self.directory.find_property(property_id).await?;

        let fee = Fee::new(property_id, category, amount)?;
        let mut tx = self.store.begin().await?;
        tx.insert_fee(&fee).await?;
        tx.commit().await?;

        info!(fee = %fee.id(), property = %property_id, %category, "fee created");
        Ok(fee.id())
    }

    /// Creates the same fee for every listed property, all-or-nothing
    ///
    /// Either a fee is inserted for every property and the exact count is
    /// returned, or no fee is inserted at all.
    pub async fn batch_create_fees(
        &self,
        property_ids: &[PropertyId],
        category: FeeCategory,
        amount: Money,
    ) -> Result<usize, BillingError> {
        self.policy.validate_amount(amount)?;
        for property_id in property_ids {
            self.directory.find_property(*property_id).await?;
        }

        let mut tx = self.store.begin().await?;
        for property_id in property_ids {
            let fee = Fee::new(*property_id, category, amount)?;
            tx.insert_fee(&fee).await?;
        }
        tx.commit().await?;

        info!(count = property_ids.len(), %category, "fee batch created");
        Ok(property_ids.len())
    }

    /// Marks a fee as paid without moving money
    ///
    /// Returns `Ok(true)` when the unpaid → paid transition happened, and
    /// `Ok(false)` as an idempotent no-op when the fee was already settled.
    pub async fn mark_paid(&self, fee_id: FeeId) -> Result<bool, BillingError> {
        let mut tx = self.store.begin().await?;
        let mut fee = tx
            .lock_fee(fee_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Fee", fee_id))?;

        if fee.is_paid() {
            return Ok(false);
        }

        fee.settle()?;
        tx.update_fee(&fee).await?;
        tx.commit().await?;

        info!(fee = %fee_id, "fee marked paid");
        Ok(true)
    }

    /// True iff the property has at least one unpaid fee of any channel
    pub async fn is_property_arrears(&self, property_id: PropertyId) -> Result<bool, BillingError> {
        let unpaid = self.store.unpaid_fees_for_property(property_id).await?;
        Ok(!unpaid.is_empty())
    }

    /// True iff the property has at least one unpaid wallet-channel fee
    ///
    /// This is the arrears-gate predicate: water/electricity bills settled
    /// from cards never trip it.
    pub async fn is_property_wallet_arrears(
        &self,
        property_id: PropertyId,
    ) -> Result<bool, BillingError> {
        let unpaid = self.store.unpaid_fees_for_property(property_id).await?;
        Ok(unpaid
            .iter()
            .any(|f| f.channel() == SettlementChannel::Wallet))
    }

    /// Unpaid fees on a property, oldest first
    pub async fn unpaid_fees(&self, property_id: PropertyId) -> Result<Vec<Fee>, BillingError> {
        Ok(self.store.unpaid_fees_for_property(property_id).await?)
    }

    /// Denormalized report of every unpaid fee for operator review
    ///
    /// Missing property or owner records leave the location/contact fields
    /// empty instead of failing the report.
    pub async fn arrears_report(&self) -> Result<Vec<ArrearsRecord>, BillingError> {
        let unpaid = self.store.unpaid_fees().await?;
        let mut report = Vec::with_capacity(unpaid.len());

        for fee in unpaid {
            let mut record = ArrearsRecord {
                fee_id: fee.id(),
                property_id: fee.property_id(),
                category: fee.category(),
                channel: fee.channel(),
                amount: fee.amount(),
                created_at: fee.created_at(),
                building_no: None,
                unit_no: None,
                room_no: None,
                owner_name: None,
                owner_phone: None,
            };

            match self.directory.find_property(fee.property_id()).await {
                Ok(property) => {
                    record.building_no = Some(property.building_no.clone());
                    record.unit_no = Some(property.unit_no.clone());
                    record.room_no = Some(property.room_no.clone());

                    if let Some(owner_id) = property.owner_id {
                        match self.directory.find_owner(owner_id).await {
                            Ok(owner) => {
                                record.owner_name = Some(owner.name);
                                record.owner_phone = Some(owner.phone);
                            }
                            Err(e) if e.is_not_found() => {}
                            Err(e) => return Err(e.into()),
                        }
                    }
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }

            report.push(record);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn cny(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::CNY)
    }

    #[test]
    fn test_channel_derivation() {
        assert_eq!(
            FeeCategory::Property.settlement_channel(),
            SettlementChannel::Wallet
        );
        assert_eq!(
            FeeCategory::Heating.settlement_channel(),
            SettlementChannel::Wallet
        );
        assert_eq!(
            FeeCategory::Water.settlement_channel(),
            SettlementChannel::WaterCard
        );
        assert_eq!(
            FeeCategory::Electricity.settlement_channel(),
            SettlementChannel::ElecCard
        );
    }

    #[test]
    fn test_fee_rejects_non_positive_amount() {
        let result = Fee::new(PropertyId::new(), FeeCategory::Property, cny(dec!(0)));
        assert!(matches!(result, Err(BillingError::InvalidAmount { .. })));

        let result = Fee::new(PropertyId::new(), FeeCategory::Property, cny(dec!(-1)));
        assert!(matches!(result, Err(BillingError::InvalidAmount { .. })));
    }

    #[test]
    fn test_settle_sets_timestamp_exactly_once() {
        let mut fee = Fee::new(PropertyId::new(), FeeCategory::Heating, cny(dec!(50))).unwrap();
        assert!(!fee.is_paid());
        assert!(fee.paid_at().is_none());

        fee.settle().unwrap();
        assert!(fee.is_paid());
        let first_paid_at = fee.paid_at().unwrap();

        let result = fee.settle();
        assert!(matches!(result, Err(BillingError::AlreadyPaid(_))));
        assert_eq!(fee.paid_at().unwrap(), first_paid_at);
    }

    #[test]
    fn test_category_tokens_round_trip() {
        for category in [
            FeeCategory::Property,
            FeeCategory::Heating,
            FeeCategory::Water,
            FeeCategory::Electricity,
        ] {
            let parsed: FeeCategory = category.as_str().parse().unwrap();
            assert_eq!(parsed, category);
        }
        assert!("GAS".parse::<FeeCategory>().is_err());
    }

    #[test]
    fn test_channel_card_types() {
        assert_eq!(SettlementChannel::WaterCard.card_type(), Some(CardType::Water));
        assert_eq!(
            SettlementChannel::ElecCard.card_type(),
            Some(CardType::Electricity)
        );
        assert_eq!(SettlementChannel::Wallet.card_type(), None);
    }
}
