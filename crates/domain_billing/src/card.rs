//! Utility cards and the card account service
//!
//! Each property carries one water card and one electricity card. Card
//! balances are prepaid pools that settle water and electricity fees; card
//! movements never touch the wallet ledger.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use core_kernel::{CardId, Currency, Money, PropertyId, UserId};
use domain_property::PropertyDirectory;

use crate::error::BillingError;
use crate::policy::BillingPolicy;
use crate::ports::{BillingStore, BillingTx};

/// The two utility-card kinds a property holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardType {
    Water,
    Electricity,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Water => "WATER",
            CardType::Electricity => "ELECTRICITY",
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CardType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WATER" => Ok(CardType::Water),
            "ELECTRICITY" => Ok(CardType::Electricity),
            other => Err(format!("unknown card type: {other}")),
        }
    }
}

/// A prepaid utility card bound to one property
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtilityCard {
    id: CardId,
    property_id: PropertyId,
    card_type: CardType,
    balance: Money,
    last_topup: Option<DateTime<Utc>>,
}

impl UtilityCard {
    /// Issues an empty card for a property
    pub fn issue(property_id: PropertyId, card_type: CardType, currency: Currency) -> Self {
        Self {
            id: CardId::new_v7(),
            property_id,
            card_type,
            balance: Money::zero(currency),
            last_topup: None,
        }
    }

    /// Rehydrates a card from storage; storage adapters only
    pub fn from_parts(
        id: CardId,
        property_id: PropertyId,
        card_type: CardType,
        balance: Money,
        last_topup: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            property_id,
            card_type,
            balance,
            last_topup,
        }
    }

    pub fn id(&self) -> CardId {
        self.id
    }

    pub fn property_id(&self) -> PropertyId {
        self.property_id
    }

    pub fn card_type(&self) -> CardType {
        self.card_type
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn last_topup(&self) -> Option<DateTime<Utc>> {
        self.last_topup
    }

    /// Credits the card and stamps the top-up time
    pub fn top_up(&mut self, amount: Money) -> Result<(), BillingError> {
        self.balance = self.balance.checked_add(&amount)?;
        self.last_topup = Some(Utc::now());
        Ok(())
    }

    /// Debits the card, refusing to overdraw
    pub fn debit(&mut self, amount: Money) -> Result<(), BillingError> {
        let remaining = self.balance.checked_sub(&amount)?;
        if remaining.is_negative() {
            return Err(BillingError::InsufficientFunds {
                balance: self.balance.amount(),
                required: amount.amount(),
            });
        }
        self.balance = remaining;
        Ok(())
    }
}

/// A card joined with its property's location, for owner-facing listings
#[derive(Debug, Clone, Serialize)]
pub struct CardView {
    pub card_id: CardId,
    pub property_id: PropertyId,
    pub card_type: CardType,
    pub balance: Money,
    pub last_topup: Option<DateTime<Utc>>,
    pub building_no: String,
    pub unit_no: String,
    pub room_no: String,
}

/// Card issuance, direct (cash) top-ups, and owner listings
pub struct CardAccount<S: BillingStore> {
    store: S,
    directory: Arc<dyn PropertyDirectory>,
    policy: BillingPolicy,
}

impl<S: BillingStore> CardAccount<S> {
    pub fn new(store: S, directory: Arc<dyn PropertyDirectory>, policy: BillingPolicy) -> Self {
        Self {
            store,
            directory,
            policy,
        }
    }

    /// Returns the property's water and electricity cards, issuing any that
    /// are missing
    pub async fn ensure_cards(
        &self,
        property_id: PropertyId,
    ) -> Result<(UtilityCard, UtilityCard), BillingError> {
        self.directory.find_property(property_id).await?;

        let existing = self.store.cards_for_property(property_id).await?;
        let mut water = existing
            .iter()
            .find(|c| c.card_type() == CardType::Water)
            .cloned();
        let mut elec = existing
            .iter()
            .find(|c| c.card_type() == CardType::Electricity)
            .cloned();

        if water.is_some() && elec.is_some() {
            return Ok((water.unwrap(), elec.unwrap()));
        }

        let mut tx = self.store.begin().await?;
        if water.is_none() {
            let card = UtilityCard::issue(property_id, CardType::Water, self.policy.currency());
            tx.insert_card(&card).await?;
            water = Some(card);
        }
        if elec.is_none() {
            let card =
                UtilityCard::issue(property_id, CardType::Electricity, self.policy.currency());
            tx.insert_card(&card).await?;
            elec = Some(card);
        }
        tx.commit().await?;

        info!(property = %property_id, "utility cards issued");
        Ok((water.unwrap(), elec.unwrap()))
    }

    /// Credits a card with cash paid at the counter, bypassing the wallet
    ///
    /// Gated on the card's own property only: an unpaid wallet-channel fee on
    /// that property blocks the top-up.
    pub async fn top_up_direct(
        &self,
        card_id: CardId,
        amount: Money,
    ) -> Result<Money, BillingError> {
        self.policy.validate_amount(amount)?;

        let mut tx = self.store.begin().await?;
        let mut card = tx
            .lock_card(card_id)
            .await?
            .ok_or_else(|| BillingError::not_found("UtilityCard", card_id))?;

        if tx.unpaid_wallet_fee_exists(card.property_id()).await? {
            return Err(BillingError::ArrearsLocked {
                reason: "property has unpaid property or heating fees".to_string(),
                property: Some(card.property_id()),
            });
        }

        card.top_up(amount)?;
        tx.update_card(&card).await?;
        tx.commit().await?;

        info!(card = %card_id, amount = %amount, balance = %card.balance(), "card topped up");
        Ok(card.balance())
    }

    /// Current card balance, or `None` if the card does not exist
    pub async fn balance_of(&self, card_id: CardId) -> Result<Option<Money>, BillingError> {
        Ok(self.store.card(card_id).await?.map(|c| c.balance()))
    }

    /// All cards across the user's properties, joined with property location
    pub async fn cards_of_user(&self, user_id: UserId) -> Result<Vec<CardView>, BillingError> {
        let properties = self.directory.properties_owned_by(user_id).await?;
        let mut views = Vec::new();

        for property in properties {
            let cards = self.store.cards_for_property(property.id).await?;
            for card in cards {
                views.push(CardView {
                    card_id: card.id(),
                    property_id: property.id,
                    card_type: card.card_type(),
                    balance: card.balance(),
                    last_topup: card.last_topup(),
                    building_no: property.building_no.clone(),
                    unit_no: property.unit_no.clone(),
                    room_no: property.room_no.clone(),
                });
            }
        }

        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cny(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::CNY)
    }

    #[test]
    fn test_issued_card_is_empty_with_no_topup_stamp() {
        let card = UtilityCard::issue(PropertyId::new(), CardType::Water, Currency::CNY);
        assert!(card.balance().is_zero());
        assert!(card.last_topup().is_none());
    }

    #[test]
    fn test_top_up_stamps_time() {
        let mut card = UtilityCard::issue(PropertyId::new(), CardType::Electricity, Currency::CNY);
        card.top_up(cny(dec!(200))).unwrap();
        assert_eq!(card.balance(), cny(dec!(200)));
        assert!(card.last_topup().is_some());
    }

    #[test]
    fn test_debit_refuses_to_overdraw() {
        let mut card = UtilityCard::issue(PropertyId::new(), CardType::Water, Currency::CNY);
        card.top_up(cny(dec!(30))).unwrap();

        let result = card.debit(cny(dec!(31)));
        assert!(matches!(
            result,
            Err(BillingError::InsufficientFunds { .. })
        ));
        assert_eq!(card.balance(), cny(dec!(30)));
    }

    #[test]
    fn test_card_type_tokens_round_trip() {
        for card_type in [CardType::Water, CardType::Electricity] {
            let parsed: CardType = card_type.as_str().parse().unwrap();
            assert_eq!(parsed, card_type);
        }
        assert!("GAS".parse::<CardType>().is_err());
    }
}
