//! Payment coordination across wallets, fees, and cards
//!
//! Every operation here moves money between at least two entities, so each
//! runs inside a single storage transaction: lock the rows, check the gates
//! against the locked state, mutate, write, commit. A transaction dropped
//! before commit rolls every write back.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use core_kernel::{CardId, FeeId, Money, UserId};
use domain_property::PropertyDirectory;

use crate::error::BillingError;
use crate::fee::FeeCategory;
use crate::policy::BillingPolicy;
use crate::ports::{BillingStore, BillingTx};
use crate::transaction::{TransactionRecorder, WalletTransaction};

/// Who is asking for the payment
///
/// Administrators settle property and heating fees on behalf of owners at
/// the counter; only owners themselves may settle card-channel fees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallerRole {
    Owner,
    Admin,
}

impl CallerRole {
    /// Maps a session role string to a caller role
    ///
    /// Anything other than an exact (case-insensitive) "ADMIN" resolves to
    /// the least-privileged role, including a missing value.
    pub fn from_session(role: Option<&str>) -> Self {
        match role {
            Some(r) if r.eq_ignore_ascii_case("ADMIN") => CallerRole::Admin,
            _ => CallerRole::Owner,
        }
    }
}

impl fmt::Display for CallerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallerRole::Owner => write!(f, "OWNER"),
            CallerRole::Admin => write!(f, "ADMIN"),
        }
    }
}

/// Orchestrates the money-moving operations
pub struct PaymentService<S: BillingStore> {
    store: S,
    directory: Arc<dyn PropertyDirectory>,
    policy: BillingPolicy,
    recorder: TransactionRecorder,
}

impl<S: BillingStore> PaymentService<S> {
    pub fn new(store: S, directory: Arc<dyn PropertyDirectory>, policy: BillingPolicy) -> Self {
        Self {
            store,
            directory,
            policy,
            recorder: TransactionRecorder,
        }
    }

    /// Settles a wallet-channel fee from the property owner's wallet
    ///
    /// Gate order: fee exists, not already paid, role may touch the
    /// category, channel is the wallet, owner and wallet resolve, balance
    /// covers the amount. The wallet debit, the fee settlement, and the
    /// ledger entry land in one transaction.
    pub async fn pay_fee_from_wallet(
        &self,
        fee_id: FeeId,
        role: CallerRole,
    ) -> Result<WalletTransaction, BillingError> {
        let mut tx = self.store.begin().await?;
        let mut fee = tx
            .lock_fee(fee_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Fee", fee_id))?;

        if fee.is_paid() {
            return Err(BillingError::AlreadyPaid(fee_id));
        }
        if role == CallerRole::Admin
            && matches!(fee.category(), FeeCategory::Water | FeeCategory::Electricity)
        {
            return Err(BillingError::RoleForbidden {
                role,
                reason: "administrators may not settle card-channel fees".to_string(),
            });
        }
        if fee.channel().card_type().is_some() {
            return Err(BillingError::WrongChannel {
                fee: fee_id,
                channel: fee.channel(),
            });
        }

        let property = self.directory.find_property(fee.property_id()).await?;
        let owner_id = property
            .owner_id
            .ok_or_else(|| BillingError::not_found("Owner", fee.property_id()))?;

        let mut wallet = tx
            .lock_wallet_by_user(owner_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Wallet", owner_id))?;

        wallet.debit(fee.amount())?;
        fee.settle()?;

        tx.update_wallet(&wallet).await?;
        tx.update_fee(&fee).await?;
        let entry = self.recorder.fee_payment_entry(&wallet, &fee);
        self.recorder.append(&mut tx, &entry).await?;
        tx.commit().await?;

        info!(
            fee = %fee_id,
            wallet = %wallet.id(),
            amount = %fee.amount(),
            balance = %wallet.balance(),
            "fee settled from wallet"
        );
        Ok(entry)
    }

    /// Settles a card-channel fee from the matching utility card
    ///
    /// The card is found by the fee's property and the channel's card type.
    /// Card movements never produce a wallet ledger entry. Returns the card
    /// balance after the debit.
    pub async fn pay_fee_from_card(&self, fee_id: FeeId) -> Result<Money, BillingError> {
        let mut tx = self.store.begin().await?;
        let mut fee = tx
            .lock_fee(fee_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Fee", fee_id))?;

        if fee.is_paid() {
            return Err(BillingError::AlreadyPaid(fee_id));
        }
        let card_type = fee.channel().card_type().ok_or(BillingError::WrongChannel {
            fee: fee_id,
            channel: fee.channel(),
        })?;

        let mut card = tx
            .lock_card_for_property(fee.property_id(), card_type)
            .await?
            .ok_or_else(|| BillingError::not_found("UtilityCard", fee.property_id()))?;

        card.debit(fee.amount())?;
        fee.settle()?;

        tx.update_card(&card).await?;
        tx.update_fee(&fee).await?;
        tx.commit().await?;

        info!(
            fee = %fee_id,
            card = %card.id(),
            amount = %fee.amount(),
            balance = %card.balance(),
            "fee settled from card"
        );
        Ok(card.balance())
    }

    /// Moves money from a user's wallet onto one of their utility cards
    ///
    /// Blocked while ANY property the user owns carries an unpaid
    /// wallet-channel fee, not just the card's property: outstanding
    /// property and heating bills must be cleared before wallet money may be
    /// parked on cards. Wallet funds are checked before the card is
    /// resolved; the card must belong to one of the user's properties.
    pub async fn top_up_card_from_wallet(
        &self,
        user_id: UserId,
        card_id: CardId,
        amount: Money,
    ) -> Result<WalletTransaction, BillingError> {
        self.policy.validate_amount(amount)?;

        let mut tx = self.store.begin().await?;
        let properties = self.directory.properties_owned_by(user_id).await?;

        for property in &properties {
            if tx.unpaid_wallet_fee_exists(property.id).await? {
                return Err(BillingError::ArrearsLocked {
                    reason: "unpaid property or heating fees must be settled first".to_string(),
                    property: Some(property.id),
                });
            }
        }

        let mut wallet = tx
            .lock_wallet_by_user(user_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Wallet", user_id))?;
        wallet.debit(amount)?;

        let mut card = tx
            .lock_card(card_id)
            .await?
            .ok_or_else(|| BillingError::not_found("UtilityCard", card_id))?;

        if !properties.iter().any(|p| p.id == card.property_id()) {
            return Err(BillingError::OwnershipMismatch {
                card: card_id,
                user: user_id,
            });
        }

        card.top_up(amount)?;

        tx.update_wallet(&wallet).await?;
        tx.update_card(&card).await?;
        let entry = self.recorder.card_topup_entry(&wallet, &card, amount);
        self.recorder.append(&mut tx, &entry).await?;
        tx.commit().await?;

        info!(
            card = %card_id,
            wallet = %wallet.id(),
            amount = %amount,
            wallet_balance = %wallet.balance(),
            card_balance = %card.balance(),
            "card topped up from wallet"
        );
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_role_defaults_to_owner() {
        assert_eq!(CallerRole::from_session(None), CallerRole::Owner);
        assert_eq!(CallerRole::from_session(Some("OWNER")), CallerRole::Owner);
        assert_eq!(CallerRole::from_session(Some("root")), CallerRole::Owner);
        assert_eq!(CallerRole::from_session(Some("")), CallerRole::Owner);
    }

    #[test]
    fn test_session_role_admin_is_case_insensitive() {
        assert_eq!(CallerRole::from_session(Some("ADMIN")), CallerRole::Admin);
        assert_eq!(CallerRole::from_session(Some("admin")), CallerRole::Admin);
        assert_eq!(CallerRole::from_session(Some("Admin")), CallerRole::Admin);
    }
}
