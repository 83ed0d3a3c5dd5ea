//! Resident wallets and the wallet account service
//!
//! A wallet is the single prepaid balance for one user. Every balance change
//! passes through [`Wallet::recharge`] or [`Wallet::debit`] so the
//! non-negativity invariant holds in one place, and every wallet movement is
//! mirrored by an append-only [`crate::transaction::WalletTransaction`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use core_kernel::{Currency, Money, UserId, WalletId};

use crate::error::BillingError;
use crate::policy::BillingPolicy;
use crate::ports::{BillingStore, BillingTx};
use crate::transaction::{TransactionRecorder, WalletTransaction};

/// A user's prepaid wallet
///
/// # Invariants
///
/// - `balance` never goes negative; debits that would overdraw fail with
///   `InsufficientFunds` and leave the wallet untouched
/// - `total_recharged` only ever grows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Wallet {
    id: WalletId,
    user_id: UserId,
    balance: Money,
    total_recharged: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Opens an empty wallet for a user
    pub fn open(user_id: UserId, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: WalletId::new_v7(),
            user_id,
            balance: Money::zero(currency),
            total_recharged: Money::zero(currency),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rehydrates a wallet from storage; storage adapters only
    pub fn from_parts(
        id: WalletId,
        user_id: UserId,
        balance: Money,
        total_recharged: Money,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            balance,
            total_recharged,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> WalletId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn total_recharged(&self) -> Money {
        self.total_recharged
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Credits the balance and grows the lifetime recharge total
    pub fn recharge(&mut self, amount: Money) -> Result<(), BillingError> {
        self.balance = self.balance.checked_add(&amount)?;
        self.total_recharged = self.total_recharged.checked_add(&amount)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Debits the balance, refusing to overdraw
    pub fn debit(&mut self, amount: Money) -> Result<(), BillingError> {
        let remaining = self.balance.checked_sub(&amount)?;
        if remaining.is_negative() {
            return Err(BillingError::InsufficientFunds {
                balance: self.balance.amount(),
                required: amount.amount(),
            });
        }
        self.balance = remaining;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Wallet lifecycle, recharges, and history
pub struct WalletAccount<S: BillingStore> {
    store: S,
    policy: BillingPolicy,
    recorder: TransactionRecorder,
}

impl<S: BillingStore> WalletAccount<S> {
    pub fn new(store: S, policy: BillingPolicy) -> Self {
        Self {
            store,
            policy,
            recorder: TransactionRecorder,
        }
    }

    /// Returns the user's wallet, opening an empty one if none exists
    pub async fn ensure_wallet(&self, user_id: UserId) -> Result<Wallet, BillingError> {
        if let Some(wallet) = self.store.wallet_for_user(user_id).await? {
            return Ok(wallet);
        }

        let wallet = Wallet::open(user_id, self.policy.currency());
        let mut tx = self.store.begin().await?;
        tx.insert_wallet(&wallet).await?;
        tx.commit().await?;

        info!(wallet = %wallet.id(), user = %user_id, "wallet opened");
        Ok(wallet)
    }

    /// Credits the user's wallet and appends the matching ledger entry
    ///
    /// Opens the wallet on first use. The balance update and the ledger entry
    /// land in the same transaction.
    pub async fn recharge(
        &self,
        user_id: UserId,
        amount: Money,
    ) -> Result<WalletTransaction, BillingError> {
        self.policy.validate_amount(amount)?;

        let mut tx = self.store.begin().await?;
        let mut wallet = match tx.lock_wallet_by_user(user_id).await? {
            Some(wallet) => wallet,
            None => {
                let wallet = Wallet::open(user_id, self.policy.currency());
                tx.insert_wallet(&wallet).await?;
                wallet
            }
        };

        wallet.recharge(amount)?;
        tx.update_wallet(&wallet).await?;

        let entry = self.recorder.recharge_entry(&wallet, amount);
        tx.append_entry(&entry).await?;
        tx.commit().await?;

        info!(
            wallet = %wallet.id(),
            user = %user_id,
            amount = %amount,
            balance = %wallet.balance(),
            "wallet recharged"
        );
        Ok(entry)
    }

    /// Current balance, or `None` if the user has no wallet yet
    pub async fn balance_of(&self, user_id: UserId) -> Result<Option<Money>, BillingError> {
        Ok(self
            .store
            .wallet_for_user(user_id)
            .await?
            .map(|w| w.balance()))
    }

    /// The user's ledger entries, newest first; empty when no wallet exists
    pub async fn transaction_history(
        &self,
        user_id: UserId,
    ) -> Result<Vec<WalletTransaction>, BillingError> {
        let Some(wallet) = self.store.wallet_for_user(user_id).await? else {
            return Ok(Vec::new());
        };
        Ok(self.store.entries_for_wallet(wallet.id()).await?)
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
    fn test_open_wallet_is_empty() {
        let wallet = Wallet::open(UserId::new(), Currency::CNY);
        assert!(wallet.balance().is_zero());
        assert!(wallet.total_recharged().is_zero());
    }

    #[test]
    fn test_recharge_grows_balance_and_lifetime_total() {
        let mut wallet = Wallet::open(UserId::new(), Currency::CNY);
        wallet.recharge(cny(dec!(100))).unwrap();
        wallet.recharge(cny(dec!(50))).unwrap();
        wallet.debit(cny(dec!(30))).unwrap();

        assert_eq!(wallet.balance(), cny(dec!(120)));
        assert_eq!(wallet.total_recharged(), cny(dec!(150)));
    }

    #[test]
    fn test_debit_refuses_to_overdraw() {
        let mut wallet = Wallet::open(UserId::new(), Currency::CNY);
        wallet.recharge(cny(dec!(10))).unwrap();

        let result = wallet.debit(cny(dec!(10.01)));
        assert!(matches!(
            result,
            Err(BillingError::InsufficientFunds { .. })
        ));
        // failed debit leaves the balance untouched
        assert_eq!(wallet.balance(), cny(dec!(10)));
    }

    #[test]
    fn test_debit_to_exactly_zero_is_allowed() {
        let mut wallet = Wallet::open(UserId::new(), Currency::CNY);
        wallet.recharge(cny(dec!(25))).unwrap();
        wallet.debit(cny(dec!(25))).unwrap();
        assert!(wallet.balance().is_zero());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn amount() -> impl Strategy<Value = Money> {
            (1u64..=1_000_000u64).prop_map(|minor| Money::from_minor(minor as i64, Currency::CNY))
        }

        proptest! {
            // any interleaving of recharges and debits keeps the balance at or above zero
            #[test]
            fn balance_never_goes_negative(ops in proptest::collection::vec((any::<bool>(), amount()), 1..50)) {
                let mut wallet = Wallet::open(UserId::new(), Currency::CNY);
                for (credit, amount) in ops {
                    if credit {
                        wallet.recharge(amount).unwrap();
                    } else {
                        let _ = wallet.debit(amount);
                    }
                    prop_assert!(!wallet.balance().is_negative());
                }
            }
        }
    }
}
