//! In-memory billing store
//!
//! Backs tests and local development. A store-wide async mutex serializes
//! transactions: `begin` takes the lock and clones the state into a working
//! copy, `commit` writes the copy back, and dropping the transaction without
//! committing discards the copy. This gives the same
//! lock-check-mutate-commit behavior as row-locked SQL, just with coarser
//! granularity.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use core_kernel::{CardId, FeeId, PortError, PropertyId, UserId, WalletId};

use crate::card::{CardType, UtilityCard};
use crate::fee::{Fee, SettlementChannel};
use crate::ports::{BillingStore, BillingTx};
use crate::transaction::WalletTransaction;
use crate::wallet::Wallet;

#[derive(Debug, Default, Clone)]
struct MemoryState {
    fees: HashMap<FeeId, Fee>,
    wallets: HashMap<WalletId, Wallet>,
    cards: HashMap<CardId, UtilityCard>,
    entries: Vec<WalletTransaction>,
}

/// In-memory [`BillingStore`]
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BillingStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<Self::Tx, PortError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = guard.clone();
        Ok(MemoryTx { guard, work })
    }

    async fn fee(&self, fee_id: FeeId) -> Result<Option<Fee>, PortError> {
        Ok(self.state.lock().await.fees.get(&fee_id).cloned())
    }

    async fn wallet_for_user(&self, user_id: UserId) -> Result<Option<Wallet>, PortError> {
        Ok(self
            .state
            .lock()
            .await
            .wallets
            .values()
            .find(|w| w.user_id() == user_id)
            .cloned())
    }

    async fn card(&self, card_id: CardId) -> Result<Option<UtilityCard>, PortError> {
        Ok(self.state.lock().await.cards.get(&card_id).cloned())
    }

    async fn cards_for_property(
        &self,
        property_id: PropertyId,
    ) -> Result<Vec<UtilityCard>, PortError> {
        let state = self.state.lock().await;
        let mut cards: Vec<_> = state
            .cards
            .values()
            .filter(|c| c.property_id() == property_id)
            .cloned()
            .collect();
        cards.sort_by_key(|c| c.id());
        Ok(cards)
    }

    async fn unpaid_fees(&self) -> Result<Vec<Fee>, PortError> {
        let state = self.state.lock().await;
        let mut fees: Vec<_> = state.fees.values().filter(|f| !f.is_paid()).cloned().collect();
        fees.sort_by_key(|f| (f.created_at(), f.id()));
        Ok(fees)
    }

    async fn unpaid_fees_for_property(
        &self,
        property_id: PropertyId,
    ) -> Result<Vec<Fee>, PortError> {
        let state = self.state.lock().await;
        let mut fees: Vec<_> = state
            .fees
            .values()
            .filter(|f| !f.is_paid() && f.property_id() == property_id)
            .cloned()
            .collect();
        fees.sort_by_key(|f| (f.created_at(), f.id()));
        Ok(fees)
    }

    async fn entries_for_wallet(
        &self,
        wallet_id: WalletId,
    ) -> Result<Vec<WalletTransaction>, PortError> {
        let state = self.state.lock().await;
        let mut entries: Vec<_> = state
            .entries
            .iter()
            .filter(|e| e.wallet_id == wallet_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(entries)
    }
}

/// An open [`MemoryStore`] transaction
///
/// Holds the store lock; concurrent `begin` calls wait.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

#[async_trait]
impl BillingTx for MemoryTx {
    async fn lock_fee(&mut self, fee_id: FeeId) -> Result<Option<Fee>, PortError> {
        Ok(self.work.fees.get(&fee_id).cloned())
    }

    async fn lock_wallet_by_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<Wallet>, PortError> {
        Ok(self
            .work
            .wallets
            .values()
            .find(|w| w.user_id() == user_id)
            .cloned())
    }

    async fn lock_card(&mut self, card_id: CardId) -> Result<Option<UtilityCard>, PortError> {
        Ok(self.work.cards.get(&card_id).cloned())
    }

    async fn lock_card_for_property(
        &mut self,
        property_id: PropertyId,
        card_type: CardType,
    ) -> Result<Option<UtilityCard>, PortError> {
        Ok(self
            .work
            .cards
            .values()
            .find(|c| c.property_id() == property_id && c.card_type() == card_type)
            .cloned())
    }

    async fn unpaid_wallet_fee_exists(
        &mut self,
        property_id: PropertyId,
    ) -> Result<bool, PortError> {
        Ok(self.work.fees.values().any(|f| {
            !f.is_paid()
                && f.property_id() == property_id
                && f.channel() == SettlementChannel::Wallet
        }))
    }

    async fn insert_fee(&mut self, fee: &Fee) -> Result<(), PortError> {
        if self.work.fees.contains_key(&fee.id()) {
            return Err(PortError::conflict(format!("fee {} already exists", fee.id())));
        }
        self.work.fees.insert(fee.id(), fee.clone());
        Ok(())
    }

    async fn update_fee(&mut self, fee: &Fee) -> Result<(), PortError> {
        if !self.work.fees.contains_key(&fee.id()) {
            return Err(PortError::not_found("Fee", fee.id()));
        }
        self.work.fees.insert(fee.id(), fee.clone());
        Ok(())
    }

    async fn insert_wallet(&mut self, wallet: &Wallet) -> Result<(), PortError> {
        if self
            .work
            .wallets
            .values()
            .any(|w| w.user_id() == wallet.user_id())
        {
            return Err(PortError::conflict(format!(
                "user {} already has a wallet",
                wallet.user_id()
            )));
        }
        self.work.wallets.insert(wallet.id(), wallet.clone());
        Ok(())
    }

    async fn update_wallet(&mut self, wallet: &Wallet) -> Result<(), PortError> {
        if !self.work.wallets.contains_key(&wallet.id()) {
            return Err(PortError::not_found("Wallet", wallet.id()));
        }
        self.work.wallets.insert(wallet.id(), wallet.clone());
        Ok(())
    }

    async fn insert_card(&mut self, card: &UtilityCard) -> Result<(), PortError> {
        if self.work.cards.contains_key(&card.id()) {
            return Err(PortError::conflict(format!(
                "card {} already exists",
                card.id()
            )));
        }
        self.work.cards.insert(card.id(), card.clone());
        Ok(())
    }

    async fn update_card(&mut self, card: &UtilityCard) -> Result<(), PortError> {
        if !self.work.cards.contains_key(&card.id()) {
            return Err(PortError::not_found("UtilityCard", card.id()));
        }
        self.work.cards.insert(card.id(), card.clone());
        Ok(())
    }

    async fn append_entry(&mut self, entry: &WalletTransaction) -> Result<(), PortError> {
        self.work.entries.push(entry.clone());
        Ok(())
    }

    async fn commit(mut self) -> Result<(), PortError> {
        *self.guard = self.work;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fee::FeeCategory;
    use core_kernel::{Currency, Money};
    use rust_decimal_macros::dec;

    fn cny(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::CNY)
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let store = MemoryStore::new();
        let fee = Fee::new(PropertyId::new(), FeeCategory::Property, cny(dec!(100))).unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.insert_fee(&fee).await.unwrap();
        tx.commit().await.unwrap();

        assert!(store.fee(fee.id()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = MemoryStore::new();
        let fee = Fee::new(PropertyId::new(), FeeCategory::Property, cny(dec!(100))).unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_fee(&fee).await.unwrap();
            // dropped without commit
        }

        assert!(store.fee(fee.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_wallet_for_user_is_a_conflict() {
        let store = MemoryStore::new();
        let user = UserId::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert_wallet(&Wallet::open(user, Currency::CNY)).await.unwrap();
        let result = tx.insert_wallet(&Wallet::open(user, Currency::CNY)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_entries_come_back_newest_first() {
        let store = MemoryStore::new();
        let mut wallet = Wallet::open(UserId::new(), Currency::CNY);

        let recorder = crate::transaction::TransactionRecorder;
        let mut tx = store.begin().await.unwrap();
        tx.insert_wallet(&wallet).await.unwrap();
        for _ in 0..3 {
            wallet.recharge(cny(dec!(10))).unwrap();
            let entry = recorder.recharge_entry(&wallet, cny(dec!(10)));
            tx.append_entry(&entry).await.unwrap();
        }
        tx.update_wallet(&wallet).await.unwrap();
        tx.commit().await.unwrap();

        let entries = store.entries_for_wallet(wallet.id()).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.windows(2).all(|w| w[0].id >= w[1].id));
    }
}
