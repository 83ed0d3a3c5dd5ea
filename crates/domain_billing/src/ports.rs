//! Storage ports for the billing domain
//!
//! [`BillingStore`] hands out plain reads and opens transactions;
//! [`BillingTx`] carries the locked reads and the writes of one atomic unit.
//! A transaction dropped without [`BillingTx::commit`] rolls back everything
//! written through it.

use async_trait::async_trait;

use core_kernel::{CardId, FeeId, PortError, PropertyId, UserId, WalletId};

use crate::card::{CardType, UtilityCard};
use crate::fee::Fee;
use crate::transaction::WalletTransaction;
use crate::wallet::Wallet;

/// Storage entry point for billing state
///
/// The plain reads are snapshot reads outside any transaction; anything that
/// will be checked-then-mutated must instead be read through the locking
/// methods of an open [`BillingTx`].
#[async_trait]
pub trait BillingStore: Clone + Send + Sync + 'static {
    type Tx: BillingTx;

    /// Opens a transaction
    async fn begin(&self) -> Result<Self::Tx, PortError>;

    async fn fee(&self, fee_id: FeeId) -> Result<Option<Fee>, PortError>;

    async fn wallet_for_user(&self, user_id: UserId) -> Result<Option<Wallet>, PortError>;

    async fn card(&self, card_id: CardId) -> Result<Option<UtilityCard>, PortError>;

    async fn cards_for_property(
        &self,
        property_id: PropertyId,
    ) -> Result<Vec<UtilityCard>, PortError>;

    /// All unpaid fees, oldest first
    async fn unpaid_fees(&self) -> Result<Vec<Fee>, PortError>;

    /// Unpaid fees on one property, oldest first
    async fn unpaid_fees_for_property(
        &self,
        property_id: PropertyId,
    ) -> Result<Vec<Fee>, PortError>;

    /// A wallet's ledger entries, newest first
    async fn entries_for_wallet(
        &self,
        wallet_id: WalletId,
    ) -> Result<Vec<WalletTransaction>, PortError>;
}

/// One atomic unit of billing writes
///
/// The `lock_*` reads take exclusive row locks held until commit or drop, so
/// a check made against a locked row stays true through the mutation.
#[async_trait]
pub trait BillingTx: Send {
    async fn lock_fee(&mut self, fee_id: FeeId) -> Result<Option<Fee>, PortError>;

    async fn lock_wallet_by_user(&mut self, user_id: UserId)
        -> Result<Option<Wallet>, PortError>;

    async fn lock_card(&mut self, card_id: CardId) -> Result<Option<UtilityCard>, PortError>;

    /// Locks the property's card of the given type
    async fn lock_card_for_property(
        &mut self,
        property_id: PropertyId,
        card_type: CardType,
    ) -> Result<Option<UtilityCard>, PortError>;

    /// True iff the property carries an unpaid wallet-channel fee
    async fn unpaid_wallet_fee_exists(
        &mut self,
        property_id: PropertyId,
    ) -> Result<bool, PortError>;

    async fn insert_fee(&mut self, fee: &Fee) -> Result<(), PortError>;

    async fn update_fee(&mut self, fee: &Fee) -> Result<(), PortError>;

    async fn insert_wallet(&mut self, wallet: &Wallet) -> Result<(), PortError>;

    async fn update_wallet(&mut self, wallet: &Wallet) -> Result<(), PortError>;

    async fn insert_card(&mut self, card: &UtilityCard) -> Result<(), PortError>;

    async fn update_card(&mut self, card: &UtilityCard) -> Result<(), PortError>;

    /// Appends a ledger entry; entries are never updated or deleted
    async fn append_entry(&mut self, entry: &WalletTransaction) -> Result<(), PortError>;

    /// Makes every write of this transaction durable
    async fn commit(self) -> Result<(), PortError>;
}
