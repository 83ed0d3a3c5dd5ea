//! Append-only wallet transaction ledger
//!
//! Every wallet movement produces exactly one [`WalletTransaction`]. Entries
//! are written once and never updated or deleted; amounts are stored as
//! absolute values with the direction carried by the kind.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{Money, TransactionId, WalletId};

use crate::card::UtilityCard;
use crate::error::BillingError;
use crate::fee::Fee;
use crate::ports::{BillingStore, BillingTx};
use crate::wallet::Wallet;

/// What moved the money
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Recharge,
    PayFee,
    TopupCard,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Recharge => "RECHARGE",
            TransactionKind::PayFee => "PAY_FEE",
            TransactionKind::TopupCard => "TOPUP_CARD",
        }
    }

    /// +1 for credits, -1 for debits
    pub fn signum(&self) -> i8 {
        match self {
            TransactionKind::Recharge => 1,
            TransactionKind::PayFee | TransactionKind::TopupCard => -1,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECHARGE" => Ok(TransactionKind::Recharge),
            "PAY_FEE" => Ok(TransactionKind::PayFee),
            "TOPUP_CARD" => Ok(TransactionKind::TopupCard),
            other => Err(format!("unknown transaction kind: {other}")),
        }
    }
}

/// One immutable ledger entry
///
/// `amount` is always the absolute value moved; `balance_after` is the wallet
/// balance after the movement was applied. `related_id` points at the fee or
/// card the movement settled, when there is one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletTransaction {
    pub id: TransactionId,
    pub wallet_id: WalletId,
    pub kind: TransactionKind,
    pub amount: Money,
    pub balance_after: Money,
    pub related_id: Option<Uuid>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Builds ledger entries from already-mutated wallets
///
/// Callers mutate the wallet first and build the entry second, so
/// `balance_after` is read straight off the wallet.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionRecorder;

impl TransactionRecorder {
    /// Entry for a wallet recharge; `wallet.balance()` already includes it
    pub fn recharge_entry(&self, wallet: &Wallet, amount: Money) -> WalletTransaction {
        WalletTransaction {
            id: TransactionId::new_v7(),
            wallet_id: wallet.id(),
            kind: TransactionKind::Recharge,
            amount: amount.abs(),
            balance_after: wallet.balance(),
            related_id: None,
            description: format!("wallet recharge {amount}"),
            created_at: Utc::now(),
        }
    }

    /// Entry for a fee settled from the wallet; the debit is already applied
    pub fn fee_payment_entry(&self, wallet: &Wallet, fee: &Fee) -> WalletTransaction {
        WalletTransaction {
            id: TransactionId::new_v7(),
            wallet_id: wallet.id(),
            kind: TransactionKind::PayFee,
            amount: fee.amount().abs(),
            balance_after: wallet.balance(),
            related_id: Some(fee.id().into_uuid()),
            description: format!("{} fee payment", fee.category()),
            created_at: Utc::now(),
        }
    }

    /// Entry for a card top-up funded from the wallet; debit already applied
    pub fn card_topup_entry(
        &self,
        wallet: &Wallet,
        card: &UtilityCard,
        amount: Money,
    ) -> WalletTransaction {
        WalletTransaction {
            id: TransactionId::new_v7(),
            wallet_id: wallet.id(),
            kind: TransactionKind::TopupCard,
            amount: amount.abs(),
            balance_after: wallet.balance(),
            related_id: Some(card.id().into_uuid()),
            description: format!("{} card top-up", card.card_type()),
            created_at: Utc::now(),
        }
    }

    /// Appends an entry inside the caller's open transaction
    pub async fn append<T: BillingTx>(
        &self,
        tx: &mut T,
        entry: &WalletTransaction,
    ) -> Result<(), BillingError> {
        tx.append_entry(entry).await?;
        Ok(())
    }

    /// A wallet's entries, newest first
    pub async fn history<S: BillingStore>(
        &self,
        store: &S,
        wallet_id: WalletId,
    ) -> Result<Vec<WalletTransaction>, BillingError> {
        Ok(store.entries_for_wallet(wallet_id).await?)
    }
}
