//! PostgreSQL billing store and property directory
//!
//! [`PgStore`] implements the billing storage port on SQLx transactions;
//! the `lock_*` reads use `SELECT ... FOR UPDATE` so the row stays pinned
//! from check to commit. [`PgDirectory`] implements the read-only property
//! directory over the same pool.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use core_kernel::{
    CardId, DomainPort, FeeId, PortError, PropertyId, UserId, WalletId,
};
use domain_billing::{
    BillingStore, BillingTx, CardType, Fee, SettlementChannel, UtilityCard, Wallet,
    WalletTransaction,
};
use domain_property::{Owner, Property, PropertyDirectory};

use crate::error::port_err;
use crate::rows::{CardRow, FeeRow, OwnerRow, PropertyRow, TransactionRow, WalletRow};

const FEE_COLUMNS: &str =
    "id, property_id, category, channel, amount, currency, paid, paid_at, created_at";
const WALLET_COLUMNS: &str =
    "id, user_id, balance, total_recharged, currency, created_at, updated_at";
const CARD_COLUMNS: &str = "id, property_id, card_type, balance, currency, last_topup";
const TXN_COLUMNS: &str =
    "id, wallet_id, kind, amount, balance_after, currency, related_id, description, created_at";

/// PostgreSQL-backed billing store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillingStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<Self::Tx, PortError> {
        let tx = self.pool.begin().await.map_err(port_err)?;
        Ok(PgTx { tx })
    }

    async fn fee(&self, fee_id: FeeId) -> Result<Option<Fee>, PortError> {
        let sql = format!("SELECT {FEE_COLUMNS} FROM fees WHERE id = $1");
        let row: Option<FeeRow> = sqlx::query_as(&sql)
            .bind(fee_id.into_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(port_err)?;
        row.map(Fee::try_from).transpose().map_err(Into::into)
    }

    async fn wallet_for_user(&self, user_id: UserId) -> Result<Option<Wallet>, PortError> {
        let sql = format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = $1");
        let row: Option<WalletRow> = sqlx::query_as(&sql)
            .bind(user_id.into_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(port_err)?;
        row.map(Wallet::try_from).transpose().map_err(Into::into)
    }

    async fn card(&self, card_id: CardId) -> Result<Option<UtilityCard>, PortError> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM utility_cards WHERE id = $1");
        let row: Option<CardRow> = sqlx::query_as(&sql)
            .bind(card_id.into_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(port_err)?;
        row.map(UtilityCard::try_from).transpose().map_err(Into::into)
    }

    async fn cards_for_property(
        &self,
        property_id: PropertyId,
    ) -> Result<Vec<UtilityCard>, PortError> {
        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM utility_cards WHERE property_id = $1 ORDER BY card_type"
        );
        let rows: Vec<CardRow> = sqlx::query_as(&sql)
            .bind(property_id.into_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(port_err)?;
        rows.into_iter()
            .map(|r| UtilityCard::try_from(r).map_err(Into::into))
            .collect()
    }

    async fn unpaid_fees(&self) -> Result<Vec<Fee>, PortError> {
        let sql = format!(
            "SELECT {FEE_COLUMNS} FROM fees WHERE paid = FALSE ORDER BY created_at, id"
        );
        let rows: Vec<FeeRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(port_err)?;
        rows.into_iter()
            .map(|r| Fee::try_from(r).map_err(Into::into))
            .collect()
    }

    async fn unpaid_fees_for_property(
        &self,
        property_id: PropertyId,
    ) -> Result<Vec<Fee>, PortError> {
        let sql = format!(
            "SELECT {FEE_COLUMNS} FROM fees \
             WHERE paid = FALSE AND property_id = $1 ORDER BY created_at, id"
        );
        let rows: Vec<FeeRow> = sqlx::query_as(&sql)
            .bind(property_id.into_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(port_err)?;
        rows.into_iter()
            .map(|r| Fee::try_from(r).map_err(Into::into))
            .collect()
    }

    async fn entries_for_wallet(
        &self,
        wallet_id: WalletId,
    ) -> Result<Vec<WalletTransaction>, PortError> {
        let sql = format!(
            "SELECT {TXN_COLUMNS} FROM wallet_transactions \
             WHERE wallet_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows: Vec<TransactionRow> = sqlx::query_as(&sql)
            .bind(wallet_id.into_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(port_err)?;
        rows.into_iter()
            .map(|r| WalletTransaction::try_from(r).map_err(Into::into))
            .collect()
    }
}

/// An open PostgreSQL transaction
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BillingTx for PgTx {
    async fn lock_fee(&mut self, fee_id: FeeId) -> Result<Option<Fee>, PortError> {
        let sql = format!("SELECT {FEE_COLUMNS} FROM fees WHERE id = $1 FOR UPDATE");
        let row: Option<FeeRow> = sqlx::query_as(&sql)
            .bind(fee_id.into_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(port_err)?;
        row.map(Fee::try_from).transpose().map_err(Into::into)
    }

    async fn lock_wallet_by_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<Wallet>, PortError> {
        let sql = format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = $1 FOR UPDATE");
        let row: Option<WalletRow> = sqlx::query_as(&sql)
            .bind(user_id.into_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(port_err)?;
        row.map(Wallet::try_from).transpose().map_err(Into::into)
    }

    async fn lock_card(&mut self, card_id: CardId) -> Result<Option<UtilityCard>, PortError> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM utility_cards WHERE id = $1 FOR UPDATE");
        let row: Option<CardRow> = sqlx::query_as(&sql)
            .bind(card_id.into_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(port_err)?;
        row.map(UtilityCard::try_from).transpose().map_err(Into::into)
    }

    async fn lock_card_for_property(
        &mut self,
        property_id: PropertyId,
        card_type: CardType,
    ) -> Result<Option<UtilityCard>, PortError> {
        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM utility_cards \
             WHERE property_id = $1 AND card_type = $2 FOR UPDATE"
        );
        let row: Option<CardRow> = sqlx::query_as(&sql)
            .bind(property_id.into_uuid())
            .bind(card_type.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(port_err)?;
        row.map(UtilityCard::try_from).transpose().map_err(Into::into)
    }

    async fn unpaid_wallet_fee_exists(
        &mut self,
        property_id: PropertyId,
    ) -> Result<bool, PortError> {
        // locks the first matching fee so it cannot be settled under us
        let found: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM fees \
             WHERE property_id = $1 AND paid = FALSE AND channel = $2 \
             LIMIT 1 FOR UPDATE",
        )
        .bind(property_id.into_uuid())
        .bind(SettlementChannel::Wallet.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(port_err)?;
        Ok(found.is_some())
    }

    async fn insert_fee(&mut self, fee: &Fee) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO fees \
             (id, property_id, category, channel, amount, currency, paid, paid_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(fee.id().into_uuid())
        .bind(fee.property_id().into_uuid())
        .bind(fee.category().as_str())
        .bind(fee.channel().as_str())
        .bind(fee.amount().amount())
        .bind(fee.amount().currency().code())
        .bind(fee.is_paid())
        .bind(fee.paid_at())
        .bind(fee.created_at())
        .execute(&mut *self.tx)
        .await
        .map_err(port_err)?;
        debug!(fee = %fee.id(), "fee row inserted");
        Ok(())
    }

    async fn update_fee(&mut self, fee: &Fee) -> Result<(), PortError> {
        let result = sqlx::query("UPDATE fees SET paid = $2, paid_at = $3 WHERE id = $1")
            .bind(fee.id().into_uuid())
            .bind(fee.is_paid())
            .bind(fee.paid_at())
            .execute(&mut *self.tx)
            .await
            .map_err(port_err)?;
        if result.rows_affected() == 0 {
            return Err(PortError::not_found("Fee", fee.id()));
        }
        Ok(())
    }

    async fn insert_wallet(&mut self, wallet: &Wallet) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO wallets \
             (id, user_id, balance, total_recharged, currency, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(wallet.id().into_uuid())
        .bind(wallet.user_id().into_uuid())
        .bind(wallet.balance().amount())
        .bind(wallet.total_recharged().amount())
        .bind(wallet.balance().currency().code())
        .bind(wallet.created_at())
        .bind(wallet.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(port_err)?;
        debug!(wallet = %wallet.id(), "wallet row inserted");
        Ok(())
    }

    async fn update_wallet(&mut self, wallet: &Wallet) -> Result<(), PortError> {
        let result = sqlx::query(
            "UPDATE wallets SET balance = $2, total_recharged = $3, updated_at = $4 \
             WHERE id = $1",
        )
        .bind(wallet.id().into_uuid())
        .bind(wallet.balance().amount())
        .bind(wallet.total_recharged().amount())
        .bind(wallet.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(port_err)?;
        if result.rows_affected() == 0 {
            return Err(PortError::not_found("Wallet", wallet.id()));
        }
        Ok(())
    }

    async fn insert_card(&mut self, card: &UtilityCard) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO utility_cards \
             (id, property_id, card_type, balance, currency, last_topup) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(card.id().into_uuid())
        .bind(card.property_id().into_uuid())
        .bind(card.card_type().as_str())
        .bind(card.balance().amount())
        .bind(card.balance().currency().code())
        .bind(card.last_topup())
        .execute(&mut *self.tx)
        .await
        .map_err(port_err)?;
        debug!(card = %card.id(), "card row inserted");
        Ok(())
    }

    async fn update_card(&mut self, card: &UtilityCard) -> Result<(), PortError> {
        let result = sqlx::query(
            "UPDATE utility_cards SET balance = $2, last_topup = $3 WHERE id = $1",
        )
        .bind(card.id().into_uuid())
        .bind(card.balance().amount())
        .bind(card.last_topup())
        .execute(&mut *self.tx)
        .await
        .map_err(port_err)?;
        if result.rows_affected() == 0 {
            return Err(PortError::not_found("UtilityCard", card.id()));
        }
        Ok(())
    }

    async fn append_entry(&mut self, entry: &WalletTransaction) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO wallet_transactions \
             (id, wallet_id, kind, amount, balance_after, currency, related_id, \
              description, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(entry.id.into_uuid())
        .bind(entry.wallet_id.into_uuid())
        .bind(entry.kind.as_str())
        .bind(entry.amount.amount())
        .bind(entry.balance_after.amount())
        .bind(entry.amount.currency().code())
        .bind(entry.related_id)
        .bind(&entry.description)
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(port_err)?;
        Ok(())
    }

    async fn commit(self) -> Result<(), PortError> {
        self.tx.commit().await.map_err(port_err)
    }
}

/// PostgreSQL-backed property directory
#[derive(Debug, Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PgDirectory {}

#[async_trait]
impl PropertyDirectory for PgDirectory {
    #[instrument(skip(self))]
    async fn find_property(&self, id: PropertyId) -> Result<Property, PortError> {
        let row: Option<PropertyRow> = sqlx::query_as(
            "SELECT id, owner_id, building_no, unit_no, room_no FROM properties WHERE id = $1",
        )
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(port_err)?;
        row.map(Property::from)
            .ok_or_else(|| PortError::not_found("Property", id))
    }

    #[instrument(skip(self))]
    async fn properties_owned_by(&self, user_id: UserId) -> Result<Vec<Property>, PortError> {
        let rows: Vec<PropertyRow> = sqlx::query_as(
            "SELECT id, owner_id, building_no, unit_no, room_no FROM properties \
             WHERE owner_id = $1 ORDER BY building_no, unit_no, room_no",
        )
        .bind(user_id.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(port_err)?;
        Ok(rows.into_iter().map(Property::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_owner(&self, id: UserId) -> Result<Owner, PortError> {
        let row: Option<OwnerRow> =
            sqlx::query_as("SELECT id, name, phone FROM users WHERE id = $1")
                .bind(id.into_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(port_err)?;
        row.map(Owner::from)
            .ok_or_else(|| PortError::not_found("Owner", id))
    }
}
