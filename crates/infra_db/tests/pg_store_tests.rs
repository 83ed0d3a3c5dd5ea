//! PostgreSQL adapter tests
//!
//! These run against a live database and are ignored by default:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/billing_test cargo test -p infra_db -- --ignored
//! ```

use std::sync::Arc;

use rust_decimal_macros::dec;
use uuid::Uuid;

use core_kernel::{Currency, Money, PropertyId, UserId};
use domain_billing::{
    BillingError, BillingPolicy, CallerRole, CardAccount, FeeCategory, FeeLedger, PaymentService,
    TransactionKind, WalletAccount,
};
use domain_property::PropertyDirectory;
use infra_db::{create_pool, run_migrations, DatabaseConfig, DatabasePool, PgDirectory, PgStore};

fn cny(amount: rust_decimal::Decimal) -> Money {
    Money::new(amount, Currency::CNY)
}

async fn test_pool() -> DatabasePool {
    let url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must point at a disposable test database");
    let pool = create_pool(DatabaseConfig::new(url).max_connections(5))
        .await
        .expect("pool");
    run_migrations(&pool).await.expect("migrations");
    pool
}

async fn seed_owner_with_property(pool: &DatabasePool) -> (UserId, PropertyId) {
    let user = UserId::new();
    let property = PropertyId::new();

    sqlx::query("INSERT INTO users (id, name, phone) VALUES ($1, $2, $3)")
        .bind(*user.as_uuid())
        .bind(format!("resident-{}", Uuid::new_v4()))
        .bind("13800000000")
        .execute(pool)
        .await
        .expect("seed user");
    sqlx::query(
        "INSERT INTO properties (id, owner_id, building_no, unit_no, room_no) \
         VALUES ($1, $2, '3', '2', '501')",
    )
    .bind(*property.as_uuid())
    .bind(*user.as_uuid())
    .execute(pool)
    .await
    .expect("seed property");

    (user, property)
}

#[tokio::test]
#[ignore]
async fn test_recharge_and_fee_payment_round_trip() {
    let pool = test_pool().await;
    let (user, property) = seed_owner_with_property(&pool).await;

    let store = PgStore::new(pool.clone());
    let directory: Arc<dyn PropertyDirectory> = Arc::new(PgDirectory::new(pool.clone()));
    let policy = BillingPolicy::default();

    let wallets = WalletAccount::new(store.clone(), policy);
    let fees = FeeLedger::new(store.clone(), directory.clone(), policy);
    let payments = PaymentService::new(store.clone(), directory, policy);

    wallets.recharge(user, cny(dec!(500))).await.unwrap();
    let fee_id = fees
        .create_fee(property, FeeCategory::Property, cny(dec!(120.50)))
        .await
        .unwrap();

    let entry = payments
        .pay_fee_from_wallet(fee_id, CallerRole::Owner)
        .await
        .unwrap();
    assert_eq!(entry.kind, TransactionKind::PayFee);
    assert_eq!(entry.balance_after, cny(dec!(379.50)));

    let balance = wallets.balance_of(user).await.unwrap().unwrap();
    assert_eq!(balance, cny(dec!(379.50)));

    let history = wallets.transaction_history(user).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].kind, TransactionKind::PayFee);
}

#[tokio::test]
#[ignore]
async fn test_failed_payment_rolls_back_all_rows() {
    let pool = test_pool().await;
    let (user, property) = seed_owner_with_property(&pool).await;

    let store = PgStore::new(pool.clone());
    let directory: Arc<dyn PropertyDirectory> = Arc::new(PgDirectory::new(pool.clone()));
    let policy = BillingPolicy::default();

    let wallets = WalletAccount::new(store.clone(), policy);
    let fees = FeeLedger::new(store.clone(), directory.clone(), policy);
    let payments = PaymentService::new(store.clone(), directory, policy);

    wallets.recharge(user, cny(dec!(50))).await.unwrap();
    let fee_id = fees
        .create_fee(property, FeeCategory::Heating, cny(dec!(80)))
        .await
        .unwrap();

    let result = payments.pay_fee_from_wallet(fee_id, CallerRole::Owner).await;
    assert!(matches!(result, Err(BillingError::InsufficientFunds { .. })));

    assert_eq!(wallets.balance_of(user).await.unwrap().unwrap(), cny(dec!(50)));
    assert!(fees.is_property_arrears(property).await.unwrap());
    assert_eq!(wallets.transaction_history(user).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_card_issue_arrears_gate_and_direct_topup() {
    let pool = test_pool().await;
    let (user, property) = seed_owner_with_property(&pool).await;

    let store = PgStore::new(pool.clone());
    let directory: Arc<dyn PropertyDirectory> = Arc::new(PgDirectory::new(pool.clone()));
    let policy = BillingPolicy::default();

    let wallets = WalletAccount::new(store.clone(), policy);
    let fees = FeeLedger::new(store.clone(), directory.clone(), policy);
    let cards = CardAccount::new(store.clone(), directory.clone(), policy);
    let payments = PaymentService::new(store.clone(), directory, policy);

    let (water, _elec) = cards.ensure_cards(property).await.unwrap();

    let fee_id = fees
        .create_fee(property, FeeCategory::Property, cny(dec!(100)))
        .await
        .unwrap();

    let result = cards.top_up_direct(water.id(), cny(dec!(30))).await;
    assert!(matches!(result, Err(BillingError::ArrearsLocked { .. })));

    wallets.recharge(user, cny(dec!(200))).await.unwrap();
    payments
        .pay_fee_from_wallet(fee_id, CallerRole::Owner)
        .await
        .unwrap();

    let balance = cards.top_up_direct(water.id(), cny(dec!(30))).await.unwrap();
    assert_eq!(balance, cny(dec!(30)));
}
