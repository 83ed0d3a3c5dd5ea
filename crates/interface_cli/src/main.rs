//! Operator command-line interface for the billing core
//!
//! Wires the PostgreSQL adapters into the domain services and exposes one
//! subcommand per billing operation. Results print as JSON so the output
//! can be piped into other tooling.

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use core_kernel::{CardId, FeeId, Money, PropertyId, UserId};
use domain_billing::{
    BillingPolicy, CallerRole, CardAccount, FeeCategory, FeeLedger, PaymentService, WalletAccount,
};
use domain_property::PropertyDirectory;
use infra_db::{create_pool, run_migrations, DatabaseConfig, PgDirectory, PgStore};

use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "billing", about = "Residential billing operations", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply database migrations
    Migrate,
    /// Credit a user's wallet
    Recharge {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        amount: Decimal,
    },
    /// Show a user's wallet balance
    Balance {
        #[arg(long)]
        user: UserId,
    },
    /// Show a user's wallet ledger, newest first
    History {
        #[arg(long)]
        user: UserId,
    },
    /// Create a fee bill for one property
    CreateFee {
        #[arg(long)]
        property: PropertyId,
        #[arg(long)]
        category: FeeCategory,
        #[arg(long)]
        amount: Decimal,
    },
    /// Create the same fee bill for several properties, all or nothing
    BatchCreateFees {
        #[arg(long = "property", required = true)]
        properties: Vec<PropertyId>,
        #[arg(long)]
        category: FeeCategory,
        #[arg(long)]
        amount: Decimal,
    },
    /// Settle a wallet-channel fee from the owner's wallet
    PayFee {
        #[arg(long)]
        fee: FeeId,
        /// Settle on the owner's behalf at the counter
        #[arg(long)]
        admin: bool,
    },
    /// Settle a card-channel fee from the property's utility card
    PayFeeFromCard {
        #[arg(long)]
        fee: FeeId,
    },
    /// Issue the property's water and electricity cards if missing
    EnsureCards {
        #[arg(long)]
        property: PropertyId,
    },
    /// Move money from a user's wallet onto one of their cards
    TopUp {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        card: CardId,
        #[arg(long)]
        amount: Decimal,
    },
    /// Credit a card with cash paid at the counter
    TopUpDirect {
        #[arg(long)]
        card: CardId,
        #[arg(long)]
        amount: Decimal,
    },
    /// List a user's utility cards with property locations
    Cards {
        #[arg(long)]
        user: UserId,
    },
    /// List unpaid fees on one property, oldest first
    Unpaid {
        #[arg(long)]
        property: PropertyId,
    },
    /// Report every unpaid fee with owner contact details
    Arrears,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct BalanceOutput {
    balance: Option<Money>,
}

#[derive(Serialize)]
struct CountOutput {
    created: usize,
}

#[derive(Serialize)]
struct FeeCreatedOutput {
    fee_id: FeeId,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let cfg = CliConfig::from_env().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cfg.log_level).context("parsing log level")?)
        .with_writer(std::io::stderr)
        .init();

    let pool = create_pool(
        DatabaseConfig::new(&cfg.database_url).max_connections(cfg.max_connections),
    )
    .await
    .context("connecting to database")?;
    debug!("database pool ready");

    if let Command::Migrate = cli.command {
        run_migrations(&pool).await.context("running migrations")?;
        eprintln!("migrations applied");
        return Ok(());
    }

    let store = PgStore::new(pool.clone());
    let directory: Arc<dyn PropertyDirectory> = Arc::new(PgDirectory::new(pool));
    let policy = BillingPolicy::default();

    let wallets = WalletAccount::new(store.clone(), policy);
    let fees = FeeLedger::new(store.clone(), directory.clone(), policy);
    let cards = CardAccount::new(store.clone(), directory.clone(), policy);
    let payments = PaymentService::new(store, directory, policy);

    let cny = |amount: Decimal| Money::new(amount, policy.currency());

    match cli.command {
        Command::Migrate => unreachable!("handled above"),
        Command::Recharge { user, amount } => {
            let entry = wallets.recharge(user, cny(amount)).await?;
            print_json(&entry)?;
        }
        Command::Balance { user } => {
            let balance = wallets.balance_of(user).await?;
            print_json(&BalanceOutput { balance })?;
        }
        Command::History { user } => {
            let history = wallets.transaction_history(user).await?;
            print_json(&history)?;
        }
        Command::CreateFee {
            property,
            category,
            amount,
        } => {
            let fee_id = fees.create_fee(property, category, cny(amount)).await?;
            print_json(&FeeCreatedOutput { fee_id })?;
        }
        Command::BatchCreateFees {
            properties,
            category,
            amount,
        } => {
            let created = fees
                .batch_create_fees(&properties, category, cny(amount))
                .await?;
            print_json(&CountOutput { created })?;
        }
        Command::PayFee { fee, admin } => {
            let role = if admin {
                CallerRole::Admin
            } else {
                CallerRole::Owner
            };
            let entry = payments.pay_fee_from_wallet(fee, role).await?;
            print_json(&entry)?;
        }
        Command::PayFeeFromCard { fee } => {
            let remaining = payments.pay_fee_from_card(fee).await?;
            print_json(&BalanceOutput {
                balance: Some(remaining),
            })?;
        }
        Command::EnsureCards { property } => {
            let (water, elec) = cards.ensure_cards(property).await?;
            print_json(&vec![water, elec])?;
        }
        Command::TopUp { user, card, amount } => {
            let entry = payments
                .top_up_card_from_wallet(user, card, cny(amount))
                .await?;
            print_json(&entry)?;
        }
        Command::TopUpDirect { card, amount } => {
            let balance = cards.top_up_direct(card, cny(amount)).await?;
            print_json(&BalanceOutput {
                balance: Some(balance),
            })?;
        }
        Command::Cards { user } => {
            let views = cards.cards_of_user(user).await?;
            print_json(&views)?;
        }
        Command::Unpaid { property } => {
            let unpaid = fees.unpaid_fees(property).await?;
            print_json(&unpaid)?;
        }
        Command::Arrears => {
            let report = fees.arrears_report().await?;
            print_json(&report)?;
        }
    }

    Ok(())
}
