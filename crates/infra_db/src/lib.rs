//! Infrastructure Database Layer
//!
//! PostgreSQL adapters for the billing core, built on SQLx:
//!
//! - [`PgStore`]: the transactional billing store (wallets, fees, cards,
//!   ledger) with `FOR UPDATE` row locking
//! - [`PgDirectory`]: the read-only property directory
//! - [`pool`]: connection pool configuration and embedded migrations
//!
//! Row types live in [`rows`]; every stored enum token maps back to its
//! domain type fallibly, so corrupt data surfaces as an error instead of a
//! panic.

pub mod error;
pub mod pool;
pub mod postgres;
pub mod rows;

pub use error::DatabaseError;
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use postgres::{PgDirectory, PgStore, PgTx};
