//! Billing domain: wallets, fee bills, utility cards, and the payment
//! coordinator
//!
//! The crate is organized around four account concepts and one coordinator:
//!
//! - [`wallet`]: a user's prepaid balance and its recharge/history service
//! - [`fee`]: bills with category-derived settlement channels and the
//!   arrears predicates
//! - [`card`]: per-property water and electricity prepaid cards
//! - [`transaction`]: the append-only wallet ledger
//! - [`coordinator`]: the operations that move money across entities inside
//!   one storage transaction
//!
//! Storage is abstracted behind [`ports::BillingStore`]; [`memory`] provides
//! the in-memory adapter used by tests and local development.

pub mod card;
pub mod coordinator;
pub mod error;
pub mod fee;
pub mod memory;
pub mod policy;
pub mod ports;
pub mod transaction;
pub mod wallet;

pub use card::{CardAccount, CardType, CardView, UtilityCard};
pub use coordinator::{CallerRole, PaymentService};
pub use error::BillingError;
pub use fee::{ArrearsRecord, Fee, FeeCategory, FeeLedger, SettlementChannel};
pub use memory::MemoryStore;
pub use policy::BillingPolicy;
pub use ports::{BillingStore, BillingTx};
pub use transaction::{TransactionKind, TransactionRecorder, WalletTransaction};
pub use wallet::{Wallet, WalletAccount};
