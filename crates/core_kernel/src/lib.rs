//! Core Kernel - Foundational types and utilities for the billing platform
//!
//! This crate provides the fundamental building blocks used across all domain
//! modules:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers
//! - Port abstractions shared by storage and collaborator adapters

pub mod identifiers;
pub mod money;
pub mod ports;

pub use identifiers::{CardId, FeeId, PropertyId, TransactionId, UserId, WalletId};
pub use money::{Currency, Money, MoneyError};
pub use ports::{DomainPort, PortError};
