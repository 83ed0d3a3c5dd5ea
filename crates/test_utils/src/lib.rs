//! Test Utilities Crate
//!
//! Provides shared test fixtures and helpers for the billing test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built money amounts and a seeded estate
//! - `assertions`: Custom assertion helpers for money values

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;
