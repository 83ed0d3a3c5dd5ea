//! Property Domain - collaborator surface for the billing core
//!
//! The billing core treats the property-management system as an external
//! collaborator. This crate carries the records it exposes ([`Property`],
//! [`Owner`]), the read-only [`PropertyDirectory`] port, and an in-memory
//! adapter used by tests and demos.

pub mod adapters;
pub mod ports;
pub mod property;

pub use adapters::InMemoryDirectory;
pub use ports::PropertyDirectory;
pub use property::{Owner, Property};
