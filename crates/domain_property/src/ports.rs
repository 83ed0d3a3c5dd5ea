//! Property domain port
//!
//! The `PropertyDirectory` trait defines everything the billing core needs
//! from the property/owner system of record. Multiple adapters can implement
//! it:
//!
//! - **Internal adapter**: reads the collaborator's tables (infra_db)
//! - **In-memory adapter**: for tests and demos ([`crate::adapters`])
//!
//! Application services receive the port as `Arc<dyn PropertyDirectory>`;
//! the choice of adapter is made at startup.

use async_trait::async_trait;

use core_kernel::{DomainPort, PortError, PropertyId, UserId};

use crate::property::{Owner, Property};

/// Read-only access to properties and their owners
#[async_trait]
pub trait PropertyDirectory: DomainPort {
    /// Resolves a property by id
    ///
    /// # Errors
    ///
    /// Returns `PortError::NotFound` if the property does not exist.
    async fn find_property(&self, id: PropertyId) -> Result<Property, PortError>;

    /// Lists every property owned by the given user
    ///
    /// An unknown user yields an empty list rather than an error; the
    /// collaborator does not distinguish "no such user" from "owns nothing"
    /// on this query.
    async fn properties_owned_by(&self, user_id: UserId) -> Result<Vec<Property>, PortError>;

    /// Resolves an owner by id
    ///
    /// # Errors
    ///
    /// Returns `PortError::NotFound` if the owner does not exist.
    async fn find_owner(&self, id: UserId) -> Result<Owner, PortError>;
}
