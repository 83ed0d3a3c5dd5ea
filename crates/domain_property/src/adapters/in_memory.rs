//! In-memory property directory
//!
//! A thread-safe directory backed by hash maps, for tests and demos where
//! the real property system of record is not available.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use core_kernel::{DomainPort, PortError, PropertyId, UserId};

use crate::ports::PropertyDirectory;
use crate::property::{Owner, Property};

#[derive(Default)]
struct DirectoryState {
    properties: HashMap<PropertyId, Property>,
    owners: HashMap<UserId, Owner>,
}

/// A thread-safe in-memory implementation of [`PropertyDirectory`]
#[derive(Default, Clone)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an owner
    pub async fn add_owner(&self, owner: Owner) {
        let mut state = self.state.write().await;
        state.owners.insert(owner.id, owner);
    }

    /// Registers a property
    pub async fn add_property(&self, property: Property) {
        let mut state = self.state.write().await;
        state.properties.insert(property.id, property);
    }
}

impl DomainPort for InMemoryDirectory {}

#[async_trait]
impl PropertyDirectory for InMemoryDirectory {
    async fn find_property(&self, id: PropertyId) -> Result<Property, PortError> {
        let state = self.state.read().await;
        state
            .properties
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Property", id))
    }

    async fn properties_owned_by(&self, user_id: UserId) -> Result<Vec<Property>, PortError> {
        let state = self.state.read().await;
        Ok(state
            .properties
            .values()
            .filter(|p| p.owner_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn find_owner(&self, id: UserId) -> Result<Owner, PortError> {
        let state = self.state.read().await;
        state
            .owners
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Owner", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_property_round_trip() {
        let dir = InMemoryDirectory::new();
        let owner = UserId::new();
        let property = Property::new(PropertyId::new(), Some(owner), "1", "1", "101");
        dir.add_property(property.clone()).await;

        let found = dir.find_property(property.id).await.unwrap();
        assert_eq!(found, property);

        let owned = dir.properties_owned_by(owner).await.unwrap();
        assert_eq!(owned.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_owner_is_not_found() {
        let dir = InMemoryDirectory::new();
        let err = dir.find_owner(UserId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unknown_user_owns_nothing() {
        let dir = InMemoryDirectory::new();
        let owned = dir.properties_owned_by(UserId::new()).await.unwrap();
        assert!(owned.is_empty());
    }
}
