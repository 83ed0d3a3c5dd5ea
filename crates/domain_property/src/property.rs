//! Property and owner records
//!
//! These records mirror what the property-management collaborator exposes.
//! The billing core never mutates them; it only resolves ownership and
//! location details through the [`crate::ports::PropertyDirectory`] port.

use serde::{Deserialize, Serialize};

use core_kernel::{PropertyId, UserId};

/// A residential unit registered with the property system of record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// Unique identifier
    pub id: PropertyId,
    /// Owning user, if the unit has been assigned to one
    pub owner_id: Option<UserId>,
    /// Building number within the estate
    pub building_no: String,
    /// Unit (entrance/stairwell) number within the building
    pub unit_no: String,
    /// Room number within the unit
    pub room_no: String,
}

impl Property {
    /// Creates a property record
    pub fn new(
        id: PropertyId,
        owner_id: Option<UserId>,
        building_no: impl Into<String>,
        unit_no: impl Into<String>,
        room_no: impl Into<String>,
    ) -> Self {
        Self {
            id,
            owner_id,
            building_no: building_no.into(),
            unit_no: unit_no.into(),
            room_no: room_no.into(),
        }
    }

    /// Human-readable location, e.g. "3-2-501"
    pub fn location(&self) -> String {
        format!("{}-{}-{}", self.building_no, self.unit_no, self.room_no)
    }
}

/// A property owner as known to the collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Unique identifier
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Contact phone number
    pub phone: String,
}

impl Owner {
    /// Creates an owner record
    pub fn new(id: UserId, name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            phone: phone.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_format() {
        let p = Property::new(PropertyId::new(), None, "3", "2", "501");
        assert_eq!(p.location(), "3-2-501");
    }
}
