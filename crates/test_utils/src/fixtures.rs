//! Pre-built test fixtures
//!
//! Ready-to-use money amounts and a small seeded estate, consistent and
//! predictable across the test suite.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{Currency, Money, PropertyId, UserId};
use domain_property::{InMemoryDirectory, Owner, Property, PropertyDirectory};

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// A standard CNY amount
    pub fn cny_100() -> Money {
        Money::new(dec!(100.00), Currency::CNY)
    }

    /// A typical monthly property fee
    pub fn cny_fee() -> Money {
        Money::new(dec!(280.50), Currency::CNY)
    }

    /// The largest amount the default recharge ceiling admits
    pub fn cny_ceiling() -> Money {
        Money::new(dec!(1_000_000), Currency::CNY)
    }

    /// A zero CNY amount
    pub fn cny_zero() -> Money {
        Money::zero(Currency::CNY)
    }

    /// A USD amount for currency mismatch tests
    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }
}

/// Shorthand CNY constructor
pub fn cny(amount: Decimal) -> Money {
    Money::new(amount, Currency::CNY)
}

/// A small residential estate: two owners, four properties
///
/// Alice owns two properties (3-1-101 and 3-1-102), Bob owns one (5-2-201),
/// and `unowned_property` (9-1-999) has an empty owner slot for
/// missing-owner tests.
pub struct SeededEstate {
    pub directory: Arc<InMemoryDirectory>,
    pub alice: UserId,
    pub bob: UserId,
    pub alice_home: PropertyId,
    pub alice_second: PropertyId,
    pub bob_home: PropertyId,
    pub unowned_property: PropertyId,
}

impl SeededEstate {
    pub async fn seed() -> Self {
        let directory = InMemoryDirectory::new();

        let alice = UserId::new();
        let bob = UserId::new();
        directory
            .add_owner(Owner::new(alice, "Alice Chen", "13800000001"))
            .await;
        directory
            .add_owner(Owner::new(bob, "Bob Liu", "13800000002"))
            .await;

        let alice_home = Property::new(PropertyId::new(), Some(alice), "3", "1", "101");
        let alice_second = Property::new(PropertyId::new(), Some(alice), "3", "1", "102");
        let bob_home = Property::new(PropertyId::new(), Some(bob), "5", "2", "201");
        let unowned = Property::new(PropertyId::new(), None, "9", "1", "999");

        let estate = Self {
            alice,
            bob,
            alice_home: alice_home.id,
            alice_second: alice_second.id,
            bob_home: bob_home.id,
            unowned_property: unowned.id,
            directory: Arc::new(directory),
        };

        estate.directory.add_property(alice_home).await;
        estate.directory.add_property(alice_second).await;
        estate.directory.add_property(bob_home).await;
        estate.directory.add_property(unowned).await;
        estate
    }

    /// The directory as the trait object application code takes
    pub fn directory(&self) -> Arc<dyn PropertyDirectory> {
        self.directory.clone()
    }
}
