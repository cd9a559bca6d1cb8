//! Fungible item inventories.
//!
//! Inventories map item names to quantities.  All quantities and their
//! "dual" multiplicands (per-unit space, prices) are bounded by one
//! billion, so any product of the two fits comfortably into 64 bits.
//! The backing map is ordered, which makes every iteration over an
//! inventory deterministic by construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::RoConfig;

/// Quantity of a fungible item.
pub type Quantity = i64;

/// The maximum valid item quantity.  Any move naming a larger number is
/// invalid, and the engine never lets a stored quantity exceed it.
pub const MAX_ITEM_QUANTITY: Quantity = 1_000_000_000;

/// The maximum value of any "dual" variable multiplied with quantities
/// (per-unit space, per-unit price).
pub const MAX_ITEM_DUAL: i64 = 1_000_000_000;

/// A fungible-item inventory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    fungible: BTreeMap<String, Quantity>,
}

impl Inventory {
    /// Create an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Quantity of the given item; zero when absent.
    #[must_use]
    pub fn count(&self, item: &str) -> Quantity {
        self.fungible.get(item).copied().unwrap_or(0)
    }

    /// Set the quantity of an item.  Zero removes the entry.
    ///
    /// # Panics
    ///
    /// Panics if the quantity is negative or above [`MAX_ITEM_QUANTITY`].
    pub fn set_count(&mut self, item: &str, count: Quantity) {
        assert!(
            (0..=MAX_ITEM_QUANTITY).contains(&count),
            "invalid item quantity {count} for {item}"
        );
        if count == 0 {
            self.fungible.remove(item);
        } else {
            self.fungible.insert(item.to_owned(), count);
        }
    }

    /// Add (or with a negative delta, remove) items.
    ///
    /// # Panics
    ///
    /// Panics if the resulting quantity would be negative or above the
    /// maximum; callers validate moves before applying them.
    pub fn add(&mut self, item: &str, delta: Quantity) {
        let count = self.count(item) + delta;
        self.set_count(item, count);
    }

    /// Whether the inventory holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fungible.is_empty()
    }

    /// Iterate over all positions in item-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Quantity)> {
        self.fungible.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Merge another inventory into this one.
    pub fn merge(&mut self, other: &Inventory) {
        for (item, count) in other.iter() {
            self.add(item, count);
        }
    }

    /// Total cargo space used by the inventory under the given item table.
    ///
    /// Unknown items take no space.
    #[must_use]
    pub fn used_space(&self, cfg: &RoConfig) -> u64 {
        self.iter()
            .map(|(item, count)| {
                let space = cfg.item(item).map_or(0, |i| i.space);
                product(count, space as i64) as u64
            })
            .sum()
    }

    /// Checked product of a quantity with a dual value.
    ///
    /// # Panics
    ///
    /// Panics if either factor is outside its validity bound; in that case
    /// the state already violates an invariant.
    #[must_use]
    pub fn product(amount: Quantity, dual: i64) -> i64 {
        product(amount, dual)
    }
}

fn product(amount: Quantity, dual: i64) -> i64 {
    assert!(
        amount.abs() <= MAX_ITEM_QUANTITY,
        "quantity {amount} out of bounds"
    );
    assert!(dual.abs() <= MAX_ITEM_DUAL, "dual value {dual} out of bounds");
    amount * dual
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Chain;

    #[test]
    fn counting_and_clearing() {
        let mut inv = Inventory::new();
        assert!(inv.is_empty());
        assert_eq!(inv.count("foo"), 0);

        inv.add("foo", 10);
        assert_eq!(inv.count("foo"), 10);
        assert!(!inv.is_empty());

        inv.add("foo", -10);
        assert_eq!(inv.count("foo"), 0);
        assert!(inv.is_empty(), "zero entries must be dropped");
    }

    #[test]
    fn iteration_is_name_ordered() {
        let mut inv = Inventory::new();
        inv.add("zeta", 1);
        inv.add("alpha", 2);
        inv.add("mid", 3);
        let names: Vec<_> = inv.iter().map(|(n, _)| n.to_owned()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn merge_adds_positions() {
        let mut a = Inventory::new();
        a.add("foo", 5);
        let mut b = Inventory::new();
        b.add("foo", 3);
        b.add("bar", 2);
        a.merge(&b);
        assert_eq!(a.count("foo"), 8);
        assert_eq!(a.count("bar"), 2);
    }

    #[test]
    #[should_panic(expected = "invalid item quantity")]
    fn negative_counts_are_fatal() {
        let mut inv = Inventory::new();
        inv.add("foo", -1);
    }

    #[test]
    #[should_panic(expected = "invalid item quantity")]
    fn overflowing_counts_are_fatal() {
        let mut inv = Inventory::new();
        inv.add("foo", MAX_ITEM_QUANTITY + 1);
    }

    #[test]
    fn product_is_bounded() {
        assert_eq!(Inventory::product(MAX_ITEM_QUANTITY, MAX_ITEM_DUAL), 10i64.pow(18));
    }

    #[test]
    fn used_space_multiplies_per_item() {
        let cfg = RoConfig::for_chain(Chain::Regtest);
        let mut inv = Inventory::new();
        inv.add("raw a", 7);
        inv.add("art r", 2);
        // raw a takes 10 per unit, art r takes 20.
        assert_eq!(inv.used_space(&cfg), 7 * 10 + 2 * 20);
    }
}
