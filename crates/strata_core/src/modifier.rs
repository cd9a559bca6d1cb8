//! Percentage-based stat modifiers.
//!
//! Fitments, low-HP boosts and combat effects all express their influence
//! as a relative percentage on some base stat.  Modifiers from multiple
//! sources add their percentages before being applied, so the combination
//! is independent of the order in which sources are collected.

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// A relative stat modification in percent.
///
/// `+50` raises a stat by half, `-100` zeroes it.  Applying the neutral
/// modifier returns the input unchanged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StatModifier {
    /// Summed percentage points of all contributing sources.
    pub percent: i64,
}

impl StatModifier {
    /// Create a modifier from a percentage value.
    #[must_use]
    pub const fn new(percent: i64) -> Self {
        Self { percent }
    }

    /// Whether this modifier leaves values unchanged.
    #[must_use]
    pub const fn is_neutral(self) -> bool {
        self.percent == 0
    }

    /// Apply the modifier to a base value.
    ///
    /// The relative change truncates toward zero, matching integer
    /// division semantics everywhere else in the engine.  The result is
    /// clamped at zero: a stat can be reduced to nothing but never below.
    #[must_use]
    pub fn apply(self, value: i64) -> i64 {
        let modified = value + value * self.percent / 100;
        modified.max(0)
    }

    /// Apply the modifier to an unsigned stat value.
    #[must_use]
    pub fn apply_u32(self, value: u32) -> u32 {
        let modified = self.apply(i64::from(value));
        u32::try_from(modified).unwrap_or(u32::MAX)
    }
}

impl AddAssign for StatModifier {
    fn add_assign(&mut self, other: Self) {
        self.percent += other.percent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_is_identity() {
        let m = StatModifier::default();
        assert!(m.is_neutral());
        assert_eq!(m.apply(1_234), 1_234);
        assert_eq!(m.apply(0), 0);
    }

    #[test]
    fn positive_and_negative_percentages() {
        assert_eq!(StatModifier::new(50).apply(100), 150);
        assert_eq!(StatModifier::new(-25).apply(100), 75);
        assert_eq!(StatModifier::new(200).apply(10), 30);
    }

    #[test]
    fn truncation_toward_zero() {
        // 10 * 33 / 100 = 3 (truncated).
        assert_eq!(StatModifier::new(33).apply(10), 13);
        assert_eq!(StatModifier::new(-33).apply(10), 7);
    }

    #[test]
    fn clamping_at_zero() {
        assert_eq!(StatModifier::new(-150).apply(100), 0);
        assert_eq!(StatModifier::new(-150).apply_u32(7), 0);
    }

    #[test]
    fn modifiers_accumulate_additively() {
        let mut m = StatModifier::new(30);
        m += StatModifier::new(-10);
        assert_eq!(m.percent, 20);
        assert_eq!(m.apply(100), 120);
    }
}
