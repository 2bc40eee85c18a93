//! Miscellaneous utility structs and functions.

use std::fmt::Debug;

use cgmath::num_traits::Float;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An interval on the real number line.
#[derive(Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interval<T> {
    pub min: T,
    pub max: T,
}

impl<T> Interval<T> {
    /// Creates a new interval.
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: std::cmp::PartialOrd> Interval<T> {
    /// Returns true if this interval contains the value.
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }
}

impl<T: std::ops::Sub<T, Output = T> + Copy> Interval<T> {
    /// Gets the magnitude of the interval.
    pub fn length(&self) -> T {
        self.max - self.min
    }
}

impl<T: Float> Interval<T> {
    /// Creates the degenerate interval containing only `value`.
    pub fn point(value: T) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Clamps a value into the interval.
    pub fn clamp(&self, value: T) -> T {
        value.max(self.min).min(self.max)
    }

    /// Returns the smallest interval containing both this interval and `value`.
    pub fn extend(&self, value: T) -> Self {
        Self {
            min: self.min.min(value),
            max: self.max.max(value),
        }
    }
}

impl<T: Debug> Debug for Interval<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interval({:?}, {:?})", &self.min, &self.max)
    }
}

#[cfg(test)]
mod test {
    use super::Interval;

    #[test]
    fn clamp_and_extend() {
        let range = Interval::new(2.0, 8.0);
        assert_eq!(range.clamp(-1.0), 2.0);
        assert_eq!(range.clamp(5.0), 5.0);
        assert_eq!(range.clamp(10.0), 8.0);

        let range = range.extend(12.0).extend(0.0);
        assert_eq!(range, Interval::new(0.0, 12.0));
        assert_eq!(range.length(), 12.0);
        assert!(range.contains(12.0));
        assert!(!range.contains(12.5));
    }
}
