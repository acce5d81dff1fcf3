//! Logical timestamps.
//!
//! In deterministic mode this is driven by the counter clock hook; under a
//! wall-clock hook it is nanoseconds since an arbitrary epoch. The zero
//! instant doubles as "unconstrained" in budget deadlines.

use core::fmt;
use serde::{Deserialize, Serialize};

/// A logical timestamp in nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Time(u64);

impl Time {
    /// The zero instant (epoch).
    pub const ZERO: Self = Self(0);

    /// The maximum representable instant.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates a new time from nanoseconds since epoch.
    #[inline]
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Creates a new time from milliseconds since epoch.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    /// Returns the time as nanoseconds since epoch.
    #[inline]
    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Returns `true` for the zero instant.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Adds a duration in nanoseconds, saturating on overflow.
    #[inline]
    #[must_use]
    pub const fn saturating_add_nanos(self, nanos: u64) -> Self {
        Self(self.0.saturating_add(nanos))
    }

    /// Returns the duration between two times in nanoseconds.
    ///
    /// Returns 0 if `self` is before `earlier`.
    #[inline]
    #[must_use]
    pub const fn duration_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Debug for Time {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Time({}ns)", self.0)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 1_000_000_000 {
            write!(
                f,
                "{}.{:03}s",
                self.0 / 1_000_000_000,
                (self.0 / 1_000_000) % 1000
            )
        } else if self.0 >= 1_000_000 {
            write!(f, "{}ms", self.0 / 1_000_000)
        } else if self.0 >= 1_000 {
            write!(f, "{}us", self.0 / 1_000)
        } else {
            write!(f, "{}ns", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_and_ordering() {
        assert_eq!(Time::from_millis(1).as_nanos(), 1_000_000);
        assert!(Time::from_nanos(1) < Time::from_nanos(2));
        assert!(Time::ZERO.is_zero());
        assert!(!Time::from_nanos(1).is_zero());
    }

    #[test]
    fn saturating_arithmetic() {
        assert_eq!(Time::MAX.saturating_add_nanos(1), Time::MAX);
        assert_eq!(Time::from_nanos(5).duration_since(Time::from_nanos(2)), 3);
        assert_eq!(Time::from_nanos(2).duration_since(Time::from_nanos(5)), 0);
    }

    #[test]
    fn display_picks_scale() {
        assert_eq!(format!("{}", Time::from_nanos(42)), "42ns");
        assert_eq!(format!("{}", Time::from_nanos(5_000)), "5us");
        assert_eq!(format!("{}", Time::from_millis(500)), "500ms");
        assert_eq!(format!("{}", Time::from_nanos(1_234_000_000)), "1.234s");
    }
}
