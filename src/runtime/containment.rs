//! Containment policy: what happens when a task poll faults.

use core::fmt;

/// How the runtime contains a fault returned by a task poll.
///
/// The policy is selected by the active safety profile and applied whenever
/// a poll returns a status that is neither ready nor pending. It never
/// affects entities outside the faulting task's region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainmentPolicy {
    /// Bubble the fault immediately; the caller aborts. Debug default.
    FailFast,
    /// Poison the owning region and cancel its surviving tasks with
    /// resource severity; the fault is still returned. Hardened default.
    PoisonRegion,
    /// Return the fault with no side effects. Release default.
    ErrorOnly,
}

impl ContainmentPolicy {
    /// Returns the policy name as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FailFast => "fail-fast",
            Self::PoisonRegion => "poison-region",
            Self::ErrorOnly => "error-only",
        }
    }

    /// Returns `true` when the poll loop must stop at the fault.
    #[must_use]
    pub const fn stops_the_run(self) -> bool {
        matches!(self, Self::FailFast)
    }

    /// Returns `true` when the owning region is poisoned on fault.
    #[must_use]
    pub const fn poisons_region(self) -> bool {
        matches!(self, Self::PoisonRegion)
    }
}

impl fmt::Display for ContainmentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_match_policy() {
        assert!(ContainmentPolicy::FailFast.stops_the_run());
        assert!(!ContainmentPolicy::PoisonRegion.stops_the_run());
        assert!(ContainmentPolicy::PoisonRegion.poisons_region());
        assert!(!ContainmentPolicy::ErrorOnly.poisons_region());
    }

    #[test]
    fn display_names() {
        assert_eq!(ContainmentPolicy::FailFast.to_string(), "fail-fast");
        assert_eq!(ContainmentPolicy::PoisonRegion.to_string(), "poison-region");
        assert_eq!(ContainmentPolicy::ErrorOnly.to_string(), "error-only");
    }
}
