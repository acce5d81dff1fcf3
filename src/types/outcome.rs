//! Task outcomes and the severity lattice.
//!
//! Outcomes form the total order `Ok < Err < Cancelled < Panicked`. Joining
//! two outcomes keeps the more severe one, so a cancel pending at terminal
//! upgrades an `Err` to `Cancelled` and nothing ever downgrades.

use core::fmt;
use serde::{Deserialize, Serialize};

/// The terminal outcome of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Outcome {
    /// Completed successfully.
    Ok = 0,
    /// The poll function returned a fault.
    Err = 1,
    /// Torn down by the cancellation protocol.
    Cancelled = 2,
    /// The body panicked (collaborator-reported; the core never panics).
    Panicked = 3,
}

impl Outcome {
    /// Returns the lattice severity of this outcome.
    #[must_use]
    pub const fn severity(self) -> u8 {
        self as u8
    }

    /// Returns `true` for a successful completion.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Returns `true` if the task was cancelled.
    #[must_use]
    pub const fn is_cancelled(self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Joins two outcomes, keeping the more severe.
    #[must_use]
    pub const fn join(self, other: Self) -> Self {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Err => write!(f, "err"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Panicked => write!(f, "panicked"),
        }
    }
}

/// Joins a sequence of outcomes under the severity lattice.
///
/// An empty sequence joins to `Ok`.
#[must_use]
pub fn join_outcomes<I: IntoIterator<Item = Outcome>>(outcomes: I) -> Outcome {
    outcomes
        .into_iter()
        .fold(Outcome::Ok, Outcome::join)
}
