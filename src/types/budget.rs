//! Budgets bounding how much work the scheduler may do.
//!
//! A budget is the quadruple `(deadline, poll_quota, cost_quota, priority)`.
//! A zero deadline means "no deadline"; saturated quotas mean "unbounded".
//! Budgets are plain value types: `meet` combines them componentwise and
//! consumption mutates in place. The scheduler spends the poll quota; the
//! cancellation protocol reuses the same type for per-task cleanup budgets.

use super::Time;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Default scheduling priority for budgets that do not specify one.
pub const DEFAULT_PRIORITY: u8 = 128;

/// A work budget: deadline, poll quota, cost quota, and priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Budget {
    /// Absolute deadline; [`Time::ZERO`] means unconstrained.
    pub deadline: Time,
    /// Remaining polls; `u32::MAX` means unbounded.
    pub poll_quota: u32,
    /// Remaining abstract cost units; `u64::MAX` means unbounded.
    pub cost_quota: u64,
    /// Scheduling priority (higher is more urgent).
    pub priority: u8,
}

impl Budget {
    /// The unconstrained budget.
    pub const INFINITE: Self = Self {
        deadline: Time::ZERO,
        poll_quota: u32::MAX,
        cost_quota: u64::MAX,
        priority: DEFAULT_PRIORITY,
    };

    /// The budget that admits no work at all.
    pub const ZERO: Self = Self {
        deadline: Time::ZERO,
        poll_quota: 0,
        cost_quota: 0,
        priority: 0,
    };

    /// Creates an unconstrained budget (alias of [`Budget::INFINITE`]).
    #[must_use]
    pub const fn new() -> Self {
        Self::INFINITE
    }

    /// Creates an unconstrained budget.
    #[must_use]
    pub const fn infinite() -> Self {
        Self::INFINITE
    }

    /// Creates the empty budget.
    #[must_use]
    pub const fn zero() -> Self {
        Self::ZERO
    }

    /// Creates a budget bounded only by a poll quota.
    #[must_use]
    pub const fn from_polls(polls: u32) -> Self {
        Self {
            poll_quota: polls,
            ..Self::INFINITE
        }
    }

    /// Returns a copy with the given deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Time) -> Self {
        self.deadline = deadline;
        self
    }

    /// Returns a copy with the given poll quota.
    #[must_use]
    pub const fn with_poll_quota(mut self, polls: u32) -> Self {
        self.poll_quota = polls;
        self
    }

    /// Returns a copy with the given cost quota.
    #[must_use]
    pub const fn with_cost_quota(mut self, cost: u64) -> Self {
        self.cost_quota = cost;
        self
    }

    /// Returns a copy with the given priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Returns the remaining poll quota.
    #[must_use]
    pub const fn polls(&self) -> u32 {
        self.poll_quota
    }

    /// Componentwise greatest lower bound of two budgets.
    ///
    /// A zero deadline is absorbed as "no constraint" rather than as the
    /// earliest instant.
    #[must_use]
    pub fn meet(&self, other: &Self) -> Self {
        let deadline = match (self.deadline.is_zero(), other.deadline.is_zero()) {
            (true, true) => Time::ZERO,
            (true, false) => other.deadline,
            (false, true) => self.deadline,
            (false, false) => self.deadline.min(other.deadline),
        };
        Self {
            deadline,
            poll_quota: self.poll_quota.min(other.poll_quota),
            cost_quota: self.cost_quota.min(other.cost_quota),
            priority: self.priority.min(other.priority),
        }
    }

    /// Consumes one poll and returns the *pre-decrement* quota.
    ///
    /// A return of 0 means the budget was already exhausted and nothing was
    /// consumed.
    pub const fn consume_poll(&mut self) -> u32 {
        let before = self.poll_quota;
        if before > 0 && before != u32::MAX {
            self.poll_quota = before - 1;
        }
        before
    }

    /// Attempts to consume `cost` units, mutating only on success.
    pub const fn consume_cost(&mut self, cost: u64) -> bool {
        if self.cost_quota == u64::MAX {
            return true;
        }
        if self.cost_quota < cost {
            return false;
        }
        self.cost_quota -= cost;
        true
    }

    /// Returns `true` once either quota has run out.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.poll_quota == 0 || self.cost_quota == 0
    }

    /// Returns `true` once `now` is strictly past the deadline.
    ///
    /// A zero deadline never passes.
    #[must_use]
    pub const fn is_past_deadline(&self, now: Time) -> bool {
        !self.deadline.is_zero() && now.as_nanos() > self.deadline.as_nanos()
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::INFINITE
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "budget(polls=")?;
        if self.poll_quota == u32::MAX {
            write!(f, "inf")?;
        } else {
            write!(f, "{}", self.poll_quota)?;
        }
        write!(f, " cost=")?;
        if self.cost_quota == u64::MAX {
            write!(f, "inf")?;
        } else {
            write!(f, "{}", self.cost_quota)?;
        }
        if !self.deadline.is_zero() {
            write!(f, " deadline={}", self.deadline)?;
        }
        write!(f, " prio={})", self.priority)
    }
}
