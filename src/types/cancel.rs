//! Cancellation kinds, reasons, and phases.
//!
//! Cancellation is a protocol, not a silent drop. Eleven request kinds map
//! onto a six-level severity lattice; strengthening is total and monotone:
//! severity never decreases, and once a task sits at a given severity its
//! cleanup-poll allowance never grows. Each reason may carry an attribution
//! chain of the reasons it superseded, bounded in depth with an explicit
//! truncation flag.

use super::{Budget, RegionHandle, TaskHandle, Time};
use core::fmt;

/// Maximum depth of a reason's attribution chain.
pub const MAX_CAUSE_DEPTH: usize = 4;

/// Cleanup-poll allowance by severity class, index 0 (User) through 5
/// (Shutdown).
pub const CLEANUP_POLLS_BY_SEVERITY: [u32; 6] = [1000, 500, 300, 200, 200, 50];

/// Cleanup-lane priority by severity class.
pub const PRIORITY_BY_SEVERITY: [u8; 6] = [200, 210, 215, 220, 220, 255];

/// The kind of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CancelKind {
    /// Explicit cancellation requested by user code.
    User,
    /// A timeout elapsed.
    Timeout,
    /// A budget deadline passed.
    Deadline,
    /// Another branch of a race completed first.
    RaceLost,
    /// A sibling failed under fail-fast aggregation.
    FailFast,
    /// The owning region is closing.
    Parent,
    /// The enclosing scope exited.
    ScopeExit,
    /// Resource pressure forced the cancel.
    Resource,
    /// A fault in the same region forced the cancel.
    Fault,
    /// The owning region was poisoned.
    Poisoned,
    /// Runtime shutdown.
    Shutdown,
}

impl CancelKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::User,
        Self::Timeout,
        Self::Deadline,
        Self::RaceLost,
        Self::FailFast,
        Self::Parent,
        Self::ScopeExit,
        Self::Resource,
        Self::Fault,
        Self::Poisoned,
        Self::Shutdown,
    ];

    /// Returns the severity class of this kind (0 = USER ... 5 = SHUTDOWN).
    ///
    /// Higher severity cancellations take precedence when strengthening.
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::User => 0,
            Self::Timeout | Self::Deadline => 1,
            Self::RaceLost | Self::FailFast => 2,
            Self::Parent | Self::ScopeExit => 3,
            Self::Resource | Self::Fault | Self::Poisoned => 4,
            Self::Shutdown => 5,
        }
    }

    /// Returns the cleanup-poll allowance for this kind's severity class.
    #[must_use]
    pub const fn cleanup_polls(self) -> u32 {
        CLEANUP_POLLS_BY_SEVERITY[self.severity() as usize]
    }

    /// Returns the cleanup-lane priority for this kind's severity class.
    #[must_use]
    pub const fn priority(self) -> u8 {
        PRIORITY_BY_SEVERITY[self.severity() as usize]
    }

    /// Returns the cleanup budget granted to a task cancelled with this kind.
    ///
    /// User cancellation gets the most generous allowance; shutdown the
    /// tightest, at the highest priority. These allowances are what makes
    /// bounded cleanup a sufficient condition rather than a hope.
    #[must_use]
    pub const fn cleanup_budget(self) -> Budget {
        Budget::new()
            .with_poll_quota(self.cleanup_polls())
            .with_priority(self.priority())
    }
}

impl fmt::Display for CancelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Timeout => write!(f, "timeout"),
            Self::Deadline => write!(f, "deadline"),
            Self::RaceLost => write!(f, "race lost"),
            Self::FailFast => write!(f, "fail-fast"),
            Self::Parent => write!(f, "parent closing"),
            Self::ScopeExit => write!(f, "scope exit"),
            Self::Resource => write!(f, "resource pressure"),
            Self::Fault => write!(f, "sibling fault"),
            Self::Poisoned => write!(f, "region poisoned"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// The phase of a task's cancellation protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelPhase {
    /// No cancel is pending.
    Idle,
    /// Requested but not yet observed at a checkpoint.
    Requested,
    /// Observed; the task is cleaning up under its cleanup budget.
    Cancelling,
    /// Cleanup finished; awaiting scheduler teardown.
    Finalizing,
}

impl CancelPhase {
    /// Returns the phase name as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requested => "requested",
            Self::Cancelling => "cancelling",
            Self::Finalizing => "finalizing",
        }
    }
}

impl fmt::Display for CancelPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The reason for a cancellation: kind, attribution, and provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReason {
    /// The kind of cancellation.
    pub kind: CancelKind,
    /// The region the cancel originated from, if attributed.
    pub origin_region: Option<RegionHandle>,
    /// The task the cancel originated from, if attributed.
    pub origin_task: Option<TaskHandle>,
    /// When the request was recorded (logical time).
    pub timestamp: Time,
    /// Optional human-readable message (static for determinism).
    pub message: Option<&'static str>,
    /// The reason this one superseded, if any.
    cause: Option<Box<CancelReason>>,
    /// Set when the attribution chain was cut at [`MAX_CAUSE_DEPTH`].
    truncated: bool,
}

impl CancelReason {
    /// Creates a new reason with the given kind and no attribution.
    #[must_use]
    pub const fn new(kind: CancelKind) -> Self {
        Self {
            kind,
            origin_region: None,
            origin_task: None,
            timestamp: Time::ZERO,
            message: None,
            cause: None,
            truncated: false,
        }
    }

    /// Creates a user cancellation reason with a message.
    #[must_use]
    pub const fn user(message: &'static str) -> Self {
        let mut reason = Self::new(CancelKind::User);
        reason.message = Some(message);
        reason
    }

    /// Creates a parent-closing cancellation reason.
    #[must_use]
    pub const fn parent() -> Self {
        Self::new(CancelKind::Parent)
    }

    /// Creates a shutdown cancellation reason.
    #[must_use]
    pub const fn shutdown() -> Self {
        Self::new(CancelKind::Shutdown)
    }

    /// Returns a copy stamped with the given logical time.
    #[must_use]
    pub fn at(mut self, timestamp: Time) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Returns a copy with origin attribution.
    #[must_use]
    pub fn with_origin(
        mut self,
        region: Option<RegionHandle>,
        task: Option<TaskHandle>,
    ) -> Self {
        self.origin_region = region;
        self.origin_task = task;
        self
    }

    /// Returns a copy with a message.
    #[must_use]
    pub fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }

    /// Returns the kind of this reason.
    #[must_use]
    pub const fn kind(&self) -> CancelKind {
        self.kind
    }

    /// Returns the severity class of this reason's kind.
    #[must_use]
    pub const fn severity(&self) -> u8 {
        self.kind.severity()
    }

    /// Returns the superseded reason, if one is chained.
    #[must_use]
    pub fn cause(&self) -> Option<&Self> {
        self.cause.as_deref()
    }

    /// Returns the attribution-chain depth (0 for no cause).
    #[must_use]
    pub fn cause_depth(&self) -> usize {
        let mut depth = 0;
        let mut cursor = self.cause.as_deref();
        while let Some(r) = cursor {
            depth += 1;
            cursor = r.cause.as_deref();
        }
        depth
    }

    /// Returns `true` if the attribution chain was truncated.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Returns the cleanup budget for this reason's severity class.
    #[must_use]
    pub const fn cleanup_budget(&self) -> Budget {
        self.kind.cleanup_budget()
    }

    /// Chains `cause` under this reason, bounding the total depth.
    ///
    /// When the combined chain would exceed [`MAX_CAUSE_DEPTH`] the oldest
    /// links are dropped and the truncation flag is set.
    #[must_use]
    pub fn caused_by(mut self, cause: Self) -> Self {
        self.truncated |= cause.truncated;
        self.cause = Some(Box::new(cause));
        self.enforce_depth();
        self
    }

    fn enforce_depth(&mut self) {
        fn cut_below(reason: &mut CancelReason, depth: usize) -> bool {
            if depth == 0 {
                return reason.cause.take().is_some();
            }
            match reason.cause {
                Some(ref mut next) => cut_below(next, depth - 1),
                None => false,
            }
        }
        if cut_below(self, MAX_CAUSE_DEPTH) {
            self.truncated = true;
        }
    }

    /// Strengthens this reason with another, keeping the stronger one.
    ///
    /// Strength is severity first, then earlier timestamp, then the
    /// lexicographically smaller message. When the other reason wins, the
    /// superseded reason is pushed onto the attribution chain. Returns
    /// `true` if the reason changed.
    pub fn strengthen(&mut self, other: &Self) -> bool {
        if other.severity() > self.severity() {
            self.replace_with(other);
            return true;
        }
        if other.severity() < self.severity() {
            return false;
        }
        if other.timestamp < self.timestamp {
            self.replace_with(other);
            return true;
        }
        if other.timestamp > self.timestamp {
            return false;
        }
        match (self.message, other.message) {
            (None, Some(msg)) => {
                self.message = Some(msg);
                true
            }
            (Some(current), Some(candidate)) if candidate < current => {
                self.message = Some(candidate);
                true
            }
            _ => false,
        }
    }

    fn replace_with(&mut self, other: &Self) {
        let superseded = self.clone();
        self.kind = other.kind;
        self.origin_region = other.origin_region;
        self.origin_task = other.origin_task;
        self.timestamp = other.timestamp;
        self.message = other.message;
        self.truncated |= other.truncated;
        self.cause = Some(Box::new(superseded));
        self.enforce_depth();
    }
}

impl Default for CancelReason {
    fn default() -> Self {
        Self::new(CancelKind::User)
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(msg) = self.message {
            write!(f, ": {msg}")?;
        }
        if let Some(region) = self.origin_region {
            write!(f, " (from {region}")?;
            if let Some(task) = self.origin_task {
                write!(f, "/{task}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;

    fn init_test(test_name: &str) {
        init_test_logging();
        crate::test_phase!(test_name);
    }

    #[test]
    fn severity_lattice_has_six_levels() {
        init_test("severity_lattice_has_six_levels");
        let mut seen = [false; 6];
        for kind in CancelKind::ALL {
            seen[kind.severity() as usize] = true;
        }
        crate::assert_with_log!(seen.iter().all(|s| *s), "all levels", true, seen);
        crate::assert_with_log!(
            CancelKind::ALL.len() == 11,
            "eleven kinds",
            11,
            CancelKind::ALL.len()
        );
        crate::test_complete!("severity_lattice_has_six_levels");
    }

    #[test]
    fn cleanup_budget_scales_with_severity() {
        init_test("cleanup_budget_scales_with_severity");
        let user = CancelKind::User.cleanup_budget();
        crate::assert_with_log!(user.poll_quota == 1000, "user polls", 1000, user.poll_quota);
        let timeout = CancelKind::Timeout.cleanup_budget();
        crate::assert_with_log!(
            timeout.poll_quota == 500,
            "timeout polls",
            500,
            timeout.poll_quota
        );
        let race = CancelKind::RaceLost.cleanup_budget();
        crate::assert_with_log!(race.poll_quota == 300, "race polls", 300, race.poll_quota);
        let parent = CancelKind::Parent.cleanup_budget();
        crate::assert_with_log!(
            parent.poll_quota == 200,
            "parent polls",
            200,
            parent.poll_quota
        );
        let shutdown = CancelKind::Shutdown.cleanup_budget();
        crate::assert_with_log!(
            shutdown.poll_quota == 50,
            "shutdown polls",
            50,
            shutdown.poll_quota
        );
        crate::assert_with_log!(
            shutdown.priority == 255,
            "shutdown priority",
            255,
            shutdown.priority
        );
        crate::assert_with_log!(
            user.priority < shutdown.priority,
            "priority rises with severity",
            true,
            user.priority < shutdown.priority
        );
        crate::test_complete!("cleanup_budget_scales_with_severity");
    }

    #[test]
    fn strengthen_takes_more_severe() {
        init_test("strengthen_takes_more_severe");
        let mut reason = CancelReason::new(CancelKind::User).at(Time::from_nanos(1));
        let changed =
            reason.strengthen(&CancelReason::new(CancelKind::Timeout).at(Time::from_nanos(2)));
        crate::assert_with_log!(changed, "strengthened", true, changed);
        crate::assert_with_log!(
            reason.kind == CancelKind::Timeout,
            "kind",
            CancelKind::Timeout,
            reason.kind
        );

        let weaker = !reason.strengthen(&CancelReason::new(CancelKind::User).at(Time::ZERO));
        crate::assert_with_log!(weaker, "weaker ignored", true, weaker);
        crate::assert_with_log!(
            reason.kind == CancelKind::Timeout,
            "kind kept",
            CancelKind::Timeout,
            reason.kind
        );
        crate::test_complete!("strengthen_takes_more_severe");
    }

    #[test]
    fn strengthen_tie_prefers_earlier_timestamp() {
        init_test("strengthen_tie_prefers_earlier_timestamp");
        let mut reason = CancelReason::new(CancelKind::Timeout).at(Time::from_nanos(10));
        let earlier = CancelReason::new(CancelKind::Deadline).at(Time::from_nanos(5));
        let changed = reason.strengthen(&earlier);
        crate::assert_with_log!(changed, "earlier wins tie", true, changed);
        crate::assert_with_log!(
            reason.kind == CancelKind::Deadline,
            "kind",
            CancelKind::Deadline,
            reason.kind
        );
        crate::assert_with_log!(
            reason.timestamp == Time::from_nanos(5),
            "timestamp",
            Time::from_nanos(5),
            reason.timestamp
        );

        let later = CancelReason::new(CancelKind::Timeout).at(Time::from_nanos(20));
        let unchanged = !reason.strengthen(&later);
        crate::assert_with_log!(unchanged, "later loses tie", true, unchanged);
        crate::test_complete!("strengthen_tie_prefers_earlier_timestamp");
    }

    #[test]
    fn strengthen_same_instant_picks_deterministic_message() {
        init_test("strengthen_same_instant_picks_deterministic_message");
        let mut reason = CancelReason::user("b").at(Time::from_nanos(3));
        let changed = reason.strengthen(&CancelReason::user("a").at(Time::from_nanos(3)));
        crate::assert_with_log!(changed, "message changed", true, changed);
        crate::assert_with_log!(
            reason.message == Some("a"),
            "message",
            Some("a"),
            reason.message
        );
        crate::test_complete!("strengthen_same_instant_picks_deterministic_message");
    }

    #[test]
    fn strengthen_records_superseded_reason_as_cause() {
        init_test("strengthen_records_superseded_reason_as_cause");
        let mut reason = CancelReason::user("stop").at(Time::from_nanos(1));
        let changed = reason.strengthen(&CancelReason::shutdown().at(Time::from_nanos(2)));
        crate::assert_with_log!(changed, "strengthened", true, changed);
        let cause_kind = reason.cause().map(CancelReason::kind);
        crate::assert_with_log!(
            cause_kind == Some(CancelKind::User),
            "cause kind",
            Some(CancelKind::User),
            cause_kind
        );
        crate::test_complete!("strengthen_records_superseded_reason_as_cause");
    }

    #[test]
    fn strengthen_severity_is_monotone() {
        init_test("strengthen_severity_is_monotone");
        let mut reason = CancelReason::new(CancelKind::User);
        let sequence = [
            CancelKind::Shutdown,
            CancelKind::Timeout,
            CancelKind::Parent,
            CancelKind::User,
        ];
        let mut last = reason.severity();
        for (i, kind) in sequence.into_iter().enumerate() {
            let _ = reason.strengthen(&CancelReason::new(kind).at(Time::from_nanos(i as u64)));
            crate::assert_with_log!(
                reason.severity() >= last,
                "monotone severity",
                true,
                reason.severity() >= last
            );
            last = reason.severity();
        }
        crate::assert_with_log!(
            reason.kind == CancelKind::Shutdown,
            "ends at shutdown",
            CancelKind::Shutdown,
            reason.kind
        );
        crate::test_complete!("strengthen_severity_is_monotone");
    }

    #[test]
    fn cause_chain_is_depth_bounded_with_flag() {
        init_test("cause_chain_is_depth_bounded_with_flag");
        let mut reason = CancelReason::new(CancelKind::User).at(Time::from_nanos(100));
        for i in 0..8u64 {
            let kind = match i % 2 {
                0 => CancelKind::Timeout,
                _ => CancelKind::RaceLost,
            };
            // Alternating severities keep each request strictly stronger or a
            // tie won on timestamp, so the chain grows every iteration.
            let next = CancelReason::new(kind).at(Time::from_nanos(90 - i));
            let _ = reason.strengthen(&next);
        }
        crate::assert_with_log!(
            reason.cause_depth() <= MAX_CAUSE_DEPTH,
            "depth bounded",
            true,
            reason.cause_depth() <= MAX_CAUSE_DEPTH
        );
        crate::assert_with_log!(
            reason.is_truncated(),
            "truncated",
            true,
            reason.is_truncated()
        );
        crate::test_complete!("cause_chain_is_depth_bounded_with_flag");
    }

    #[test]
    fn caused_by_bounds_combined_chains() {
        init_test("caused_by_bounds_combined_chains");
        let mut chain = CancelReason::new(CancelKind::User);
        for _ in 0..MAX_CAUSE_DEPTH {
            chain = CancelReason::new(CancelKind::Timeout).caused_by(chain);
        }
        crate::assert_with_log!(
            chain.cause_depth() == MAX_CAUSE_DEPTH,
            "depth at bound",
            MAX_CAUSE_DEPTH,
            chain.cause_depth()
        );
        crate::assert_with_log!(
            !chain.is_truncated(),
            "no truncation at bound",
            false,
            chain.is_truncated()
        );

        let over = CancelReason::new(CancelKind::Shutdown).caused_by(chain);
        crate::assert_with_log!(
            over.cause_depth() == MAX_CAUSE_DEPTH,
            "depth clamped",
            MAX_CAUSE_DEPTH,
            over.cause_depth()
        );
        crate::assert_with_log!(over.is_truncated(), "truncated", true, over.is_truncated());
        crate::test_complete!("caused_by_bounds_combined_chains");
    }

    #[test]
    fn display_includes_attribution() {
        init_test("display_includes_attribution");
        let reason = CancelReason::new(CancelKind::Parent)
            .with_origin(Some(RegionHandle::from_parts(1, 1, 2)), None);
        let s = reason.to_string();
        crate::assert_with_log!(
            s.contains("parent closing"),
            "kind text",
            true,
            s.contains("parent closing")
        );
        crate::assert_with_log!(s.contains("R2"), "origin text", true, s.contains("R2"));
        crate::test_complete!("display_includes_attribution");
    }
}
