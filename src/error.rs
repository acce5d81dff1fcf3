//! Error types for the Cordon runtime.
//!
//! Every fallible operation in the core returns [`Error`], which wraps an
//! [`ErrorKind`] drawn from a single open taxonomy with stable integer codes.
//! Collaborators (codecs, trace sinks, vertical adapters) extend the taxonomy
//! at the high end; the core never reinterprets a code it does not know.

use core::fmt;

/// The kind of a runtime error.
///
/// Codes are stable: they never change once assigned, and serialized fixtures
/// rely on them. `Ok` and `Pending` are status values rather than failures;
/// they exist so the taxonomy covers the full status-code space and are never
/// carried inside an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum ErrorKind {
    /// Success status (never an error).
    Ok = 0,
    /// Operation is not ready yet (never an error).
    Pending = 1,
    /// An argument was malformed or out of range.
    InvalidArgument = 2,
    /// The entity is in a state that forbids the operation.
    InvalidState = 3,
    /// No entity matches the handle.
    NotFound = 4,
    /// An entity with this identity already exists.
    AlreadyExists = 5,
    /// The requested lifecycle transition is not legal.
    InvalidTransition = 6,
    /// No region matches the handle.
    RegionNotFound = 7,
    /// The region has reached its terminal state.
    RegionClosed = 8,
    /// The region cannot accept more tasks or obligations.
    RegionAtCapacity = 9,
    /// The operation requires an OPEN region.
    RegionNotOpen = 10,
    /// The region is poisoned and rejects new work.
    RegionPoisoned = 11,
    /// No task matches the handle.
    TaskNotFound = 12,
    /// The task has not reached a terminal state yet.
    TaskNotCompleted = 13,
    /// The scheduler's poll budget ran out before quiescence.
    PollBudgetExhausted = 14,
    /// The obligation was already committed or aborted.
    ObligationAlreadyResolved = 15,
    /// A region cannot finalize while obligations are still reserved.
    ObligationsUnresolved = 16,
    /// The operation was cancelled.
    Cancelled = 17,
    /// A cancel witness observed a phase moving backwards.
    WitnessPhaseRegression = 18,
    /// A cancel witness observed a reason losing severity.
    WitnessReasonWeakened = 19,
    /// A cancel witness was presented for the wrong task.
    WitnessTaskMismatch = 20,
    /// A cancel witness was presented for the wrong region.
    WitnessRegionMismatch = 21,
    /// A cancel witness was presented for a stale cancel epoch.
    WitnessEpochMismatch = 22,
    /// A bounded structure is full.
    ResourceExhausted = 23,
    /// The handle's generation no longer matches the slot.
    StaleHandle = 24,
    /// A mandatory hook is not installed.
    HookMissing = 25,
    /// A hook is installed but inconsistent with its declared capabilities.
    HookInvalid = 26,
    /// A hook configuration violates deterministic-mode requirements.
    DeterminismViolation = 27,
    /// The allocator seal latch is set.
    AllocatorSealed = 28,
    /// The region has not reached quiescence.
    QuiescenceNotReached = 29,
    /// Live tasks prevent quiescence.
    QuiescenceTasksLive = 30,
    /// A replayed event stream diverged from the recorded one.
    ReplayMismatch = 31,
    /// A caller-supplied buffer is too small.
    BufferTooSmall = 32,
    /// Two runs expected to be equivalent were not.
    EquivalenceMismatch = 33,
}

impl ErrorKind {
    /// Returns the stable integer code for this kind.
    #[must_use]
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Returns a short English description of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Pending => "pending",
            Self::InvalidArgument => "invalid argument",
            Self::InvalidState => "invalid state",
            Self::NotFound => "not found",
            Self::AlreadyExists => "already exists",
            Self::InvalidTransition => "invalid transition",
            Self::RegionNotFound => "region not found",
            Self::RegionClosed => "region closed",
            Self::RegionAtCapacity => "region at capacity",
            Self::RegionNotOpen => "region not open",
            Self::RegionPoisoned => "region poisoned",
            Self::TaskNotFound => "task not found",
            Self::TaskNotCompleted => "task not completed",
            Self::PollBudgetExhausted => "poll budget exhausted",
            Self::ObligationAlreadyResolved => "obligation already resolved",
            Self::ObligationsUnresolved => "obligations unresolved",
            Self::Cancelled => "cancelled",
            Self::WitnessPhaseRegression => "witness phase regression",
            Self::WitnessReasonWeakened => "witness reason weakened",
            Self::WitnessTaskMismatch => "witness task mismatch",
            Self::WitnessRegionMismatch => "witness region mismatch",
            Self::WitnessEpochMismatch => "witness epoch mismatch",
            Self::ResourceExhausted => "resource exhausted",
            Self::StaleHandle => "stale handle",
            Self::HookMissing => "hook missing",
            Self::HookInvalid => "hook invalid",
            Self::DeterminismViolation => "determinism violation",
            Self::AllocatorSealed => "allocator sealed",
            Self::QuiescenceNotReached => "quiescence not reached",
            Self::QuiescenceTasksLive => "quiescence tasks live",
            Self::ReplayMismatch => "replay mismatch",
            Self::BufferTooSmall => "buffer too small",
            Self::EquivalenceMismatch => "equivalence mismatch",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error from a core runtime operation.
///
/// Carries the [`ErrorKind`] plus optional static context. Context strings
/// are `&'static str` so error construction never allocates on the hot path
/// and error values stay byte-identical across deterministic runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Error {
    kind: ErrorKind,
    context: Option<&'static str>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds static context to the error.
    pub const fn with_context(mut self, ctx: &'static str) -> Self {
        self.context = Some(ctx);
        self
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the stable integer code of the kind.
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.kind.code()
    }

    /// Returns the error context, if any.
    #[must_use]
    pub const fn context(&self) -> Option<&'static str> {
        self.context
    }

    /// Returns `true` if the handle's generation was stale.
    #[must_use]
    pub const fn is_stale_handle(&self) -> bool {
        matches!(self.kind, ErrorKind::StaleHandle)
    }

    /// Returns `true` if a bounded structure was full.
    #[must_use]
    pub const fn is_resource_exhausted(&self) -> bool {
        matches!(self.kind, ErrorKind::ResourceExhausted)
    }

    /// Returns `true` if the scheduler ran out of poll budget.
    #[must_use]
    pub const fn is_budget_exhausted(&self) -> bool {
        matches!(self.kind, ErrorKind::PollBudgetExhausted)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.as_str())?;
        if let Some(ctx) = self.context {
            write!(f, ": {ctx}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

/// Result type for core runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorKind::Ok.code(), 0);
        assert_eq!(ErrorKind::Pending.code(), 1);
        assert_eq!(ErrorKind::InvalidTransition.code(), 6);
        assert_eq!(ErrorKind::PollBudgetExhausted.code(), 14);
        assert_eq!(ErrorKind::StaleHandle.code(), 24);
        assert_eq!(ErrorKind::AllocatorSealed.code(), 28);
        assert_eq!(ErrorKind::EquivalenceMismatch.code(), 33);
    }

    #[test]
    fn stale_handle_is_distinct_from_not_found() {
        assert_ne!(ErrorKind::StaleHandle, ErrorKind::NotFound);
        assert_ne!(ErrorKind::StaleHandle.code(), ErrorKind::NotFound.code());
    }

    #[test]
    fn display_includes_context() {
        let err = Error::new(ErrorKind::ResourceExhausted).with_context("task arena");
        let s = err.to_string();
        assert!(s.contains("resource exhausted"), "{s}");
        assert!(s.contains("task arena"), "{s}");
    }

    #[test]
    fn display_without_context() {
        let err = Error::new(ErrorKind::StaleHandle);
        assert_eq!(err.to_string(), "stale handle");
    }

    #[test]
    fn predicate_helpers() {
        assert!(Error::new(ErrorKind::StaleHandle).is_stale_handle());
        assert!(Error::new(ErrorKind::ResourceExhausted).is_resource_exhausted());
        assert!(Error::new(ErrorKind::PollBudgetExhausted).is_budget_exhausted());
        assert!(!Error::new(ErrorKind::NotFound).is_stale_handle());
    }
}
