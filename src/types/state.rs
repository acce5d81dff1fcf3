//! Lifecycle state machines and their transition tables.
//!
//! Transitions are validated by pure predicates so every mutation site goes
//! through the same table. Legal region transitions strictly increase the
//! state ordinal; legal task transitions never decrease it; obligations
//! resolve exactly once. Terminal states reject every outgoing transition,
//! including self-loops.

use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Lifecycle state of a region.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum RegionState {
    /// Accepting spawns and reservations.
    Open = 0,
    /// Close requested; live tasks are being cancelled.
    Closing = 1,
    /// Waiting for child regions (unused by the single-region fast path).
    Draining = 2,
    /// Running cleanup callbacks; late cleanup admission only.
    Finalizing = 3,
    /// Terminal.
    Closed = 4,
}

/// Lifecycle state of a task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum TaskState {
    /// Spawned, never polled.
    Created = 0,
    /// Being polled by the scheduler.
    Running = 1,
    /// A cancel is pending and not yet observed.
    CancelRequested = 2,
    /// The task observed the cancel and is cleaning up.
    Cancelling = 3,
    /// Cleanup done; awaiting teardown by the scheduler.
    Finalizing = 4,
    /// Terminal.
    Completed = 5,
}

/// Lifecycle state of an obligation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum ObligationState {
    /// Reserved and unresolved.
    Reserved = 0,
    /// Terminal: resolved by commit.
    Committed = 1,
    /// Terminal: resolved by abort.
    Aborted = 2,
    /// Terminal: the runtime detected an unresolved leak.
    Leaked = 3,
}

/// A lifecycle transition that the tables reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum TransitionError {
    /// The region transition was not legal.
    #[error("invalid region transition: {from:?} -> {to:?}")]
    Region {
        /// Current state.
        from: RegionState,
        /// Requested next state.
        to: RegionState,
    },
    /// The task transition was not legal.
    #[error("invalid task transition: {from:?} -> {to:?}")]
    Task {
        /// Current state.
        from: TaskState,
        /// Requested next state.
        to: TaskState,
    },
    /// The obligation transition was not legal.
    #[error("invalid obligation transition: {from:?} -> {to:?}")]
    Obligation {
        /// Current state.
        from: ObligationState,
        /// Requested next state.
        to: ObligationState,
    },
}

impl From<TransitionError> for Error {
    fn from(e: TransitionError) -> Self {
        let ctx = match e {
            TransitionError::Region { .. } => "region lifecycle",
            TransitionError::Task { .. } => "task lifecycle",
            TransitionError::Obligation { .. } => "obligation lifecycle",
        };
        Self::new(ErrorKind::InvalidTransition).with_context(ctx)
    }
}

impl RegionState {
    /// All region states, in ordinal order.
    pub const ALL: [Self; 5] = [
        Self::Open,
        Self::Closing,
        Self::Draining,
        Self::Finalizing,
        Self::Closed,
    ];

    /// Returns the state ordinal.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Returns the admission-mask bit for this state.
    #[must_use]
    pub const fn mask_bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Returns `true` for the terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl TaskState {
    /// All task states, in ordinal order.
    pub const ALL: [Self; 6] = [
        Self::Created,
        Self::Running,
        Self::CancelRequested,
        Self::Cancelling,
        Self::Finalizing,
        Self::Completed,
    ];

    /// Returns the state ordinal.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Returns the admission-mask bit for this state.
    #[must_use]
    pub const fn mask_bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Returns `true` for the terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns `true` while a cancel is being worked through.
    #[must_use]
    pub const fn is_cancel_phase(self) -> bool {
        matches!(
            self,
            Self::CancelRequested | Self::Cancelling | Self::Finalizing
        )
    }
}

impl ObligationState {
    /// All obligation states, in ordinal order.
    pub const ALL: [Self; 4] = [
        Self::Reserved,
        Self::Committed,
        Self::Aborted,
        Self::Leaked,
    ];

    /// Returns the state ordinal.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Returns the admission-mask bit for this state.
    #[must_use]
    pub const fn mask_bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Returns `true` once the obligation is resolved or leaked.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Reserved)
    }
}

/// Returns `true` when the region transition is legal.
#[must_use]
pub const fn is_valid_region_transition(from: RegionState, to: RegionState) -> bool {
    matches!(
        (from, to),
        (RegionState::Open, RegionState::Closing)
            | (RegionState::Closing, RegionState::Draining)
            | (RegionState::Closing, RegionState::Finalizing)
            | (RegionState::Draining, RegionState::Finalizing)
            | (RegionState::Finalizing, RegionState::Closed)
    )
}

/// Validates a region transition.
pub const fn validate_region_transition(
    from: RegionState,
    to: RegionState,
) -> std::result::Result<(), TransitionError> {
    if is_valid_region_transition(from, to) {
        Ok(())
    } else {
        Err(TransitionError::Region { from, to })
    }
}

/// Returns `true` when the task transition is legal.
#[must_use]
pub const fn is_valid_task_transition(from: TaskState, to: TaskState) -> bool {
    matches!(
        (from, to),
        (TaskState::Created, TaskState::Running)
            | (TaskState::Running, TaskState::CancelRequested)
            | (TaskState::Running, TaskState::Completed)
            | (TaskState::CancelRequested, TaskState::Cancelling)
            | (TaskState::Cancelling, TaskState::Finalizing)
            | (TaskState::Finalizing, TaskState::Completed)
    )
}

/// Validates a task transition.
pub const fn validate_task_transition(
    from: TaskState,
    to: TaskState,
) -> std::result::Result<(), TransitionError> {
    if is_valid_task_transition(from, to) {
        Ok(())
    } else {
        Err(TransitionError::Task { from, to })
    }
}

/// Returns `true` when the obligation transition is legal.
#[must_use]
pub const fn is_valid_obligation_transition(from: ObligationState, to: ObligationState) -> bool {
    matches!(
        (from, to),
        (ObligationState::Reserved, ObligationState::Committed)
            | (ObligationState::Reserved, ObligationState::Aborted)
            | (ObligationState::Reserved, ObligationState::Leaked)
    )
}

/// Validates an obligation transition.
pub const fn validate_obligation_transition(
    from: ObligationState,
    to: ObligationState,
) -> std::result::Result<(), TransitionError> {
    if is_valid_obligation_transition(from, to) {
        Ok(())
    } else {
        Err(TransitionError::Obligation { from, to })
    }
}

/// Returns `true` when user spawns are admitted.
#[must_use]
pub const fn can_spawn(state: RegionState) -> bool {
    matches!(state, RegionState::Open)
}

/// Returns `true` when the region accepts work at all.
///
/// Late-arrival admission during `Finalizing` exists for cleanup handlers,
/// not for user spawns.
#[must_use]
pub const fn can_accept_work(state: RegionState) -> bool {
    matches!(state, RegionState::Open | RegionState::Finalizing)
}
