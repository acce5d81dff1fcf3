//! Core value types for the Cordon runtime.
//!
//! This module contains the fundamental types used throughout the core:
//!
//! - [`handle`]: packed generation-tagged handles for the entity kinds
//! - [`state`]: lifecycle state machines and their transition tables
//! - [`time`]: logical timestamps
//! - [`budget`]: the deadline/poll/cost/priority work budget
//! - [`outcome`]: four-valued outcome type with severity lattice
//! - [`cancel`]: cancellation kinds, reasons, and phases

pub mod budget;
pub mod cancel;
pub mod handle;
pub mod outcome;
pub mod state;
pub mod time;

pub use budget::{Budget, DEFAULT_PRIORITY};
pub use cancel::{
    CLEANUP_POLLS_BY_SEVERITY, CancelKind, CancelPhase, CancelReason, MAX_CAUSE_DEPTH,
    PRIORITY_BY_SEVERITY,
};
pub use handle::{HandleKind, ObligationHandle, RawHandle, RegionHandle, TaskHandle};
pub use outcome::{Outcome, join_outcomes};
pub use state::{
    ObligationState, RegionState, TaskState, TransitionError, can_accept_work, can_spawn,
    is_valid_obligation_transition, is_valid_region_transition, is_valid_task_transition,
    validate_obligation_transition, validate_region_transition, validate_task_transition,
};
pub use time::Time;
