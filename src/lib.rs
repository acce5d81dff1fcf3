//! Cordon: a deterministic, bounded, single-threaded structured-concurrency
//! core.
//!
//! # Overview
//!
//! Cordon is the kernel of a structured-concurrency runtime for systems that
//! cannot tolerate nondeterminism: every task is owned by a region that
//! drains to quiescence, cancellation is a severity-graded protocol with a
//! bounded cleanup budget, and the scheduler's event stream is byte-identical
//! across runs for the same inputs, hooks, and seed.
//!
//! # Core Guarantees
//!
//! - **No orphan tasks**: every spawned task is owned by a region; the drain
//!   driver refuses to close while live work remains
//! - **Cancel-correctness**: cancellation is request → observe → finalize,
//!   never a silent drop, and severity only ever rises
//! - **Bounded cleanup**: a cancelled task gets a severity-scaled poll
//!   allowance and is forced to completion when it runs out
//! - **Obligation linearity**: reserve/commit/abort contracts resolve exactly
//!   once; a region cannot finalize around an unresolved obligation
//! - **Deterministic replay**: seeded hooks, a counter clock, and a
//!   sequence-numbered event stream with a comparable digest
//! - **Stale-handle detection**: generation-tagged handles surface
//!   use-after-reclaim as its own error, distinct from not-found
//!
//! # Module Structure
//!
//! - [`types`]: handles, lifecycle states, budgets, outcomes, cancel reasons
//! - [`record`]: arena-resident records for regions, tasks, obligations
//! - [`runtime`]: the [`Runtime`] value, hooks, scheduler, drain driver
//! - [`lab`]: test-side oracles
//! - [`util`]: generational arenas, deterministic RNG and hashing
//! - [`error`](mod@error): the status taxonomy

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]

#[cfg(any(
    all(feature = "platform-posix", feature = "platform-win32"),
    all(feature = "platform-posix", feature = "platform-freestanding"),
    all(feature = "platform-posix", feature = "platform-embedded-router"),
    all(feature = "platform-posix", feature = "platform-hft"),
    all(feature = "platform-posix", feature = "platform-automotive"),
    all(feature = "platform-posix", feature = "platform-parallel"),
    all(feature = "platform-win32", feature = "platform-freestanding"),
    all(feature = "platform-win32", feature = "platform-embedded-router"),
    all(feature = "platform-win32", feature = "platform-hft"),
    all(feature = "platform-win32", feature = "platform-automotive"),
    all(feature = "platform-win32", feature = "platform-parallel"),
    all(feature = "platform-freestanding", feature = "platform-embedded-router"),
    all(feature = "platform-freestanding", feature = "platform-hft"),
    all(feature = "platform-freestanding", feature = "platform-automotive"),
    all(feature = "platform-freestanding", feature = "platform-parallel"),
    all(feature = "platform-embedded-router", feature = "platform-hft"),
    all(feature = "platform-embedded-router", feature = "platform-automotive"),
    all(feature = "platform-embedded-router", feature = "platform-parallel"),
    all(feature = "platform-hft", feature = "platform-automotive"),
    all(feature = "platform-hft", feature = "platform-parallel"),
    all(feature = "platform-automotive", feature = "platform-parallel"),
))]
compile_error!("select at most one platform profile feature.");

#[cfg(all(feature = "safety-hardened", feature = "safety-release"))]
compile_error!("select at most one safety profile feature.");

pub mod error;
pub mod lab;
pub mod record;
pub mod runtime;
pub mod types;
pub mod util;

// ── Test-only modules ───────────────────────────────────────────────────
#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;

// Re-exports for convenient access to core types
pub use error::{Error, ErrorKind, Result};
pub use record::{CaptureDtor, PollFn, PollStatus};
pub use runtime::{
    Checkpoint, ContainmentPolicy, PlatformProfile, ResourceKind, ResourceSnapshot, Runtime,
    RuntimeConfig, RuntimeHooks, SafetyProfile, SchedEvent, SchedEventKind, WaitPolicy,
};
pub use types::{
    Budget, CancelKind, CancelPhase, CancelReason, HandleKind, ObligationHandle, ObligationState,
    Outcome, RawHandle, RegionHandle, RegionState, TaskHandle, TaskState, Time, TransitionError,
    join_outcomes,
};
