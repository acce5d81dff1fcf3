//! Internal record for a task.

use crate::error::{ErrorKind, Result};
use crate::runtime::Runtime;
use crate::types::{
    CancelPhase, CancelReason, Outcome, RegionHandle, TaskHandle, TaskState,
    validate_task_transition,
};
use core::fmt;

/// What a poll function reports back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// The task completed successfully.
    Ready,
    /// The task is not ready; poll again later.
    Pending,
    /// The task completed with a fault.
    Fault(ErrorKind),
}

/// A task body: polled with the runtime and the task's own handle.
///
/// The scheduler removes the body from the slot for the duration of the
/// call, so the body may re-enter the runtime (checkpoint, finalize,
/// capture access, obligation resolution).
pub type PollFn = Box<dyn FnMut(&mut Runtime, TaskHandle) -> PollStatus>;

/// Destructor for captured state, run exactly once at terminal transition.
pub type CaptureDtor = fn(&mut [u8]);

/// A captured-state slice inside the owning region's capture arena.
#[derive(Debug, Clone, Copy)]
pub struct CaptureSlice {
    /// Byte offset into the region's capture arena.
    pub offset: usize,
    /// Length in bytes.
    pub len: usize,
    /// Optional destructor.
    pub dtor: Option<CaptureDtor>,
}

/// Cancellation bookkeeping carried by every task.
#[derive(Debug, Default)]
pub struct CancelBookkeeping {
    /// A cancel has been requested and not yet fully resolved.
    pub pending: bool,
    /// The strengthened reason, present whenever `pending` is set.
    pub reason: Option<CancelReason>,
    /// Monotonically incrementing count of cancel requests.
    pub epoch: u32,
    /// Remaining cleanup polls before the scheduler forces completion.
    pub cleanup_polls_remaining: u32,
}

/// A task's slice of the global state.
pub struct TaskRecord {
    state: TaskState,
    region: RegionHandle,
    poll: Option<PollFn>,
    outcome: Option<Outcome>,
    capture: Option<CaptureSlice>,
    capture_released: bool,
    cancel: CancelBookkeeping,
}

impl TaskRecord {
    /// Creates a fresh CREATED task owned by `region`.
    #[must_use]
    pub fn new(region: RegionHandle, poll: PollFn) -> Self {
        Self {
            state: TaskState::Created,
            region,
            poll: Some(poll),
            outcome: None,
            capture: None,
            capture_released: false,
            cancel: CancelBookkeeping::default(),
        }
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.state
    }

    /// Returns the owning region's handle.
    #[must_use]
    pub const fn region(&self) -> RegionHandle {
        self.region
    }

    /// Returns `true` once the task is COMPLETED.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Advances the lifecycle, validating against the transition table.
    pub fn advance(&mut self, to: TaskState) -> Result<()> {
        validate_task_transition(self.state, to)?;
        self.state = to;
        Ok(())
    }

    /// Returns the terminal outcome, if assigned.
    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Assigns the terminal outcome.
    pub const fn set_outcome(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
    }

    /// Attaches a captured-state slice.
    pub const fn set_capture(&mut self, capture: CaptureSlice) {
        self.capture = Some(capture);
    }

    /// Returns the captured-state slice, if the task owns one and it has
    /// not been released yet.
    #[must_use]
    pub const fn capture(&self) -> Option<CaptureSlice> {
        if self.capture_released {
            None
        } else {
            self.capture
        }
    }

    /// Takes the capture slice for release. Returns it at most once.
    pub const fn take_capture_for_release(&mut self) -> Option<CaptureSlice> {
        if self.capture_released {
            return None;
        }
        self.capture_released = true;
        self.capture
    }

    /// Removes the poll body for the duration of a scheduler call.
    pub fn take_poll(&mut self) -> Option<PollFn> {
        self.poll.take()
    }

    /// Reinstalls the poll body after a scheduler call.
    pub fn restore_poll(&mut self, poll: PollFn) {
        self.poll = Some(poll);
    }

    /// Returns the cancel bookkeeping.
    #[must_use]
    pub const fn cancel(&self) -> &CancelBookkeeping {
        &self.cancel
    }

    /// Returns mutable cancel bookkeeping.
    pub const fn cancel_mut(&mut self) -> &mut CancelBookkeeping {
        &mut self.cancel
    }

    /// Returns the cancellation phase implied by state and bookkeeping.
    #[must_use]
    pub const fn cancel_phase(&self) -> CancelPhase {
        if !self.cancel.pending {
            return CancelPhase::Idle;
        }
        match self.state {
            TaskState::CancelRequested => CancelPhase::Requested,
            TaskState::Cancelling => CancelPhase::Cancelling,
            TaskState::Finalizing => CancelPhase::Finalizing,
            _ => CancelPhase::Requested,
        }
    }
}

impl fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRecord")
            .field("state", &self.state)
            .field("region", &self.region)
            .field("outcome", &self.outcome)
            .field("cancel_pending", &self.cancel.pending)
            .field("epoch", &self.cancel.epoch)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TaskRecord {
        TaskRecord::new(
            RegionHandle::from_parts(1, 1, 0),
            Box::new(|_, _| PollStatus::Ready),
        )
    }

    #[test]
    fn starts_created_without_outcome() {
        let task = record();
        assert_eq!(task.state(), TaskState::Created);
        assert_eq!(task.outcome(), None);
        assert_eq!(task.cancel_phase(), CancelPhase::Idle);
    }

    #[test]
    fn advance_validates_transitions() {
        let mut task = record();
        task.advance(TaskState::Running).expect("created -> running");
        let err = task
            .advance(TaskState::Finalizing)
            .expect_err("running cannot jump to finalizing");
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        task.advance(TaskState::Completed).expect("running -> completed");
        assert!(task.is_terminal());
    }

    #[test]
    fn capture_releases_exactly_once() {
        let mut task = record();
        task.set_capture(CaptureSlice {
            offset: 0,
            len: 16,
            dtor: None,
        });
        assert!(task.capture().is_some());
        assert!(task.take_capture_for_release().is_some());
        assert!(task.take_capture_for_release().is_none());
        assert!(task.capture().is_none());
    }

    #[test]
    fn poll_body_round_trips() {
        let mut task = record();
        let body = task.take_poll().expect("body installed");
        assert!(task.take_poll().is_none());
        task.restore_poll(body);
        assert!(task.take_poll().is_some());
    }

    #[test]
    fn cancel_phase_follows_state() {
        let mut task = record();
        task.advance(TaskState::Running).expect("running");
        task.cancel_mut().pending = true;
        task.advance(TaskState::CancelRequested).expect("requested");
        assert_eq!(task.cancel_phase(), CancelPhase::Requested);
        task.advance(TaskState::Cancelling).expect("cancelling");
        assert_eq!(task.cancel_phase(), CancelPhase::Cancelling);
        task.advance(TaskState::Finalizing).expect("finalizing");
        assert_eq!(task.cancel_phase(), CancelPhase::Finalizing);
    }
}
