//! The cancellation protocol: request, strengthen, observe, finalize.
//!
//! Requesting is idempotent-but-strengthening: severity only rises, the
//! cleanup-poll allowance only tightens, and every request bumps the task's
//! cancel epoch. Checkpoints observe; the scheduler enforces.

use super::Runtime;
use crate::error::{Error, ErrorKind, Result};
use crate::types::{CancelKind, CancelPhase, CancelReason, RegionHandle, TaskHandle, TaskState, Time};

/// What a task body learns at a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    /// `true` when a cancel is pending.
    pub cancelled: bool,
    /// The cancellation phase.
    pub phase: CancelPhase,
    /// Cleanup polls left before the scheduler forces completion.
    pub polls_remaining: u32,
    /// The pending cancel's kind, if any.
    pub kind: Option<CancelKind>,
    /// The task's cancel epoch (counts every request, including upgrades).
    pub epoch: u32,
}

impl Checkpoint {
    const CLEAN: Self = Self {
        cancelled: false,
        phase: CancelPhase::Idle,
        polls_remaining: 0,
        kind: None,
        epoch: 0,
    };
}

impl Runtime {
    /// Requests cancellation of a task.
    ///
    /// No-op on terminal tasks. If a cancel is already pending, the reason
    /// is strengthened, the cleanup allowance tightened to the minimum of
    /// what remains and the new kind's default, and the epoch bumped.
    pub fn task_cancel(&mut self, task: TaskHandle, kind: CancelKind) -> Result<()> {
        self.cancel_with_reason(task, CancelReason::new(kind))
    }

    /// Requests cancellation with origin attribution.
    pub fn task_cancel_with_origin(
        &mut self,
        task: TaskHandle,
        kind: CancelKind,
        origin_region: Option<RegionHandle>,
        origin_task: Option<TaskHandle>,
    ) -> Result<()> {
        self.cancel_with_reason(
            task,
            CancelReason::new(kind).with_origin(origin_region, origin_task),
        )
    }

    pub(crate) fn cancel_with_reason(
        &mut self,
        task: TaskHandle,
        reason: CancelReason,
    ) -> Result<()> {
        let now = Time::from_nanos(self.now_ns());
        let reason = reason.at(now);
        let kind = reason.kind();
        let record = self.lookup_task_mut(task)?;
        if record.is_terminal() {
            return Ok(());
        }

        if record.cancel().pending {
            let defaults = kind.cleanup_polls();
            let bookkeeping = record.cancel_mut();
            bookkeeping.epoch += 1;
            bookkeeping.cleanup_polls_remaining =
                bookkeeping.cleanup_polls_remaining.min(defaults);
            if let Some(ref mut current) = bookkeeping.reason {
                let _ = current.strengthen(&reason);
            } else {
                bookkeeping.reason = Some(reason);
            }
            tracing::debug!(
                target: "cordon::cancel",
                task = %task,
                kind = %kind,
                epoch = record.cancel().epoch,
                "cancel strengthened"
            );
            return Ok(());
        }

        if record.state() == TaskState::Created {
            record.advance(TaskState::Running)?;
        }
        record.advance(TaskState::CancelRequested)?;
        let bookkeeping = record.cancel_mut();
        bookkeeping.pending = true;
        bookkeeping.epoch += 1;
        bookkeeping.cleanup_polls_remaining = kind.cleanup_polls();
        bookkeeping.reason = Some(reason);
        tracing::debug!(
            target: "cordon::cancel",
            task = %task,
            kind = %kind,
            polls = record.cancel().cleanup_polls_remaining,
            "cancel requested"
        );
        Ok(())
    }

    /// Cancels every live, non-terminal task in a region, attributing the
    /// region as origin. Returns the number of tasks cancelled.
    pub fn cancel_propagate(&mut self, region: RegionHandle, kind: CancelKind) -> Result<u32> {
        let _ = self.lookup_region(region)?;
        let targets: Vec<TaskHandle> = self.live_task_handles(region);
        let mut cancelled = 0u32;
        for task in targets {
            if self
                .task_cancel_with_origin(task, kind, Some(region), None)
                .is_ok()
            {
                cancelled += 1;
            }
        }
        tracing::debug!(
            target: "cordon::cancel",
            region = %region,
            kind = %kind,
            cancelled,
            "cancel propagated"
        );
        Ok(cancelled)
    }

    /// Observes cancellation from inside a task's poll body.
    ///
    /// Reports clean when nothing is pending. Otherwise acknowledges a
    /// freshly-requested cancel (CANCEL_REQUESTED becomes CANCELLING) and
    /// reports phase, remaining cleanup polls, kind, and epoch. The
    /// checkpoint only observes; the scheduler is what decrements the
    /// cleanup allowance.
    pub fn checkpoint(&mut self, task: TaskHandle) -> Result<Checkpoint> {
        let record = self.lookup_task_mut(task)?;
        if !record.cancel().pending {
            return Ok(Checkpoint::CLEAN);
        }
        if record.state() == TaskState::CancelRequested {
            record.advance(TaskState::Cancelling)?;
        }
        let bookkeeping = record.cancel();
        Ok(Checkpoint {
            cancelled: true,
            phase: record.cancel_phase(),
            polls_remaining: bookkeeping.cleanup_polls_remaining,
            kind: bookkeeping.reason.as_ref().map(CancelReason::kind),
            epoch: bookkeeping.epoch,
        })
    }

    /// Voluntarily finishes cleanup: CANCELLING becomes FINALIZING, asking
    /// the scheduler to tear the task down on its next pass.
    ///
    /// Any other starting state fails with `invalid-state`.
    pub fn task_finalize(&mut self, task: TaskHandle) -> Result<()> {
        let record = self.lookup_task_mut(task)?;
        if record.state() != TaskState::Cancelling {
            return Err(Error::new(ErrorKind::InvalidState).with_context("finalize from cancelling"));
        }
        record.advance(TaskState::Finalizing)?;
        Ok(())
    }

    /// Returns the task's cancellation phase.
    pub fn task_cancel_phase(&self, task: TaskHandle) -> Result<CancelPhase> {
        Ok(self.lookup_task(task)?.cancel_phase())
    }

    /// Returns the pending cancel reason, if any.
    pub fn task_cancel_reason(&self, task: TaskHandle) -> Result<Option<CancelReason>> {
        Ok(self.lookup_task(task)?.cancel().reason.clone())
    }

    /// Returns the task's cancel epoch.
    pub fn task_cancel_epoch(&self, task: TaskHandle) -> Result<u32> {
        Ok(self.lookup_task(task)?.cancel().epoch)
    }

    /// Returns the task's remaining cleanup polls.
    pub fn task_cleanup_polls_remaining(&self, task: TaskHandle) -> Result<u32> {
        Ok(self.lookup_task(task)?.cancel().cleanup_polls_remaining)
    }

    /// Collects handles of live, non-terminal tasks in a region, ascending
    /// by arena index.
    pub(crate) fn live_task_handles(&self, region: RegionHandle) -> Vec<TaskHandle> {
        self.tasks
            .iter()
            .filter(|(_, _, record)| record.region() == region && !record.is_terminal())
            .map(|(slot, generation, record)| {
                TaskHandle::from_parts(record.state().mask_bit(), generation, slot)
            })
            .collect()
    }
}
