//! The round-robin cooperative scheduler.
//!
//! One invocation drives a region's tasks in ascending arena-index order,
//! round after round, until the region quiesces or the budget runs out.
//! For identical initial state, hooks, and seed, the emitted event stream
//! is byte-identical across runs and platforms; the sequence number is the
//! only scheduler-owned counter and resets at every invocation.

use super::Runtime;
use crate::error::{Error, ErrorKind, Result};
use crate::record::PollStatus;
use crate::types::{Budget, Outcome, RegionHandle, TaskHandle, TaskState};
use crate::util::DetHasher;
use serde::{Deserialize, Serialize};
use std::hash::Hasher;

/// What happened, as observed on the scheduler's event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedEventKind {
    /// A task was polled.
    Poll {
        /// The polled task.
        task: TaskHandle,
    },
    /// A task reached its terminal state.
    Complete {
        /// The completed task.
        task: TaskHandle,
        /// The assigned outcome.
        outcome: Outcome,
    },
    /// A cancelled task exhausted its cleanup allowance and was forced to
    /// completion.
    CancelForced {
        /// The forced task.
        task: TaskHandle,
    },
    /// The budget ran out.
    Budget,
    /// The region has no live work left.
    Quiescent,
}

/// One entry in the scheduler event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedEvent {
    /// Monotonic sequence number within one scheduler invocation.
    pub seq: u32,
    /// The event payload.
    pub kind: SchedEventKind,
}

impl Runtime {
    pub(crate) fn emit(&mut self, kind: SchedEventKind) {
        let seq = self.event_seq;
        self.event_seq += 1;
        tracing::trace!(target: "cordon::sched", seq, event = ?kind, "event");
        self.events.push(SchedEvent { seq, kind });
    }

    /// Runs the scheduler over `region` under `budget`.
    ///
    /// Tasks are visited in ascending arena index within each round; rounds
    /// repeat until the region has no live tasks (`Ok`, after a QUIESCENT
    /// event) or the poll budget runs out (`poll-budget-exhausted`, after a
    /// BUDGET event). A fault from a task poll is handled per the
    /// containment policy; under fail-fast it aborts the run immediately,
    /// otherwise the first fault becomes the run's result once the region
    /// quiesces.
    pub fn scheduler_run(&mut self, region: RegionHandle, budget: &mut Budget) -> Result<()> {
        let _ = self.lookup_region(region)?;
        self.events.clear();
        self.event_seq = 0;
        let mut first_fault: Option<Error> = None;

        loop {
            if budget.is_exhausted() {
                self.emit(SchedEventKind::Budget);
                return Err(Error::new(ErrorKind::PollBudgetExhausted));
            }

            let mut active = 0u32;
            for slot in 0..self.tasks.capacity() {
                let Some((generation, state, owner, pending, cleanup_left)) =
                    self.tasks.at(slot).map(|(generation, record)| {
                        (
                            generation,
                            record.state(),
                            record.region(),
                            record.cancel().pending,
                            record.cancel().cleanup_polls_remaining,
                        )
                    })
                else {
                    continue;
                };
                if owner != region || state.is_terminal() {
                    continue;
                }
                active += 1;
                let handle = TaskHandle::from_parts(state.mask_bit(), generation, slot);

                // A task that signalled "cleanup complete" is torn down
                // without another poll.
                if state == TaskState::Finalizing {
                    self.finish_task(handle, Outcome::Cancelled)?;
                    self.emit(SchedEventKind::Complete {
                        task: handle,
                        outcome: Outcome::Cancelled,
                    });
                    continue;
                }

                // A cancelled task out of cleanup allowance is forced
                // through to completion.
                if pending
                    && matches!(state, TaskState::CancelRequested | TaskState::Cancelling)
                    && cleanup_left == 0
                {
                    self.finish_task(handle, Outcome::Cancelled)?;
                    self.emit(SchedEventKind::CancelForced { task: handle });
                    self.emit(SchedEventKind::Complete {
                        task: handle,
                        outcome: Outcome::Cancelled,
                    });
                    continue;
                }

                if budget.consume_poll() == 0 {
                    self.emit(SchedEventKind::Budget);
                    return Err(Error::new(ErrorKind::PollBudgetExhausted));
                }

                if state == TaskState::Created {
                    if let Some((_, record)) = self.tasks.at_mut(slot) {
                        record.advance(TaskState::Running)?;
                    }
                }

                self.emit(SchedEventKind::Poll { task: handle });

                let Some(mut poll) = self.tasks.at_mut(slot).and_then(|(_, r)| r.take_poll())
                else {
                    continue;
                };
                let status = {
                    let span = tracing::trace_span!(target: "cordon::sched", "poll", task = %handle);
                    let _guard = span.enter();
                    poll(self, handle)
                };
                if let Some((generation_now, record)) = self.tasks.at_mut(slot) {
                    if generation_now == generation && !record.is_terminal() {
                        record.restore_poll(poll);
                    }
                }

                match status {
                    PollStatus::Pending => {
                        if let Some((_, record)) = self.tasks.at_mut(slot) {
                            let bookkeeping = record.cancel_mut();
                            if bookkeeping.pending && bookkeeping.cleanup_polls_remaining > 0 {
                                bookkeeping.cleanup_polls_remaining -= 1;
                            }
                        }
                    }
                    PollStatus::Ready => {
                        let outcome = self.terminal_outcome(handle, Outcome::Ok)?;
                        self.finish_task(handle, outcome)?;
                        self.emit(SchedEventKind::Complete {
                            task: handle,
                            outcome,
                        });
                    }
                    PollStatus::Fault(kind) => {
                        let outcome = self.terminal_outcome(handle, Outcome::Err)?;
                        self.finish_task(handle, outcome)?;
                        self.emit(SchedEventKind::Complete {
                            task: handle,
                            outcome,
                        });
                        let fault = Error::new(kind);
                        if self.contain_fault(region, fault)? {
                            return Err(fault);
                        }
                        first_fault.get_or_insert(fault);
                    }
                }
            }

            if active == 0 {
                self.emit(SchedEventKind::Quiescent);
                return match first_fault {
                    Some(fault) => Err(fault),
                    None => Ok(()),
                };
            }
        }
    }

    /// Joins the natural outcome with CANCELLED when a cancel is pending at
    /// terminal transition.
    fn terminal_outcome(&self, task: TaskHandle, natural: Outcome) -> Result<Outcome> {
        let record = self.lookup_task(task)?;
        if record.cancel().pending {
            Ok(natural.join(Outcome::Cancelled))
        } else {
            Ok(natural)
        }
    }

    /// Drives a task forward through the legal transitions to COMPLETED,
    /// assigns its outcome, releases captured state exactly once, and
    /// decrements the owner's live count.
    pub(crate) fn finish_task(&mut self, task: TaskHandle, outcome: Outcome) -> Result<()> {
        let (capture, owner) = {
            let record = self.lookup_task_mut(task)?;
            while !record.is_terminal() {
                let next = match record.state() {
                    TaskState::Created => TaskState::Running,
                    TaskState::Running | TaskState::Finalizing => TaskState::Completed,
                    TaskState::CancelRequested => TaskState::Cancelling,
                    TaskState::Cancelling => TaskState::Finalizing,
                    TaskState::Completed => break,
                };
                record.advance(next)?;
            }
            record.set_outcome(outcome);
            (record.take_capture_for_release(), record.region())
        };

        if let Some(capture) = capture {
            if let Some(dtor) = capture.dtor {
                if let Ok(owner_record) = self.lookup_region_mut(owner) {
                    dtor(owner_record.capture_slice_mut(capture.offset, capture.len));
                }
            }
        }
        if let Ok(owner_record) = self.lookup_region_mut(owner) {
            owner_record.note_task_terminal();
        }
        Ok(())
    }

    /// Applies the containment policy to a poll fault. Returns `true` when
    /// the run must stop at the fault.
    fn contain_fault(&mut self, region: RegionHandle, fault: Error) -> Result<bool> {
        let policy = self.config.containment;
        tracing::warn!(
            target: "cordon::sched",
            region = %region,
            policy = %policy,
            fault = %fault,
            "task fault"
        );
        if policy.poisons_region() {
            self.region_poison(region)?;
            let _ = self.cancel_propagate(region, crate::types::CancelKind::Resource)?;
        }
        Ok(policy.stops_the_run())
    }

    // ── Event stream API ────────────────────────────────────────────────

    /// Returns the number of events in the buffer.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Returns an event by buffer index.
    #[must_use]
    pub fn event_get(&self, index: usize) -> Option<&SchedEvent> {
        self.events.get(index)
    }

    /// Returns the whole event stream.
    #[must_use]
    pub fn events(&self) -> &[SchedEvent] {
        &self.events
    }

    /// Clears the event buffer and sequence counter.
    pub fn event_reset(&mut self) {
        self.events.clear();
        self.event_seq = 0;
    }

    /// Renders the event stream as canonical JSON, one run per string.
    ///
    /// Two deterministic runs produce byte-identical output here.
    #[must_use]
    pub fn events_json(&self) -> String {
        serde_json::to_string(&self.events).unwrap_or_default()
    }

    /// Folds the event stream into a deterministic digest.
    #[must_use]
    pub fn events_digest(&self) -> u64 {
        let mut hasher = DetHasher::default();
        for event in &self.events {
            hasher.write_u64(u64::from(event.seq));
            match event.kind {
                SchedEventKind::Poll { task } => {
                    hasher.write_u8(0);
                    hasher.write_u64(task.raw().bits());
                }
                SchedEventKind::Complete { task, outcome } => {
                    hasher.write_u8(1);
                    hasher.write_u64(task.raw().bits());
                    hasher.write_u8(outcome.severity());
                }
                SchedEventKind::CancelForced { task } => {
                    hasher.write_u8(2);
                    hasher.write_u64(task.raw().bits());
                }
                SchedEventKind::Budget => hasher.write_u8(3),
                SchedEventKind::Quiescent => hasher.write_u8(4),
            }
        }
        hasher.finish()
    }
}
