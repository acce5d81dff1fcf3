//! Lifecycle operations: regions, tasks, and obligations.
//!
//! Every public operation validates its handle through the three-step gated
//! admission (tag match, bounds-and-occupancy, generation match) before
//! touching the record, so use-after-reclaim is always surfaced as
//! `stale-handle` rather than acting on the slot's new occupant.

use super::Runtime;
use crate::error::{Error, ErrorKind, Result};
use crate::record::{CaptureDtor, CaptureSlice, ObligationRecord, PollFn, RegionRecord, TaskRecord};
use crate::types::{
    HandleKind, ObligationHandle, ObligationState, Outcome, RegionHandle, RegionState, TaskHandle,
    TaskState, can_spawn,
};
use crate::util::SlotError;

impl Runtime {
    // ── Gated lookups ───────────────────────────────────────────────────

    pub(crate) fn lookup_region(&self, handle: RegionHandle) -> Result<&RegionRecord> {
        if handle.raw().kind() != Some(HandleKind::Region) {
            return Err(Error::new(ErrorKind::RegionNotFound).with_context("tag mismatch"));
        }
        self.regions
            .get(handle.slot(), handle.generation())
            .map_err(|e| match e {
                SlotError::NotFound => Error::new(ErrorKind::RegionNotFound),
                SlotError::Stale => Error::new(ErrorKind::StaleHandle).with_context("region"),
            })
    }

    pub(crate) fn lookup_region_mut(&mut self, handle: RegionHandle) -> Result<&mut RegionRecord> {
        if handle.raw().kind() != Some(HandleKind::Region) {
            return Err(Error::new(ErrorKind::RegionNotFound).with_context("tag mismatch"));
        }
        self.regions
            .get_mut(handle.slot(), handle.generation())
            .map_err(|e| match e {
                SlotError::NotFound => Error::new(ErrorKind::RegionNotFound),
                SlotError::Stale => Error::new(ErrorKind::StaleHandle).with_context("region"),
            })
    }

    pub(crate) fn lookup_task(&self, handle: TaskHandle) -> Result<&TaskRecord> {
        if handle.raw().kind() != Some(HandleKind::Task) {
            return Err(Error::new(ErrorKind::TaskNotFound).with_context("tag mismatch"));
        }
        self.tasks
            .get(handle.slot(), handle.generation())
            .map_err(|e| match e {
                SlotError::NotFound => Error::new(ErrorKind::TaskNotFound),
                SlotError::Stale => Error::new(ErrorKind::StaleHandle).with_context("task"),
            })
    }

    pub(crate) fn lookup_task_mut(&mut self, handle: TaskHandle) -> Result<&mut TaskRecord> {
        if handle.raw().kind() != Some(HandleKind::Task) {
            return Err(Error::new(ErrorKind::TaskNotFound).with_context("tag mismatch"));
        }
        self.tasks
            .get_mut(handle.slot(), handle.generation())
            .map_err(|e| match e {
                SlotError::NotFound => Error::new(ErrorKind::TaskNotFound),
                SlotError::Stale => Error::new(ErrorKind::StaleHandle).with_context("task"),
            })
    }

    pub(crate) fn lookup_obligation(&self, handle: ObligationHandle) -> Result<&ObligationRecord> {
        if handle.raw().kind() != Some(HandleKind::Obligation) {
            return Err(Error::new(ErrorKind::NotFound).with_context("tag mismatch"));
        }
        self.obligations
            .get(handle.slot(), handle.generation())
            .map_err(|e| match e {
                SlotError::NotFound => Error::new(ErrorKind::NotFound).with_context("obligation"),
                SlotError::Stale => Error::new(ErrorKind::StaleHandle).with_context("obligation"),
            })
    }

    pub(crate) fn lookup_obligation_mut(
        &mut self,
        handle: ObligationHandle,
    ) -> Result<&mut ObligationRecord> {
        if handle.raw().kind() != Some(HandleKind::Obligation) {
            return Err(Error::new(ErrorKind::NotFound).with_context("tag mismatch"));
        }
        self.obligations
            .get_mut(handle.slot(), handle.generation())
            .map_err(|e| match e {
                SlotError::NotFound => Error::new(ErrorKind::NotFound).with_context("obligation"),
                SlotError::Stale => Error::new(ErrorKind::StaleHandle).with_context("obligation"),
            })
    }

    // ── Regions ─────────────────────────────────────────────────────────

    /// Opens a region, recycling a CLOSED slot when quarantine allows.
    ///
    /// Fails with `resource-exhausted` when every slot is held.
    pub fn region_open(&mut self) -> Result<RegionHandle> {
        let quarantine = self.config.quarantine_closed_regions;
        let capture_bytes = self.config.capture_arena_bytes;
        let cleanup_slots = self.config.cleanup_stack_slots;
        let (slot, generation, _) = self
            .regions
            .allocate(
                |record| !quarantine && record.is_reclaimable(),
                |_, _| RegionRecord::new(capture_bytes, cleanup_slots),
            )
            .ok_or_else(|| Error::new(ErrorKind::ResourceExhausted).with_context("region arena"))?;
        let handle = RegionHandle::from_parts(RegionState::Open.mask_bit(), generation, slot);
        tracing::debug!(target: "cordon::lifecycle", region = %handle, "region open");
        Ok(handle)
    }

    /// Requests a close: OPEN becomes CLOSING. Draining is separate.
    pub fn region_close(&mut self, region: RegionHandle) -> Result<()> {
        let record = self.lookup_region_mut(region)?;
        if record.is_poisoned() {
            return Err(Error::new(ErrorKind::RegionPoisoned));
        }
        record.advance(RegionState::Closing)?;
        tracing::debug!(target: "cordon::lifecycle", region = %region, "region closing");
        Ok(())
    }

    /// Poisons a region. Spawns and reservations are rejected afterwards;
    /// state queries and draining still work.
    pub fn region_poison(&mut self, region: RegionHandle) -> Result<()> {
        let record = self.lookup_region_mut(region)?;
        record.poison();
        tracing::warn!(target: "cordon::lifecycle", region = %region, "region poisoned");
        Ok(())
    }

    /// Returns the poisoned flag.
    pub fn region_is_poisoned(&self, region: RegionHandle) -> Result<bool> {
        Ok(self.lookup_region(region)?.is_poisoned())
    }

    /// Returns the region's lifecycle state.
    pub fn region_state(&self, region: RegionHandle) -> Result<RegionState> {
        Ok(self.lookup_region(region)?.state())
    }

    /// Returns the region's live-task count.
    pub fn region_live_tasks(&self, region: RegionHandle) -> Result<u32> {
        Ok(self.lookup_region(region)?.live_tasks())
    }

    /// Returns how many tasks were ever spawned into the region.
    pub fn region_total_spawned(&self, region: RegionHandle) -> Result<u32> {
        Ok(self.lookup_region(region)?.total_spawned())
    }

    // ── Tasks ───────────────────────────────────────────────────────────

    /// Spawns a task into an OPEN, unpoisoned region.
    pub fn task_spawn(&mut self, region: RegionHandle, poll: PollFn) -> Result<TaskHandle> {
        self.spawn_inner(region, poll, None)
    }

    /// Spawns a task owning `state_size` bytes of zero-filled captured
    /// state in the region's capture arena, with an optional destructor run
    /// at terminal transition.
    pub fn task_spawn_captured(
        &mut self,
        region: RegionHandle,
        state_size: usize,
        dtor: Option<CaptureDtor>,
        poll: PollFn,
    ) -> Result<TaskHandle> {
        let record = self.lookup_region_mut(region)?;
        if record.is_poisoned() {
            return Err(Error::new(ErrorKind::RegionPoisoned));
        }
        if !can_spawn(record.state()) {
            return Err(Error::new(ErrorKind::RegionNotOpen));
        }
        let watermark = record.capture_watermark();
        let (offset, len) = record.capture_alloc(state_size)?;
        match self.spawn_inner(region, poll, Some(CaptureSlice { offset, len, dtor })) {
            Ok(handle) => Ok(handle),
            Err(err) => {
                if let Ok(record) = self.lookup_region_mut(region) {
                    record.capture_rollback(watermark);
                }
                Err(err)
            }
        }
    }

    fn spawn_inner(
        &mut self,
        region: RegionHandle,
        poll: PollFn,
        capture: Option<CaptureSlice>,
    ) -> Result<TaskHandle> {
        let record = self.lookup_region_mut(region)?;
        if record.is_poisoned() {
            return Err(Error::new(ErrorKind::RegionPoisoned));
        }
        if !can_spawn(record.state()) {
            return Err(Error::new(ErrorKind::RegionNotOpen));
        }

        let (slot, generation, task) = self
            .tasks
            .allocate(TaskRecord::is_terminal, |_, _| {
                let mut task = TaskRecord::new(region, poll);
                if let Some(capture) = capture {
                    task.set_capture(capture);
                }
                task
            })
            .ok_or_else(|| Error::new(ErrorKind::ResourceExhausted).with_context("task arena"))?;
        debug_assert_eq!(task.state(), TaskState::Created);

        // Lookup again for the counter bump; the task allocation ended the
        // earlier borrow.
        let record = self.lookup_region_mut(region)?;
        record.note_spawn();

        let handle = TaskHandle::from_parts(TaskState::Created.mask_bit(), generation, slot);
        tracing::debug!(target: "cordon::lifecycle", region = %region, task = %handle, "task spawn");
        Ok(handle)
    }

    /// Returns the task's lifecycle state.
    pub fn task_state(&self, task: TaskHandle) -> Result<TaskState> {
        Ok(self.lookup_task(task)?.state())
    }

    /// Returns the task's terminal outcome.
    ///
    /// Fails with `task-not-completed` until the task is terminal.
    pub fn task_outcome(&self, task: TaskHandle) -> Result<Outcome> {
        let record = self.lookup_task(task)?;
        record
            .outcome()
            .ok_or_else(|| Error::new(ErrorKind::TaskNotCompleted))
    }

    /// Returns the task's captured-state slice.
    ///
    /// Intended for use inside the task's own poll body.
    pub fn task_capture_mut(&mut self, task: TaskHandle) -> Result<&mut [u8]> {
        let record = self.lookup_task(task)?;
        let capture = record
            .capture()
            .ok_or_else(|| Error::new(ErrorKind::InvalidArgument).with_context("no captured state"))?;
        let region = record.region();
        let record = self.lookup_region_mut(region)?;
        Ok(record.capture_slice_mut(capture.offset, capture.len))
    }

    /// Pushes a cleanup callback onto the region's stack.
    ///
    /// Runs during finalization, in reverse push order.
    pub fn region_defer(
        &mut self,
        region: RegionHandle,
        callback: Box<dyn FnOnce()>,
    ) -> Result<usize> {
        let record = self.lookup_region_mut(region)?;
        record.cleanup_push(callback)
    }

    // ── Obligations ─────────────────────────────────────────────────────

    /// Reserves an obligation in an OPEN, unpoisoned region.
    pub fn obligation_reserve(&mut self, region: RegionHandle) -> Result<ObligationHandle> {
        let record = self.lookup_region_mut(region)?;
        if record.is_poisoned() {
            return Err(Error::new(ErrorKind::RegionPoisoned));
        }
        if !can_spawn(record.state()) {
            return Err(Error::new(ErrorKind::RegionNotOpen));
        }
        let (slot, generation, _) = self
            .obligations
            .allocate(ObligationRecord::is_terminal, |_, _| {
                ObligationRecord::new(region)
            })
            .ok_or_else(|| {
                Error::new(ErrorKind::ResourceExhausted).with_context("obligation arena")
            })?;
        let handle =
            ObligationHandle::from_parts(ObligationState::Reserved.mask_bit(), generation, slot);
        tracing::debug!(target: "cordon::lifecycle", region = %region, obligation = %handle, "obligation reserve");
        Ok(handle)
    }

    /// Commits an obligation. One-shot: any later resolution attempt fails
    /// with `invalid-transition`.
    pub fn obligation_commit(&mut self, obligation: ObligationHandle) -> Result<()> {
        let record = self.lookup_obligation_mut(obligation)?;
        record.resolve(ObligationState::Committed)?;
        tracing::debug!(target: "cordon::lifecycle", obligation = %obligation, "obligation commit");
        Ok(())
    }

    /// Aborts an obligation. One-shot like commit.
    pub fn obligation_abort(&mut self, obligation: ObligationHandle) -> Result<()> {
        let record = self.lookup_obligation_mut(obligation)?;
        record.resolve(ObligationState::Aborted)?;
        tracing::debug!(target: "cordon::lifecycle", obligation = %obligation, "obligation abort");
        Ok(())
    }

    /// Returns the obligation's lifecycle state.
    pub fn obligation_state(&self, obligation: ObligationHandle) -> Result<ObligationState> {
        Ok(self.lookup_obligation(obligation)?.state())
    }

    /// Returns `true` when any obligation owned by `region` is still
    /// RESERVED.
    pub(crate) fn has_reserved_obligations(&self, region: RegionHandle) -> bool {
        self.obligations.iter().any(|(_, _, record)| {
            record.region() == region && record.state() == ObligationState::Reserved
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::PollStatus;
    use crate::runtime::RuntimeConfig;

    fn runtime() -> Runtime {
        Runtime::new()
    }

    fn noop_poll() -> PollFn {
        Box::new(|_, _| PollStatus::Ready)
    }

    #[test]
    fn region_open_initializes_open_state() {
        let mut rt = runtime();
        let region = rt.region_open().expect("open");
        assert_eq!(rt.region_state(region).expect("state"), RegionState::Open);
        assert_eq!(rt.region_live_tasks(region).expect("live"), 0);
        assert!(!rt.region_is_poisoned(region).expect("poisoned"));
    }

    #[test]
    fn region_arena_exhausts() {
        let mut rt = Runtime::with_config(RuntimeConfig {
            max_regions: 2,
            ..RuntimeConfig::default()
        });
        let _r1 = rt.region_open().expect("open");
        let _r2 = rt.region_open().expect("open");
        let err = rt.region_open().expect_err("full");
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
    }

    #[test]
    fn close_rejects_poisoned_region() {
        let mut rt = runtime();
        let region = rt.region_open().expect("open");
        rt.region_poison(region).expect("poison");
        let err = rt.region_close(region).expect_err("poisoned");
        assert_eq!(err.kind(), ErrorKind::RegionPoisoned);
        // State queries keep working on poisoned regions.
        assert_eq!(rt.region_state(region).expect("state"), RegionState::Open);
    }

    #[test]
    fn spawn_rejects_non_open_and_poisoned_regions() {
        let mut rt = runtime();
        let region = rt.region_open().expect("open");
        rt.region_close(region).expect("close");
        let err = rt.task_spawn(region, noop_poll()).expect_err("closing");
        assert_eq!(err.kind(), ErrorKind::RegionNotOpen);

        let region2 = rt.region_open().expect("open");
        rt.region_poison(region2).expect("poison");
        let err = rt.task_spawn(region2, noop_poll()).expect_err("poisoned");
        assert_eq!(err.kind(), ErrorKind::RegionPoisoned);
    }

    #[test]
    fn spawn_tracks_counters_and_state() {
        let mut rt = runtime();
        let region = rt.region_open().expect("open");
        let task = rt.task_spawn(region, noop_poll()).expect("spawn");
        assert_eq!(rt.task_state(task).expect("state"), TaskState::Created);
        assert_eq!(rt.region_live_tasks(region).expect("live"), 1);
        let err = rt.task_outcome(task).expect_err("not completed");
        assert_eq!(err.kind(), ErrorKind::TaskNotCompleted);
    }

    #[test]
    fn task_arena_exhausts() {
        let mut rt = Runtime::with_config(RuntimeConfig {
            max_tasks: 1,
            ..RuntimeConfig::default()
        });
        let region = rt.region_open().expect("open");
        let _t = rt.task_spawn(region, noop_poll()).expect("spawn");
        let err = rt.task_spawn(region, noop_poll()).expect_err("full");
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
    }

    #[test]
    fn spawn_captured_zero_fills_and_rolls_back() {
        let mut rt = Runtime::with_config(RuntimeConfig {
            max_tasks: 1,
            capture_arena_bytes: 64,
            ..RuntimeConfig::default()
        });
        let region = rt.region_open().expect("open");
        let task = rt
            .task_spawn_captured(region, 16, None, Box::new(|_, _| PollStatus::Pending))
            .expect("spawn");
        {
            let state = rt.task_capture_mut(task).expect("capture");
            assert_eq!(state.len(), 16);
            assert!(state.iter().all(|b| *b == 0));
        }
        let before = rt.region_capture_remaining(region).expect("remaining");
        // Task arena is full now; the bump pointer must roll back.
        let err = rt
            .task_spawn_captured(region, 16, None, Box::new(|_, _| PollStatus::Pending))
            .expect_err("task arena full");
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
        assert_eq!(rt.region_capture_remaining(region).expect("remaining"), before);
    }

    #[test]
    fn capture_arena_exhaustion_is_resource_exhausted() {
        let mut rt = Runtime::with_config(RuntimeConfig {
            capture_arena_bytes: 8,
            ..RuntimeConfig::default()
        });
        let region = rt.region_open().expect("open");
        let err = rt
            .task_spawn_captured(region, 64, None, noop_poll())
            .expect_err("too big");
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
    }

    #[test]
    fn obligation_linearity() {
        let mut rt = runtime();
        let region = rt.region_open().expect("open");
        let o = rt.obligation_reserve(region).expect("reserve");
        assert_eq!(
            rt.obligation_state(o).expect("state"),
            ObligationState::Reserved
        );
        rt.obligation_commit(o).expect("commit");
        assert_eq!(
            rt.obligation_state(o).expect("state"),
            ObligationState::Committed
        );
        let err = rt.obligation_abort(o).expect_err("already resolved");
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        let err = rt.obligation_commit(o).expect_err("already resolved");
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[test]
    fn obligation_reserve_needs_open_unpoisoned_region() {
        let mut rt = runtime();
        let region = rt.region_open().expect("open");
        rt.region_poison(region).expect("poison");
        let err = rt.obligation_reserve(region).expect_err("poisoned");
        assert_eq!(err.kind(), ErrorKind::RegionPoisoned);
    }

    #[test]
    fn wrong_tag_is_not_found_not_stale() {
        let mut rt = runtime();
        let region = rt.region_open().expect("open");
        // A region handle reinterpreted as a task handle must fail the tag
        // gate, not reach the arena.
        let bogus = TaskHandle::from_raw(region.raw());
        let err = rt.task_state(bogus).expect_err("tag mismatch");
        assert_eq!(err.kind(), ErrorKind::TaskNotFound);
    }
}
