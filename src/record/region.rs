//! Internal record for a region.

use super::cleanup::{CleanupFn, CleanupStack};
use crate::error::{Error, ErrorKind, Result};
use crate::types::{RegionState, validate_region_transition};
use core::fmt;

/// Alignment of capture-arena allocations.
const CAPTURE_ALIGN: usize = 8;

/// A region's slice of the global state: lifecycle, counters, the capture
/// arena for task state, and the cleanup stack.
pub struct RegionRecord {
    state: RegionState,
    poisoned: bool,
    live_tasks: u32,
    total_spawned: u32,
    capture: Box<[u8]>,
    capture_used: usize,
    cleanup: CleanupStack,
}

impl RegionRecord {
    /// Creates a fresh OPEN region.
    #[must_use]
    pub fn new(capture_bytes: usize, cleanup_slots: usize) -> Self {
        Self {
            state: RegionState::Open,
            poisoned: false,
            live_tasks: 0,
            total_spawned: 0,
            capture: vec![0u8; capture_bytes].into_boxed_slice(),
            capture_used: 0,
            cleanup: CleanupStack::with_capacity(cleanup_slots),
        }
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> RegionState {
        self.state
    }

    /// Advances the lifecycle, validating against the transition table.
    pub fn advance(&mut self, to: RegionState) -> Result<()> {
        validate_region_transition(self.state, to)?;
        self.state = to;
        Ok(())
    }

    /// Marks the region poisoned.
    pub const fn poison(&mut self) {
        self.poisoned = true;
    }

    /// Returns `true` if the region is poisoned.
    #[must_use]
    pub const fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Returns the number of live (non-terminal) tasks.
    #[must_use]
    pub const fn live_tasks(&self) -> u32 {
        self.live_tasks
    }

    /// Returns the total number of tasks ever spawned into this region.
    #[must_use]
    pub const fn total_spawned(&self) -> u32 {
        self.total_spawned
    }

    /// Records a spawn.
    pub const fn note_spawn(&mut self) {
        self.live_tasks += 1;
        self.total_spawned += 1;
    }

    /// Records a task reaching its terminal state.
    pub const fn note_task_terminal(&mut self) {
        self.live_tasks = self.live_tasks.saturating_sub(1);
    }

    /// Returns `true` when a CLOSED region with no live tasks may be
    /// recycled.
    #[must_use]
    pub const fn is_reclaimable(&self) -> bool {
        matches!(self.state, RegionState::Closed) && self.live_tasks == 0
    }

    /// Bump-allocates a zero-filled, 8-byte-aligned capture slice.
    ///
    /// Returns the byte range inside the region's capture arena.
    pub fn capture_alloc(&mut self, size: usize) -> Result<(usize, usize)> {
        let offset = self.capture_used.next_multiple_of(CAPTURE_ALIGN);
        let end = offset
            .checked_add(size)
            .ok_or_else(|| Error::new(ErrorKind::InvalidArgument).with_context("capture size"))?;
        if end > self.capture.len() {
            return Err(Error::new(ErrorKind::ResourceExhausted).with_context("capture arena"));
        }
        self.capture[offset..end].fill(0);
        self.capture_used = end;
        Ok((offset, size))
    }

    /// Rolls the bump pointer back to a previous watermark.
    pub const fn capture_rollback(&mut self, watermark: usize) {
        self.capture_used = watermark;
    }

    /// Returns the current bump watermark.
    #[must_use]
    pub const fn capture_watermark(&self) -> usize {
        self.capture_used
    }

    /// Returns the unallocated capture bytes (before alignment padding).
    #[must_use]
    pub fn capture_remaining(&self) -> usize {
        self.capture.len() - self.capture_used
    }

    /// Returns the capture slice for a range handed out by `capture_alloc`.
    #[must_use]
    pub fn capture_slice_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        &mut self.capture[offset..offset + len]
    }

    /// Pushes a cleanup callback.
    pub fn cleanup_push(&mut self, callback: CleanupFn) -> Result<usize> {
        self.cleanup.push(callback)
    }

    /// Drains the cleanup stack in LIFO order.
    pub fn cleanup_drain(&mut self) {
        self.cleanup.drain();
    }

    /// Returns the free cleanup-stack slots.
    #[must_use]
    pub fn cleanup_remaining(&self) -> usize {
        self.cleanup.remaining()
    }
}

impl fmt::Debug for RegionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionRecord")
            .field("state", &self.state)
            .field("poisoned", &self.poisoned)
            .field("live_tasks", &self.live_tasks)
            .field("total_spawned", &self.total_spawned)
            .field("capture_used", &self.capture_used)
            .finish_non_exhaustive()
    }
}
