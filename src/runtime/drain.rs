//! The drain driver: close, drain, finalize, closed.
//!
//! Draining is the orderly path to quiescence: cancel what still runs with
//! parent severity, drive the scheduler until live work is gone, refuse to
//! finalize while obligations are unresolved, then run the cleanup stack in
//! LIFO order and close.

use super::Runtime;
use crate::error::{Error, ErrorKind, Result};
use crate::types::{Budget, CancelKind, RegionHandle, RegionState};

impl Runtime {
    /// Drives a region to CLOSED under the shared budget.
    ///
    /// From OPEN the region moves to CLOSING and every live task is
    /// cancelled with parent severity. The scheduler then runs until the
    /// region has no live tasks, bubbling `poll-budget-exhausted`. The core
    /// skips DRAINING (no child regions on this path) and advances to
    /// FINALIZING, where unresolved obligations park the drain with
    /// `obligations-unresolved` until the caller resolves them and retries.
    /// Cleanup callbacks then run in reverse push order and the region
    /// closes. Draining an already-CLOSED region is an idempotent `Ok`.
    pub fn region_drain(&mut self, region: RegionHandle, budget: &mut Budget) -> Result<()> {
        let state = self.region_state(region)?;
        if state == RegionState::Closed {
            return Ok(());
        }

        if state == RegionState::Open {
            let record = self.lookup_region_mut(region)?;
            record.advance(RegionState::Closing)?;
            let _ = self.cancel_propagate(region, CancelKind::Parent)?;
            tracing::debug!(target: "cordon::drain", region = %region, "drain started");
        }

        if self.lookup_region(region)?.live_tasks() > 0 {
            self.scheduler_run(region, budget)?;
            if self.lookup_region(region)?.live_tasks() > 0 {
                return Err(Error::new(ErrorKind::QuiescenceTasksLive));
            }
        }

        let state = self.region_state(region)?;
        if matches!(state, RegionState::Closing | RegionState::Draining) {
            self.lookup_region_mut(region)?
                .advance(RegionState::Finalizing)?;
        }

        if self.has_reserved_obligations(region) {
            return Err(Error::new(ErrorKind::ObligationsUnresolved));
        }

        let record = self.lookup_region_mut(region)?;
        record.cleanup_drain();
        record.advance(RegionState::Closed)?;
        tracing::debug!(target: "cordon::drain", region = %region, "region closed");
        Ok(())
    }

    /// Asserts quiescence: CLOSED, no live tasks, no RESERVED obligations.
    ///
    /// Each failure mode has its own error kind so callers can tell what is
    /// still outstanding.
    pub fn quiescence_check(&self, region: RegionHandle) -> Result<()> {
        let record = self.lookup_region(region)?;
        if record.state() != RegionState::Closed {
            return Err(Error::new(ErrorKind::QuiescenceNotReached));
        }
        if record.live_tasks() > 0 {
            return Err(Error::new(ErrorKind::QuiescenceTasksLive));
        }
        if self.has_reserved_obligations(region) {
            return Err(Error::new(ErrorKind::ObligationsUnresolved));
        }
        Ok(())
    }
}
