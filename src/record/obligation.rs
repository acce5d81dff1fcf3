//! Internal record for an obligation.

use crate::error::Result;
use crate::types::{ObligationState, RegionHandle, validate_obligation_transition};

/// A must-resolve-exactly-once contract owned by a region.
#[derive(Debug)]
pub struct ObligationRecord {
    state: ObligationState,
    region: RegionHandle,
}

impl ObligationRecord {
    /// Creates a fresh RESERVED obligation owned by `region`.
    #[must_use]
    pub const fn new(region: RegionHandle) -> Self {
        Self {
            state: ObligationState::Reserved,
            region,
        }
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ObligationState {
        self.state
    }

    /// Returns the owning region's handle.
    #[must_use]
    pub const fn region(&self) -> RegionHandle {
        self.region
    }

    /// Returns `true` once the obligation is consumed.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Resolves the obligation, validating linearity via the transition
    /// table: exactly one resolution succeeds; all later attempts are
    /// invalid transitions.
    pub fn resolve(&mut self, to: ObligationState) -> Result<()> {
        validate_obligation_transition(self.state, to)?;
        self.state = to;
        Ok(())
    }
}
