//! The resource contract: capacity queries and admission predicates.
//!
//! Pure, point-in-time queries over the three entity arenas plus the
//! per-region bounded structures. `admit` is a non-mutating predicate; a
//! successful admission check is not a reservation.

use super::Runtime;
use crate::error::{Error, ErrorKind, Result};
use crate::types::RegionHandle;
use serde::{Deserialize, Serialize};

/// The bounded entity kinds the contract covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// The region arena.
    Regions,
    /// The task arena.
    Tasks,
    /// The obligation arena.
    Obligations,
}

/// A point-in-time capacity snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// The arena the snapshot describes.
    pub kind: ResourceKind,
    /// Fixed capacity.
    pub capacity: u16,
    /// Occupied slots at snapshot time.
    pub used: u16,
    /// Free slots at snapshot time.
    pub remaining: u16,
}

impl Runtime {
    /// Returns the fixed capacity of an arena.
    #[must_use]
    pub fn resource_capacity(&self, kind: ResourceKind) -> u16 {
        match kind {
            ResourceKind::Regions => self.regions.capacity(),
            ResourceKind::Tasks => self.tasks.capacity(),
            ResourceKind::Obligations => self.obligations.capacity(),
        }
    }

    /// Returns the occupied slot count of an arena.
    #[must_use]
    pub fn resource_used(&self, kind: ResourceKind) -> u16 {
        match kind {
            ResourceKind::Regions => self.regions.used(),
            ResourceKind::Tasks => self.tasks.used(),
            ResourceKind::Obligations => self.obligations.used(),
        }
    }

    /// Returns the free slot count of an arena.
    #[must_use]
    pub fn resource_remaining(&self, kind: ResourceKind) -> u16 {
        self.resource_capacity(kind) - self.resource_used(kind)
    }

    /// Takes a point-in-time snapshot of an arena.
    #[must_use]
    pub fn resource_snapshot(&self, kind: ResourceKind) -> ResourceSnapshot {
        let capacity = self.resource_capacity(kind);
        let used = self.resource_used(kind);
        ResourceSnapshot {
            kind,
            capacity,
            used,
            remaining: capacity - used,
        }
    }

    /// Non-mutating admission check: would `count` more entities fit?
    pub fn resource_admit(&self, kind: ResourceKind, count: u16) -> Result<()> {
        if self.resource_remaining(kind) >= count {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::ResourceExhausted))
        }
    }

    /// Returns the unallocated capture-arena bytes of a region.
    pub fn region_capture_remaining(&self, region: RegionHandle) -> Result<usize> {
        Ok(self.lookup_region(region)?.capture_remaining())
    }

    /// Returns the free cleanup-stack slots of a region.
    pub fn region_cleanup_remaining(&self, region: RegionHandle) -> Result<usize> {
        Ok(self.lookup_region(region)?.cleanup_remaining())
    }
}
