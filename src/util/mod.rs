//! Internal utilities for the Cordon runtime.
//!
//! These utilities are intentionally minimal to keep the core deterministic:
//! a fixed-capacity generational arena, a seeded RNG, and unseeded FNV-1a
//! hashing.

pub mod arena;
pub mod det_hash;
pub mod det_rng;

pub use arena::{Arena, SlotError};
pub use det_hash::{DetBuildHasher, DetHashMap, DetHashSet, DetHasher};
pub use det_rng::DetRng;
