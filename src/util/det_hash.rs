//! Deterministic hashing utilities.
//!
//! Anything observable must hash identically across runs and platforms, so
//! this module uses the public-domain 64-bit FNV-1a function (Fowler, Noll,
//! Vo; parameters from <http://www.isthe.com/chongo/tech/comp/fnv/>) with
//! no per-process seeding. Multi-byte integers are folded in as their
//! little-endian bytes so digests do not depend on host endianness. The
//! event-stream digest and the oracle maps both go through it.

use std::hash::{BuildHasher, Hasher};

/// 64-bit FNV-1a hasher.
#[derive(Debug, Clone)]
pub struct DetHasher {
    state: u64,
}

impl DetHasher {
    /// The standard FNV-1a 64-bit offset basis.
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    /// The standard FNV 64-bit prime, 2^40 + 2^8 + 0xb3.
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    /// Creates a hasher at the offset basis.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Default for DetHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for DetHasher {
    fn write(&mut self, bytes: &[u8]) {
        let mut state = self.state;
        for &byte in bytes {
            state = (state ^ u64::from(byte)).wrapping_mul(Self::PRIME);
        }
        self.state = state;
    }

    fn write_u8(&mut self, i: u8) {
        self.write(&[i]);
    }

    fn write_u16(&mut self, i: u16) {
        self.write(&i.to_le_bytes());
    }

    fn write_u32(&mut self, i: u32) {
        self.write(&i.to_le_bytes());
    }

    fn write_u64(&mut self, i: u64) {
        self.write(&i.to_le_bytes());
    }

    fn write_usize(&mut self, i: usize) {
        self.write(&(i as u64).to_le_bytes());
    }

    fn finish(&self) -> u64 {
        self.state
    }
}

/// Builder for deterministic hashers.
#[derive(Debug, Clone, Default)]
pub struct DetBuildHasher;

impl BuildHasher for DetBuildHasher {
    type Hasher = DetHasher;

    fn build_hasher(&self) -> Self::Hasher {
        DetHasher::new()
    }
}

/// Deterministic `HashMap` with reproducible hashing across runs.
pub type DetHashMap<K, V> = hashbrown::HashMap<K, V, DetBuildHasher>;

/// Deterministic `HashSet` with reproducible hashing across runs.
pub type DetHashSet<K> = hashbrown::HashSet<K, DetBuildHasher>;
