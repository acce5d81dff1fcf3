//! Opaque generation-tagged handles.
//!
//! A handle is a packed 64-bit value: `[type_tag:16 | admission_mask:16 |
//! generation:16 | slot_index:16]`, most significant field first. The
//! all-zero value is reserved as the invalid handle. The admission mask is a
//! bitset over the entity's state enum, snapshotted when the handle was
//! produced, so call sites can reject obviously-stale operations in O(1)
//! before the gated arena lookup runs.
//!
//! Typed wrappers ([`RegionHandle`], [`TaskHandle`], [`ObligationHandle`])
//! are the public currency; the raw packing is exposed for collaborators
//! that ferry handles across a wire, with the caveat that generations are
//! never stable across runs.

use core::fmt;
use serde::{Deserialize, Serialize};

/// The entity kind discriminant carried in a handle's type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum HandleKind {
    /// A structured-concurrency region.
    Region = 1,
    /// A cooperatively polled task.
    Task = 2,
    /// A must-resolve-once obligation.
    Obligation = 3,
    /// A cancel-phase witness (collaborator entity).
    CancelWitness = 4,
    /// A timer-wheel entry (collaborator entity).
    Timer = 5,
    /// A channel endpoint (collaborator entity).
    Channel = 6,
}

impl HandleKind {
    /// Decodes a type tag, if it names a known kind.
    #[must_use]
    pub const fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            1 => Some(Self::Region),
            2 => Some(Self::Task),
            3 => Some(Self::Obligation),
            4 => Some(Self::CancelWitness),
            5 => Some(Self::Timer),
            6 => Some(Self::Channel),
            _ => None,
        }
    }

    /// Returns the wire tag for this kind.
    #[must_use]
    pub const fn tag(self) -> u16 {
        self as u16
    }
}

/// A packed, opaque 64-bit handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawHandle(u64);

impl RawHandle {
    /// The reserved invalid handle.
    pub const INVALID: Self = Self(0);

    /// Packs the four handle fields.
    #[must_use]
    pub const fn pack(kind: HandleKind, mask: u16, generation: u16, slot: u16) -> Self {
        Self(
            ((kind.tag() as u64) << 48)
                | ((mask as u64) << 32)
                | ((generation as u64) << 16)
                | (slot as u64),
        )
    }

    /// Returns the packed bits (64-bit little-endian if serialized).
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Rebuilds a handle from packed bits. No validation beyond packing.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw type tag field.
    #[must_use]
    pub const fn tag(self) -> u16 {
        (self.0 >> 48) as u16
    }

    /// Returns the entity kind, if the tag is known.
    #[must_use]
    pub const fn kind(self) -> Option<HandleKind> {
        HandleKind::from_tag(self.tag())
    }

    /// Returns the admission mask snapshotted into the handle.
    #[must_use]
    pub const fn admission_mask(self) -> u16 {
        (self.0 >> 32) as u16
    }

    /// Returns the generation field.
    #[must_use]
    pub const fn generation(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Returns the slot index field.
    #[must_use]
    pub const fn slot(self) -> u16 {
        self.0 as u16
    }

    /// Returns `true` unless this is the reserved invalid handle.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// O(1) call-site admission check: does the handle's snapshotted state
    /// mask intersect the operation's allowed-state mask?
    ///
    /// This is advisory; the gated arena lookup remains authoritative.
    #[must_use]
    pub const fn state_allowed(self, allowed: u16) -> bool {
        self.admission_mask() & allowed != 0
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RawHandle(tag={} mask={:#06x} gen={} slot={})",
            self.tag(),
            self.admission_mask(),
            self.generation(),
            self.slot()
        )
    }
}

macro_rules! typed_handle {
    ($(#[$doc:meta])* $name:ident, $kind:expr, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(RawHandle);

        impl $name {
            /// Builds a handle from slot coordinates and a state-mask snapshot.
            #[inline]
            #[must_use]
            pub(crate) const fn from_parts(mask: u16, generation: u16, slot: u16) -> Self {
                Self(RawHandle::pack($kind, mask, generation, slot))
            }

            /// Returns the packed raw handle.
            #[inline]
            #[must_use]
            pub const fn raw(self) -> RawHandle {
                self.0
            }

            /// Rebuilds the typed wrapper from a raw handle.
            ///
            /// The tag is not checked here; lookups reject mismatched tags
            /// with `not-found`.
            #[inline]
            #[must_use]
            pub const fn from_raw(raw: RawHandle) -> Self {
                Self(raw)
            }

            /// Returns the generation field.
            #[inline]
            #[must_use]
            pub const fn generation(self) -> u16 {
                self.0.generation()
            }

            /// Returns the slot index field.
            #[inline]
            #[must_use]
            pub const fn slot(self) -> u16 {
                self.0.slot()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    concat!(stringify!($name), "({}:{})"),
                    self.0.slot(),
                    self.0.generation()
                )
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0.slot())
            }
        }
    };
}

typed_handle!(
    /// A handle to a region.
    RegionHandle,
    HandleKind::Region,
    "R"
);

typed_handle!(
    /// A handle to a task.
    TaskHandle,
    HandleKind::Task,
    "T"
);

typed_handle!(
    /// A handle to an obligation.
    ObligationHandle,
    HandleKind::Obligation,
    "O"
);
