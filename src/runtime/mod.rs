//! The runtime: arenas, hooks, scheduler, and lifecycle driver.
//!
//! All mutable state lives in a [`Runtime`] value owned by the driver; there
//! are no process-wide globals. Operations take `&mut self` and everything
//! observable happens on the calling control flow.

pub mod cancel;
pub mod containment;
pub mod drain;
pub mod hooks;
pub mod lifecycle;
pub mod resource;
pub mod scheduler;

pub use cancel::Checkpoint;
pub use containment::ContainmentPolicy;
pub use hooks::{
    AllocatorHook, ClockHook, CounterClock, EntropyHook, GhostReactor, HeapAllocator, HookError,
    LogHook, LogLevel, OsEntropy, ReactorHook, RuntimeHooks, SeededEntropy, TraceLogSink,
};
pub use resource::{ResourceKind, ResourceSnapshot};
pub use scheduler::{SchedEvent, SchedEventKind};

use crate::record::{ObligationRecord, RegionRecord, TaskRecord};
use crate::types::ObligationState;
use crate::util::Arena;

/// The active platform profile, fixed at compile time by feature selection.
///
/// Profiles adjust defaults (wait policy, quarantine) and never alter the
/// canonical semantics observable through the scheduler event sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformProfile {
    /// Portable default with deterministic hooks.
    Core,
    /// POSIX hosts.
    Posix,
    /// Windows hosts.
    Win32,
    /// No OS at all.
    Freestanding,
    /// Router-class embedded targets.
    EmbeddedRouter,
    /// High-frequency-trading hosts.
    Hft,
    /// Automotive targets.
    Automotive,
    /// Experimental parallel build (the core itself stays single-threaded).
    Parallel,
}

impl PlatformProfile {
    /// Returns the profile selected by cargo features.
    #[must_use]
    pub const fn active() -> Self {
        if cfg!(feature = "platform-posix") {
            Self::Posix
        } else if cfg!(feature = "platform-win32") {
            Self::Win32
        } else if cfg!(feature = "platform-freestanding") {
            Self::Freestanding
        } else if cfg!(feature = "platform-embedded-router") {
            Self::EmbeddedRouter
        } else if cfg!(feature = "platform-hft") {
            Self::Hft
        } else if cfg!(feature = "platform-automotive") {
            Self::Automotive
        } else if cfg!(feature = "platform-parallel") {
            Self::Parallel
        } else {
            Self::Core
        }
    }

    /// Default reactor wait policy for this profile.
    #[must_use]
    pub const fn wait_policy(self) -> WaitPolicy {
        match self {
            Self::Core | Self::Freestanding => WaitPolicy::Ghost,
            Self::Hft => WaitPolicy::Spin,
            _ => WaitPolicy::Block,
        }
    }

    /// Default region-quarantine setting for this profile.
    #[must_use]
    pub const fn quarantine_closed_regions(self) -> bool {
        matches!(self, Self::Automotive)
    }
}

/// The active safety profile, fixed at compile time by feature selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SafetyProfile {
    /// Development: fault containment is fail-fast.
    Debug,
    /// Hardened deployment: faults poison the owning region.
    Hardened,
    /// Release: faults are returned with no side effects.
    Release,
}

impl SafetyProfile {
    /// Returns the profile selected by cargo features.
    #[must_use]
    pub const fn active() -> Self {
        if cfg!(feature = "safety-hardened") {
            Self::Hardened
        } else if cfg!(feature = "safety-release") {
            Self::Release
        } else {
            Self::Debug
        }
    }

    /// Default containment policy for this profile.
    #[must_use]
    pub const fn containment(self) -> ContainmentPolicy {
        match self {
            Self::Debug => ContainmentPolicy::FailFast,
            Self::Hardened => ContainmentPolicy::PoisonRegion,
            Self::Release => ContainmentPolicy::ErrorOnly,
        }
    }
}

/// How reactor waits behave by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitPolicy {
    /// Block on the platform reactor.
    Block,
    /// Spin without yielding to the OS.
    Spin,
    /// Take the deterministic ghost path.
    Ghost,
}

/// Construction-time parameters for a [`Runtime`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Region arena capacity.
    pub max_regions: u16,
    /// Task arena capacity.
    pub max_tasks: u16,
    /// Obligation arena capacity.
    pub max_obligations: u16,
    /// Per-region capture arena size in bytes.
    pub capture_arena_bytes: usize,
    /// Per-region cleanup-stack depth.
    pub cleanup_stack_slots: usize,
    /// Fault containment policy.
    pub containment: ContainmentPolicy,
    /// Forbid recycling of CLOSED region slots (diagnostic aid).
    pub quarantine_closed_regions: bool,
    /// Deterministic mode: logical clock, seeded entropy, ghost reactor.
    pub deterministic: bool,
    /// Seed for the default entropy hook.
    pub entropy_seed: u64,
    /// Default reactor wait policy.
    pub wait_policy: WaitPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let platform = PlatformProfile::active();
        let safety = SafetyProfile::active();
        Self {
            max_regions: 16,
            max_tasks: 128,
            max_obligations: 64,
            capture_arena_bytes: 512,
            cleanup_stack_slots: 16,
            containment: safety.containment(),
            quarantine_closed_regions: platform.quarantine_closed_regions(),
            deterministic: true,
            entropy_seed: 0,
            wait_policy: platform.wait_policy(),
        }
    }
}

/// The deterministic structured-concurrency core.
///
/// Owns the three entity arenas, the hook table, the allocator seal latch,
/// and the scheduler event buffer.
#[derive(Debug)]
pub struct Runtime {
    pub(crate) config: RuntimeConfig,
    pub(crate) hooks: RuntimeHooks,
    pub(crate) allocator_sealed: bool,
    pub(crate) regions: Arena<RegionRecord>,
    pub(crate) tasks: Arena<TaskRecord>,
    pub(crate) obligations: Arena<ObligationRecord>,
    pub(crate) events: Vec<SchedEvent>,
    pub(crate) event_seq: u32,
}

impl Runtime {
    /// Creates a runtime with the default configuration for the active
    /// profiles.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Creates a runtime with an explicit configuration.
    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        let hooks = RuntimeHooks::init(config.entropy_seed);
        Self {
            regions: Arena::with_capacity(config.max_regions),
            tasks: Arena::with_capacity(config.max_tasks),
            obligations: Arena::with_capacity(config.max_obligations),
            events: Vec::new(),
            event_seq: 0,
            allocator_sealed: false,
            hooks,
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Reinitializes the runtime to its freshly-constructed state.
    ///
    /// Obligations still RESERVED at reset are marked LEAKED first, which is
    /// the runtime's detection point for unresolved contracts; the leak is
    /// reported through the log sink before the arenas are rebuilt.
    pub fn reset(&mut self) {
        let mut leaked = 0u32;
        for index in 0..self.obligations.capacity() {
            if let Some((_, record)) = self.obligations.at_mut(index) {
                if record.state() == ObligationState::Reserved
                    && record.resolve(ObligationState::Leaked).is_ok()
                {
                    leaked += 1;
                }
            }
        }
        if leaked > 0 {
            tracing::warn!(target: "cordon::runtime", leaked, "obligations leaked at reset");
        }
        let config = self.config.clone();
        *self = Self::with_config(config);
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn default_profiles_are_core_debug() {
        assert_eq!(PlatformProfile::active(), PlatformProfile::Core);
        assert_eq!(SafetyProfile::active(), SafetyProfile::Debug);
        let config = RuntimeConfig::default();
        assert_eq!(config.containment, ContainmentPolicy::FailFast);
        assert!(!config.quarantine_closed_regions);
        assert_eq!(config.wait_policy, WaitPolicy::Ghost);
    }

    #[test]
    fn profile_defaults_differ_by_profile() {
        assert_eq!(PlatformProfile::Hft.wait_policy(), WaitPolicy::Spin);
        assert_eq!(PlatformProfile::Posix.wait_policy(), WaitPolicy::Block);
        assert!(PlatformProfile::Automotive.quarantine_closed_regions());
        assert_eq!(
            SafetyProfile::Hardened.containment(),
            ContainmentPolicy::PoisonRegion
        );
        assert_eq!(
            SafetyProfile::Release.containment(),
            ContainmentPolicy::ErrorOnly
        );
    }

    #[test]
    fn seal_is_a_one_way_latch() {
        let mut rt = Runtime::new();
        assert!(rt.alloc(8).is_ok());
        rt.seal_allocator();
        let err = rt.alloc(8).expect_err("sealed");
        assert_eq!(err.kind(), ErrorKind::AllocatorSealed);
        let err = rt.realloc(vec![0u8; 2].into_boxed_slice(), 4).expect_err("sealed");
        assert_eq!(err.kind(), ErrorKind::AllocatorSealed);
    }

    #[test]
    fn reset_rebuilds_fresh_state() {
        let mut rt = Runtime::new();
        let region = rt.region_open().expect("open");
        rt.seal_allocator();
        rt.reset();
        assert!(!rt.is_allocator_sealed());
        let err = rt.region_state(region).expect_err("handle died with reset");
        assert_eq!(err.kind(), ErrorKind::RegionNotFound);
        assert!(rt.alloc(4).is_ok());
    }

    #[test]
    fn reset_marks_reserved_obligations_leaked() {
        let mut rt = Runtime::new();
        let region = rt.region_open().expect("open");
        let _o = rt.obligation_reserve(region).expect("reserve");
        // Reset itself is the detection point; nothing to observe afterwards
        // beyond a clean runtime, but the transition must not error.
        rt.reset();
        assert_eq!(rt.resource_used(crate::runtime::resource::ResourceKind::Obligations), 0);
    }
}
