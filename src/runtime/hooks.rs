//! Platform hooks: the runtime's only doors to the outside world.
//!
//! Every nondeterministic effect (allocation, clocks, entropy, reactor
//! waits, log output) dispatches through a process-owned hook table. The
//! defaults are fully deterministic: a library allocator, a counter clock,
//! and a seeded counter PRNG. Validation enforces that deterministic mode
//! cannot smuggle ambient authority back in, and the allocator can be
//! sealed as a one-way latch.

use super::Runtime;
use crate::error::{Error, ErrorKind, Result};
use crate::util::det_rng::DetRng;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error as ThisError;

/// Severity level for log-sink writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    /// Fine-grained debugging information.
    Trace = 0,
    /// Debugging information for development.
    Debug = 1,
    /// General informational messages.
    #[default]
    Info = 2,
    /// Potentially problematic situations.
    Warn = 3,
    /// Error conditions that don't halt execution.
    Error = 4,
}

impl LogLevel {
    /// Returns the level name as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

/// Allocator hook: byte-buffer allocation behind the seal latch.
pub trait AllocatorHook {
    /// Allocates a zeroed buffer, or `None` under memory pressure.
    fn alloc(&self, len: usize) -> Option<Box<[u8]>>;

    /// Resizes a buffer, preserving the common prefix.
    fn realloc(&self, buf: Box<[u8]>, new_len: usize) -> Option<Box<[u8]>>;

    /// Releases a buffer.
    fn free(&self, buf: Box<[u8]>);
}

/// Clock hook: wall and logical time.
pub trait ClockHook {
    /// Returns nanoseconds since an arbitrary origin.
    fn now_ns(&self) -> u64;

    /// Returns the logical clock, if this clock provides one.
    ///
    /// Mandatory in deterministic mode.
    fn logical_now_ns(&self) -> Option<u64>;
}

/// Entropy hook.
pub trait EntropyHook {
    /// Returns the next random value.
    fn random_u64(&self) -> u64;

    /// Returns `true` when the sequence is fully determined by a seed.
    fn is_seeded(&self) -> bool;
}

/// Reactor hook: the blocking boundary.
pub trait ReactorHook {
    /// Waits for at most `max_ns`, returning the nanoseconds spent.
    fn wait(&self, max_ns: u64) -> u64;

    /// Deterministic ghost wait, if this reactor provides one.
    ///
    /// Mandatory in deterministic mode whenever a reactor is installed.
    fn ghost_wait(&self, max_ns: u64) -> Option<u64>;

    /// Returns `true` when a ghost path is available.
    fn has_ghost_path(&self) -> bool;
}

/// Log-sink hook.
pub trait LogHook {
    /// Writes one log line.
    fn write(&self, level: LogLevel, line: &str);
}

/// Library allocator: plain heap buffers.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

impl AllocatorHook for HeapAllocator {
    fn alloc(&self, len: usize) -> Option<Box<[u8]>> {
        Some(vec![0u8; len].into_boxed_slice())
    }

    fn realloc(&self, buf: Box<[u8]>, new_len: usize) -> Option<Box<[u8]>> {
        let mut next = vec![0u8; new_len];
        let keep = buf.len().min(new_len);
        next[..keep].copy_from_slice(&buf[..keep]);
        Some(next.into_boxed_slice())
    }

    fn free(&self, buf: Box<[u8]>) {
        drop(buf);
    }
}

/// Deterministic counter clock. Every read advances by a fixed step, so
/// repeated reads are distinct, ordered, and identical across runs.
#[derive(Debug)]
pub struct CounterClock {
    next: AtomicU64,
    step: u64,
}

impl CounterClock {
    /// Creates a counter clock starting at `origin`, advancing by `step`
    /// per read.
    #[must_use]
    pub const fn new(origin: u64, step: u64) -> Self {
        Self {
            next: AtomicU64::new(origin),
            step,
        }
    }
}

impl Default for CounterClock {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl ClockHook for CounterClock {
    fn now_ns(&self) -> u64 {
        self.next.fetch_add(self.step, Ordering::Relaxed)
    }

    fn logical_now_ns(&self) -> Option<u64> {
        Some(self.now_ns())
    }
}

/// Seeded counter PRNG (splitmix64 over an atomic counter).
#[derive(Debug)]
pub struct SeededEntropy {
    state: AtomicU64,
}

impl SeededEntropy {
    /// Creates a seeded source.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: AtomicU64::new(seed),
        }
    }
}

impl EntropyHook for SeededEntropy {
    fn random_u64(&self) -> u64 {
        let state = self
            .state
            .fetch_add(0x9e37_79b9_7f4a_7c15, Ordering::Relaxed);
        DetRng::new(state).next_u64()
    }

    fn is_seeded(&self) -> bool {
        true
    }
}

/// OS-backed entropy for non-deterministic profiles.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropyHook for OsEntropy {
    fn random_u64(&self) -> u64 {
        let mut buf = [0u8; 8];
        getrandom::fill(&mut buf).expect("OS entropy failed");
        u64::from_le_bytes(buf)
    }

    fn is_seeded(&self) -> bool {
        false
    }
}

/// Ghost reactor: pretends every wait ran to its bound. The deterministic
/// stand-in for a real platform reactor.
#[derive(Debug, Default, Clone, Copy)]
pub struct GhostReactor;

impl ReactorHook for GhostReactor {
    fn wait(&self, max_ns: u64) -> u64 {
        max_ns
    }

    fn ghost_wait(&self, max_ns: u64) -> Option<u64> {
        Some(max_ns)
    }

    fn has_ghost_path(&self) -> bool {
        true
    }
}

/// Default log sink forwarding to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceLogSink;

impl LogHook for TraceLogSink {
    fn write(&self, level: LogLevel, line: &str) {
        match level {
            LogLevel::Trace => tracing::trace!(target: "cordon::log", "{line}"),
            LogLevel::Debug => tracing::debug!(target: "cordon::log", "{line}"),
            LogLevel::Info => tracing::info!(target: "cordon::log", "{line}"),
            LogLevel::Warn => tracing::warn!(target: "cordon::log", "{line}"),
            LogLevel::Error => tracing::error!(target: "cordon::log", "{line}"),
        }
    }
}

/// A hook misconfiguration found by validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum HookError {
    /// A mandatory hook category is absent.
    #[error("mandatory hook missing: {0}")]
    Missing(&'static str),
    /// A hook contradicts its declared capabilities.
    #[error("hook inconsistent with its declaration: {0}")]
    Invalid(&'static str),
    /// The configuration cannot satisfy deterministic mode.
    #[error("deterministic mode violation: {0}")]
    Determinism(&'static str),
}

impl From<HookError> for Error {
    fn from(e: HookError) -> Self {
        let kind = match e {
            HookError::Missing(_) => ErrorKind::HookMissing,
            HookError::Invalid(_) => ErrorKind::HookInvalid,
            HookError::Determinism(_) => ErrorKind::DeterminismViolation,
        };
        let ctx = match e {
            HookError::Missing(c) | HookError::Invalid(c) | HookError::Determinism(c) => c,
        };
        Self::new(kind).with_context(ctx)
    }
}

/// The process-wide hook table.
#[derive(Clone)]
pub struct RuntimeHooks {
    /// Allocator; mandatory.
    pub allocator: Option<Arc<dyn AllocatorHook>>,
    /// Clock; mandatory.
    pub clock: Option<Arc<dyn ClockHook>>,
    /// Entropy source.
    pub entropy: Option<Arc<dyn EntropyHook>>,
    /// Reactor; optional.
    pub reactor: Option<Arc<dyn ReactorHook>>,
    /// Log sink; optional.
    pub log: Option<Arc<dyn LogHook>>,
    /// Declares that the entropy hook is a deterministic seeded PRNG.
    pub deterministic_seeded_prng: bool,
}

impl RuntimeHooks {
    /// Fills the table with safe deterministic defaults: library
    /// allocator, counter clock, seeded counter PRNG, tracing log sink,
    /// no reactor.
    #[must_use]
    pub fn init(seed: u64) -> Self {
        Self {
            allocator: Some(Arc::new(HeapAllocator)),
            clock: Some(Arc::new(CounterClock::default())),
            entropy: Some(Arc::new(SeededEntropy::new(seed))),
            reactor: None,
            log: Some(Arc::new(TraceLogSink)),
            deterministic_seeded_prng: true,
        }
    }

    /// Validates the table for the given mode.
    ///
    /// The allocator and clock are always mandatory. Deterministic mode
    /// additionally requires a logical clock, a declared seeded PRNG for
    /// any entropy hook, and a ghost path for any installed reactor.
    pub fn validate(&self, deterministic: bool) -> std::result::Result<(), HookError> {
        if self.allocator.is_none() {
            return Err(HookError::Missing("allocator"));
        }
        let Some(ref clock) = self.clock else {
            return Err(HookError::Missing("clock"));
        };
        if let Some(ref entropy) = self.entropy {
            if self.deterministic_seeded_prng && !entropy.is_seeded() {
                return Err(HookError::Invalid("entropy declared seeded but is not"));
            }
        }
        if deterministic {
            if clock.logical_now_ns().is_none() {
                return Err(HookError::Determinism("logical clock required"));
            }
            if self.entropy.is_some() && !self.deterministic_seeded_prng {
                return Err(HookError::Determinism("entropy must be a seeded PRNG"));
            }
            if let Some(ref reactor) = self.reactor {
                if !reactor.has_ghost_path() {
                    return Err(HookError::Determinism("reactor lacks a ghost path"));
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for RuntimeHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeHooks")
            .field("allocator", &self.allocator.is_some())
            .field("clock", &self.clock.is_some())
            .field("entropy", &self.entropy.is_some())
            .field("reactor", &self.reactor.is_some())
            .field("log", &self.log.is_some())
            .field("deterministic_seeded_prng", &self.deterministic_seeded_prng)
            .finish()
    }
}

impl Runtime {
    /// Installs a hook table after validating it for the configured mode.
    pub fn set_hooks(&mut self, hooks: RuntimeHooks) -> Result<()> {
        hooks.validate(self.config.deterministic)?;
        self.hooks = hooks;
        Ok(())
    }

    /// Returns the installed hook table.
    #[must_use]
    pub fn hooks(&self) -> &RuntimeHooks {
        &self.hooks
    }

    /// Latches the allocator seal. Irreversible for the life of this
    /// runtime; later allocation attempts fail with `allocator-sealed`.
    pub fn seal_allocator(&mut self) {
        self.allocator_sealed = true;
        tracing::debug!(target: "cordon::hooks", "allocator sealed");
    }

    /// Returns `true` once the allocator is sealed.
    #[must_use]
    pub fn is_allocator_sealed(&self) -> bool {
        self.allocator_sealed
    }

    /// Allocates through the allocator hook.
    pub fn alloc(&self, len: usize) -> Result<Box<[u8]>> {
        if self.allocator_sealed {
            return Err(Error::new(ErrorKind::AllocatorSealed));
        }
        let allocator = self
            .hooks
            .allocator
            .as_ref()
            .ok_or_else(|| Error::new(ErrorKind::HookMissing).with_context("allocator"))?;
        tracing::trace!(target: "cordon::hooks", len, "alloc");
        allocator
            .alloc(len)
            .ok_or_else(|| Error::new(ErrorKind::ResourceExhausted).with_context("allocator"))
    }

    /// Reallocates through the allocator hook.
    pub fn realloc(&self, buf: Box<[u8]>, new_len: usize) -> Result<Box<[u8]>> {
        if self.allocator_sealed {
            return Err(Error::new(ErrorKind::AllocatorSealed));
        }
        let allocator = self
            .hooks
            .allocator
            .as_ref()
            .ok_or_else(|| Error::new(ErrorKind::HookMissing).with_context("allocator"))?;
        tracing::trace!(target: "cordon::hooks", new_len, "realloc");
        allocator
            .realloc(buf, new_len)
            .ok_or_else(|| Error::new(ErrorKind::ResourceExhausted).with_context("allocator"))
    }

    /// Frees through the allocator hook. Release is always admitted, even
    /// after sealing.
    pub fn free(&self, buf: Box<[u8]>) {
        if let Some(ref allocator) = self.hooks.allocator {
            allocator.free(buf);
        }
    }

    /// Reads the clock hook, preferring the logical clock in deterministic
    /// mode.
    #[must_use]
    pub fn now_ns(&self) -> u64 {
        let Some(ref clock) = self.hooks.clock else {
            return 0;
        };
        if self.config.deterministic {
            clock.logical_now_ns().unwrap_or_else(|| clock.now_ns())
        } else {
            clock.now_ns()
        }
    }

    /// Draws from the entropy hook.
    pub fn random_u64(&self) -> Result<u64> {
        let entropy = self
            .hooks
            .entropy
            .as_ref()
            .ok_or_else(|| Error::new(ErrorKind::HookMissing).with_context("entropy"))?;
        let value = entropy.random_u64();
        tracing::trace!(target: "cordon::hooks", value, "random_u64");
        Ok(value)
    }

    /// Waits on the reactor hook, taking the ghost path in deterministic
    /// mode.
    pub fn reactor_wait(&self, max_ns: u64) -> Result<u64> {
        let reactor = self
            .hooks
            .reactor
            .as_ref()
            .ok_or_else(|| Error::new(ErrorKind::HookMissing).with_context("reactor"))?;
        let waited = if self.config.deterministic {
            reactor
                .ghost_wait(max_ns)
                .ok_or(Error::new(ErrorKind::DeterminismViolation).with_context("ghost wait"))?
        } else {
            reactor.wait(max_ns)
        };
        tracing::trace!(target: "cordon::hooks", max_ns, waited, "reactor wait");
        Ok(waited)
    }

    /// Writes a line through the log-sink hook.
    pub fn log_write(&self, level: LogLevel, line: &str) {
        if let Some(ref log) = self.hooks.log {
            log.write(level, line);
        }
    }
}
