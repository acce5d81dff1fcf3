//! Deterministic lab tooling for testing the core.
//!
//! The lab side observes; it never participates in scheduling. Oracles
//! consume lifecycle notifications and the scheduler event stream to check
//! invariants that single assertions cannot see.

pub mod oracle;

pub use oracle::{QuiescenceOracle, QuiescenceViolation};
