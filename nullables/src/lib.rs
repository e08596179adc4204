//! Nullable infrastructure for deterministic testing.
//!
//! The core reads time, identities and storage through traits. This crate
//! provides test-friendly implementations that return deterministic values,
//! can be controlled programmatically, and never touch the filesystem.
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod roles;
pub mod store;

pub use clock::NullClock;
pub use roles::StaticRoles;
pub use store::NullStore;
