//! LMDB storage backend for the attest verification core.
//!
//! Implements every storage trait from `attest-store` on one `heed`
//! environment. LMDB allows a single writer at a time, so each closure-based
//! update sees the latest committed state and nothing can interleave between
//! its read and its write.
//!
//! JSON-bearing values (records, schemas, requests) are stored as
//! `serde_json`; fixed-shape ledger entries and usage events as `bincode`.
//! Ids are encoded big-endian so keys sort in allocation order.

pub mod audit;
pub mod environment;
pub mod error;
pub mod meta;
pub mod quota;
pub mod record;
pub mod schema;
pub mod suggestion;

pub use environment::LmdbStore;
pub use error::LmdbError;
