//! Abstract storage traits for the attest verification core.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The service depends only on the traits.
//!
//! Mutations that must observe the latest state take a closure. The backend
//! re-reads the entity inside its write transaction, hands it to the closure
//! and persists the result only when the closure returns `Ok`. An `Err`
//! leaves storage untouched.

pub mod audit;
pub mod error;
pub mod meta;
pub mod quota;
pub mod record;
pub mod schema;
pub mod suggestion;

pub use audit::AuditStore;
pub use error::StoreError;
pub use meta::{MetaStore, Sequence};
pub use quota::{charge_usage, CommittedUsage, QuotaStore, UsageKey};
pub use record::RecordStore;
pub use schema::SchemaStore;
pub use suggestion::SuggestionStore;

/// Everything the service needs from a backend.
pub trait Store:
    MetaStore + SchemaStore + RecordStore + AuditStore + SuggestionStore + QuotaStore
{
}

impl<T> Store for T where
    T: MetaStore + SchemaStore + RecordStore + AuditStore + SuggestionStore + QuotaStore
{
}
