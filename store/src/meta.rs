//! Metadata and id allocation.

use crate::StoreError;

/// Id sequences. Each is allocated independently, starting at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sequence {
    Project,
    RecordType,
    FieldGroup,
    Record,
    Quote,
    Source,
    Request,
    Suggestion,
    Usage,
    Transaction,
}

impl Sequence {
    pub fn key(&self) -> &'static str {
        match self {
            Sequence::Project => "seq:project",
            Sequence::RecordType => "seq:record_type",
            Sequence::FieldGroup => "seq:field_group",
            Sequence::Record => "seq:record",
            Sequence::Quote => "seq:quote",
            Sequence::Source => "seq:source",
            Sequence::Request => "seq:request",
            Sequence::Suggestion => "seq:suggestion",
            Sequence::Usage => "seq:usage",
            Sequence::Transaction => "seq:transaction",
        }
    }
}

/// Generic key-value bookkeeping that doesn't belong in any domain store.
pub trait MetaStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Allocate the next id of `sequence`. Ids are never reused, even when
    /// the operation that allocated one fails afterwards.
    fn next_id(&self, sequence: Sequence) -> Result<u64, StoreError>;

    /// Database schema version; 0 for a fresh database.
    fn get_schema_version(&self) -> Result<u32, StoreError>;

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError>;
}
