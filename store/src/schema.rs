//! Project and record type storage trait.

use crate::StoreError;
use attest_schema::{Project, RecordType};
use attest_types::{ProjectId, RecordTypeId};

pub trait SchemaStore {
    /// Insert a new project. `Duplicate` if the id is taken.
    fn insert_project(&self, project: &Project) -> Result<(), StoreError>;

    fn get_project(&self, id: ProjectId) -> Result<Project, StoreError>;

    /// Insert a new record type. `Duplicate` if the id is taken.
    fn insert_record_type(&self, record_type: &RecordType) -> Result<(), StoreError>;

    fn get_record_type(&self, id: RecordTypeId) -> Result<RecordType, StoreError>;

    fn record_types(&self, project: ProjectId) -> Result<Vec<RecordType>, StoreError>;

    /// Re-read the record type in a write transaction and apply `f` to it.
    fn update_record_type<T, E, F>(&self, id: RecordTypeId, f: F) -> Result<(RecordType, T), E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut RecordType) -> Result<T, E>;
}
