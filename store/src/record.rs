//! Record and evidence storage trait.
//!
//! A record and its evidence set are stored side by side and always written
//! in the same transaction, so a quote unlink and the verification it
//! revokes can never be observed apart.

use crate::StoreError;
use attest_evidence::EvidenceSet;
use attest_records::{Record, RecordStatus};
use attest_types::{ProjectId, RecordId};

pub trait RecordStore {
    /// Insert a new record with its (usually empty) evidence set.
    fn insert_record(&self, record: &Record, evidence: &EvidenceSet) -> Result<(), StoreError>;

    fn get_record(&self, id: RecordId) -> Result<Record, StoreError>;

    fn get_evidence(&self, id: RecordId) -> Result<EvidenceSet, StoreError>;

    /// Records of a project currently in `status`, oldest first.
    fn records_in_status(
        &self,
        project: ProjectId,
        status: RecordStatus,
    ) -> Result<Vec<Record>, StoreError>;

    /// Re-read record and evidence in a write transaction and apply `f`.
    ///
    /// On success the record's revision is bumped and both are written.
    /// Returns the stored record.
    fn update_record<T, E, F>(&self, id: RecordId, f: F) -> Result<(Record, T), E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Record, &mut EvidenceSet) -> Result<T, E>;
}
