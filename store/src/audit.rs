//! Verification request storage trait.

use crate::StoreError;
use attest_audit::VerificationRequest;
use attest_types::{RecordId, RequestId};

pub trait AuditStore {
    /// Create a request for `record`. `f` sees every existing request of the
    /// record as read inside the write transaction, so the open-request
    /// check cannot race another creation.
    fn create_request<E, F>(&self, record: RecordId, f: F) -> Result<VerificationRequest, E>
    where
        E: From<StoreError>,
        F: FnOnce(&[VerificationRequest]) -> Result<VerificationRequest, E>;

    fn get_request(&self, id: RequestId) -> Result<VerificationRequest, StoreError>;

    /// Requests of a record, oldest first.
    fn requests_for_record(&self, record: RecordId)
        -> Result<Vec<VerificationRequest>, StoreError>;

    fn update_request<T, E, F>(&self, id: RequestId, f: F) -> Result<(VerificationRequest, T), E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut VerificationRequest) -> Result<T, E>;
}
