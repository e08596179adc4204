//! LMDB implementation of AuditStore.

use attest_audit::VerificationRequest;
use attest_store::{AuditStore, StoreError};
use attest_types::{RecordId, RequestId};
use heed::RoTxn;

use crate::environment::{composite_key, prefix_keys, put_json, require_json, trailing_id};
use crate::error::backend;
use crate::{LmdbError, LmdbStore};

impl LmdbStore {
    fn requests_in(
        &self,
        txn: &RoTxn<'_>,
        record: RecordId,
    ) -> Result<Vec<VerificationRequest>, LmdbError> {
        let keys = prefix_keys(&self.requests_by_record_db, txn, &record.to_be_bytes())?;
        keys.iter()
            .map(|key| {
                let id = RequestId::new(trailing_id(key)?);
                require_json(&self.requests_db, txn, &id.to_be_bytes(), id)
            })
            .collect()
    }
}

impl AuditStore for LmdbStore {
    fn create_request<E, F>(&self, record: RecordId, f: F) -> Result<VerificationRequest, E>
    where
        E: From<StoreError>,
        F: FnOnce(&[VerificationRequest]) -> Result<VerificationRequest, E>,
    {
        let mut wtxn = self.env.write_txn().map_err(backend)?;
        let existing = self.requests_in(&wtxn, record).map_err(backend)?;
        let request = f(&existing)?;

        let key = request.id.to_be_bytes();
        if self.requests_db.get(&wtxn, &key).map_err(backend)?.is_some() {
            return Err(StoreError::Duplicate(request.id.to_string()).into());
        }
        put_json(&self.requests_db, &mut wtxn, &key, &request).map_err(backend)?;
        self.requests_by_record_db
            .put(
                &mut wtxn,
                &composite_key(&request.record_id.to_be_bytes(), request.id.get()),
                &[],
            )
            .map_err(backend)?;
        wtxn.commit().map_err(backend)?;
        Ok(request)
    }

    fn get_request(&self, id: RequestId) -> Result<VerificationRequest, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(require_json(&self.requests_db, &rtxn, &id.to_be_bytes(), id)?)
    }

    fn requests_for_record(
        &self,
        record: RecordId,
    ) -> Result<Vec<VerificationRequest>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.requests_in(&rtxn, record)?)
    }

    fn update_request<T, E, F>(&self, id: RequestId, f: F) -> Result<(VerificationRequest, T), E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut VerificationRequest) -> Result<T, E>,
    {
        let key = id.to_be_bytes();
        let mut wtxn = self.env.write_txn().map_err(backend)?;
        let mut request: VerificationRequest =
            require_json(&self.requests_db, &wtxn, &key, id).map_err(backend)?;
        let out = f(&mut request)?;
        put_json(&self.requests_db, &mut wtxn, &key, &request).map_err(backend)?;
        wtxn.commit().map_err(backend)?;
        Ok((request, out))
    }
}
