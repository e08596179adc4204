//! LMDB implementation of RecordStore.
//!
//! Records and their evidence sets live in two databases under the same
//! key and are always written in one transaction. `records_by_status_db`
//! is a work-queue index, rewritten whenever an update moves the status.

use attest_evidence::EvidenceSet;
use attest_records::{Record, RecordStatus};
use attest_store::{RecordStore, StoreError};
use attest_types::{ProjectId, RecordId};
use heed::RwTxn;
use tracing::debug;

use crate::environment::{composite_key, get_json, prefix_keys, put_json, require_json, trailing_id};
use crate::error::backend;
use crate::{LmdbError, LmdbStore};

/// `project(8) ++ status ++ 0x00`.
fn status_prefix(project: ProjectId, status: RecordStatus) -> Vec<u8> {
    let mut key = project.to_be_bytes().to_vec();
    key.extend_from_slice(status.as_str().as_bytes());
    key.push(0);
    key
}

fn status_key(record: &Record) -> Vec<u8> {
    composite_key(&status_prefix(record.project_id, record.status), record.id.get())
}

impl LmdbStore {
    /// Write a record, optionally its evidence, and keep the status index in
    /// step. `previous` is the status currently indexed, if any.
    pub(crate) fn write_record(
        &self,
        txn: &mut RwTxn<'_>,
        record: &Record,
        evidence: Option<&EvidenceSet>,
        previous: Option<RecordStatus>,
    ) -> Result<(), LmdbError> {
        let key = record.id.to_be_bytes();
        put_json(&self.records_db, txn, &key, record)?;
        if let Some(evidence) = evidence {
            put_json(&self.evidence_db, txn, &key, evidence)?;
        }
        if previous != Some(record.status) {
            if let Some(old) = previous {
                let old_key = composite_key(&status_prefix(record.project_id, old), record.id.get());
                self.records_by_status_db.delete(txn, &old_key)?;
            }
            self.records_by_status_db.put(txn, &status_key(record), &[])?;
        }
        Ok(())
    }
}

impl RecordStore for LmdbStore {
    fn insert_record(&self, record: &Record, evidence: &EvidenceSet) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .records_db
            .get(&wtxn, &record.id.to_be_bytes())
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(record.id.to_string()));
        }
        self.write_record(&mut wtxn, record, Some(evidence), None)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_record(&self, id: RecordId) -> Result<Record, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(require_json(&self.records_db, &rtxn, &id.to_be_bytes(), id)?)
    }

    fn get_evidence(&self, id: RecordId) -> Result<EvidenceSet, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(require_json(
            &self.evidence_db,
            &rtxn,
            &id.to_be_bytes(),
            format_args!("evidence of {id}"),
        )?)
    }

    fn records_in_status(
        &self,
        project: ProjectId,
        status: RecordStatus,
    ) -> Result<Vec<Record>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let keys = prefix_keys(&self.records_by_status_db, &rtxn, &status_prefix(project, status))?;
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            let id = trailing_id(&key)?;
            match get_json::<Record>(&self.records_db, &rtxn, &id.to_be_bytes())? {
                Some(record) if record.status == status => records.push(record),
                _ => {
                    return Err(LmdbError::Corruption(format!(
                        "status index lists rec_{id} as {status}"
                    ))
                    .into())
                }
            }
        }
        debug!(%project, %status, count = records.len(), "listed work queue");
        Ok(records)
    }

    fn update_record<T, E, F>(&self, id: RecordId, f: F) -> Result<(Record, T), E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Record, &mut EvidenceSet) -> Result<T, E>,
    {
        let key = id.to_be_bytes();
        let mut wtxn = self.env.write_txn().map_err(backend)?;
        let mut record: Record = require_json(&self.records_db, &wtxn, &key, id).map_err(backend)?;
        let mut evidence = get_json(&self.evidence_db, &wtxn, &key)
            .map_err(backend)?
            .unwrap_or_else(|| EvidenceSet::new(id));
        let previous = record.status;

        let out = f(&mut record, &mut evidence)?;

        record.revision += 1;
        self.write_record(&mut wtxn, &record, Some(&evidence), Some(previous))
            .map_err(backend)?;
        wtxn.commit().map_err(backend)?;
        Ok((record, out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::open_temp;
    use attest_evidence::Quote;
    use attest_records::Submitter;
    use attest_schema::RecordType;
    use attest_types::{QuoteId, RecordTypeId, Timestamp, UserId};

    fn draft(id: u64) -> Record {
        let rt = RecordType::new(RecordTypeId::new(1), ProjectId::new(1), "Death", "death");
        Record::draft(
            RecordId::new(id),
            &rt,
            Default::default(),
            Submitter::user("sub"),
            Timestamp::new(1),
        )
        .unwrap()
    }

    #[test]
    fn status_index_follows_updates() {
        let (_dir, store) = open_temp();
        for id in 1..=3 {
            let r = draft(id);
            store.insert_record(&r, &EvidenceSet::new(r.id)).unwrap();
        }
        store
            .update_record::<_, StoreError, _>(RecordId::new(2), |r, _| {
                r.status = RecordStatus::PendingReview;
                Ok(())
            })
            .unwrap();

        let drafts = store
            .records_in_status(ProjectId::new(1), RecordStatus::Draft)
            .unwrap();
        let ids: Vec<u64> = drafts.iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![1, 3]);
        let pending = store
            .records_in_status(ProjectId::new(1), RecordStatus::PendingReview)
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].revision, 1);
    }

    #[test]
    fn record_and_evidence_commit_together_or_not_at_all() {
        let (_dir, store) = open_temp();
        let r = draft(1);
        store.insert_record(&r, &EvidenceSet::new(r.id)).unwrap();

        let failed: Result<(Record, ()), StoreError> = store.update_record(r.id, |rec, ev| {
            ev.attach_quote(Quote::new(
                QuoteId::new(1),
                rec.id,
                "text",
                UserId::from("ana"),
                Timestamp::new(2),
            ))
            .map_err(|e| StoreError::Backend(e.to_string()))?;
            Err(StoreError::Backend("abort".into()))
        });
        assert!(failed.is_err());
        assert!(store.get_evidence(r.id).unwrap().quotes.is_empty());
        assert_eq!(store.get_record(r.id).unwrap().revision, 0);

        store
            .update_record::<_, StoreError, _>(r.id, |rec, ev| {
                ev.attach_quote(Quote::new(
                    QuoteId::new(1),
                    rec.id,
                    "text",
                    UserId::from("ana"),
                    Timestamp::new(2),
                ))
                .map_err(|e| StoreError::Backend(e.to_string()))
            })
            .unwrap();
        assert_eq!(store.get_evidence(r.id).unwrap().quotes.len(), 1);
        assert!(matches!(
            store.get_record(RecordId::new(9)),
            Err(StoreError::NotFound(_))
        ));
    }
}
