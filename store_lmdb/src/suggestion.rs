//! LMDB implementation of SuggestionStore.

use attest_records::{EditSuggestion, Record};
use attest_store::{StoreError, SuggestionStore};
use attest_types::{EditSuggestionId, RecordId};

use crate::environment::{composite_key, prefix_keys, put_json, require_json, trailing_id};
use crate::error::backend;
use crate::{LmdbError, LmdbStore};

impl SuggestionStore for LmdbStore {
    fn insert_suggestion(&self, suggestion: &EditSuggestion) -> Result<(), StoreError> {
        let key = suggestion.id.to_be_bytes();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .suggestions_db
            .get(&wtxn, &key)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(suggestion.id.to_string()));
        }
        put_json(&self.suggestions_db, &mut wtxn, &key, suggestion)?;
        self.suggestions_by_record_db
            .put(
                &mut wtxn,
                &composite_key(&suggestion.record_id.to_be_bytes(), suggestion.id.get()),
                &[],
            )
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_suggestion(&self, id: EditSuggestionId) -> Result<EditSuggestion, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(require_json(&self.suggestions_db, &rtxn, &id.to_be_bytes(), id)?)
    }

    fn suggestions_for_record(&self, record: RecordId) -> Result<Vec<EditSuggestion>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let keys = prefix_keys(&self.suggestions_by_record_db, &rtxn, &record.to_be_bytes())?;
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let id = EditSuggestionId::new(trailing_id(&key)?);
            out.push(require_json(&self.suggestions_db, &rtxn, &id.to_be_bytes(), id)?);
        }
        Ok(out)
    }

    fn update_suggestion<T, E, F>(
        &self,
        id: EditSuggestionId,
        f: F,
    ) -> Result<(EditSuggestion, Record, T), E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut EditSuggestion, &mut Record) -> Result<T, E>,
    {
        let key = id.to_be_bytes();
        let mut wtxn = self.env.write_txn().map_err(backend)?;
        let mut suggestion: EditSuggestion =
            require_json(&self.suggestions_db, &wtxn, &key, id).map_err(backend)?;
        let record_key = suggestion.record_id.to_be_bytes();
        let before: Record =
            require_json(&self.records_db, &wtxn, &record_key, suggestion.record_id)
                .map_err(backend)?;
        let mut record = before.clone();

        let out = f(&mut suggestion, &mut record)?;

        if record != before {
            record.revision += 1;
            self.write_record(&mut wtxn, &record, None, Some(before.status))
                .map_err(backend)?;
        }
        put_json(&self.suggestions_db, &mut wtxn, &key, &suggestion).map_err(backend)?;
        wtxn.commit().map_err(backend)?;
        Ok((suggestion, record, out))
    }
}
