//! Edit suggestion storage trait.

use crate::StoreError;
use attest_records::{EditSuggestion, Record};
use attest_types::{EditSuggestionId, RecordId};

pub trait SuggestionStore {
    fn insert_suggestion(&self, suggestion: &EditSuggestion) -> Result<(), StoreError>;

    fn get_suggestion(&self, id: EditSuggestionId) -> Result<EditSuggestion, StoreError>;

    fn suggestions_for_record(&self, record: RecordId) -> Result<Vec<EditSuggestion>, StoreError>;

    /// Re-read a suggestion and its record together and apply `f`. The
    /// record's revision is bumped only when `f` changed it.
    fn update_suggestion<T, E, F>(
        &self,
        id: EditSuggestionId,
        f: F,
    ) -> Result<(EditSuggestion, Record, T), E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut EditSuggestion, &mut Record) -> Result<T, E>;
}
