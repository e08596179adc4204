//! Quoted evidentiary text.

use attest_types::{QuoteId, RecordId, SourceId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A passage quoted from a source, optionally supporting specific fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub record_id: RecordId,
    pub text: String,
    pub source_id: Option<SourceId>,
    /// Page number, timestamp or paragraph inside the source.
    #[serde(default)]
    pub locator: Option<String>,
    /// Slugs of the fields this quote supports.
    #[serde(default)]
    pub linked_fields: BTreeSet<String>,
    pub added_by: UserId,
    pub added_at: Timestamp,
}

impl Quote {
    pub fn new(
        id: QuoteId,
        record_id: RecordId,
        text: impl Into<String>,
        added_by: UserId,
        added_at: Timestamp,
    ) -> Self {
        Self {
            id,
            record_id,
            text: text.into(),
            source_id: None,
            locator: None,
            linked_fields: BTreeSet::new(),
            added_by,
            added_at,
        }
    }

    pub fn with_source(mut self, source: SourceId) -> Self {
        self.source_id = Some(source);
        self
    }

    pub fn supports(&self, slug: &str) -> bool {
        self.linked_fields.contains(slug)
    }
}
