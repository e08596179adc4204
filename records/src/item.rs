//! References to individually checkable parts of a record.

use attest_types::{QuoteId, SourceId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One item a validator must check off.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ItemRef {
    Field(String),
    Quote(QuoteId),
    Source(SourceId),
    /// Timeline entries and media live outside the core; the caller
    /// supplies their ids.
    TimelineEntry(u64),
    Media(u64),
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::Field(slug) => write!(f, "field {slug}"),
            ItemRef::Quote(id) => write!(f, "quote {id}"),
            ItemRef::Source(id) => write!(f, "source {id}"),
            ItemRef::TimelineEntry(id) => write!(f, "timeline entry {id}"),
            ItemRef::Media(id) => write!(f, "media {id}"),
        }
    }
}
