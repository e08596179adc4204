//! Item-level validation checklist.

use crate::error::WorkflowError;
use attest_evidence::EvidenceSet;
use attest_records::{ItemRef, Record};
use attest_schema::value::has_value;
use attest_schema::{DisplayMode, RecordType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Check {
    Checked,
    Unchecked { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistEntry {
    pub item: ItemRef,
    pub check: Check,
}

/// A validator's verdict on every displayed item of a record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationChecklist {
    #[serde(default)]
    pub entries: Vec<ChecklistEntry>,
}

impl ValidationChecklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every item in `items` checked.
    pub fn all_checked(items: impl IntoIterator<Item = ItemRef>) -> Self {
        let mut list = Self::new();
        for item in items {
            list.check(item);
        }
        list
    }

    pub fn check(&mut self, item: ItemRef) -> &mut Self {
        self.set(item, Check::Checked)
    }

    pub fn uncheck(&mut self, item: ItemRef, reason: impl Into<String>) -> &mut Self {
        self.set(
            item,
            Check::Unchecked {
                reason: reason.into(),
            },
        )
    }

    fn set(&mut self, item: ItemRef, check: Check) -> &mut Self {
        match self.entries.iter_mut().find(|e| e.item == item) {
            Some(entry) => entry.check = check,
            None => self.entries.push(ChecklistEntry { item, check }),
        }
        self
    }

    pub fn checked(&self) -> impl Iterator<Item = &ItemRef> {
        self.entries
            .iter()
            .filter(|e| e.check == Check::Checked)
            .map(|e| &e.item)
    }

    /// Unchecked items with their reasons.
    pub fn unchecked(&self) -> impl Iterator<Item = (&ItemRef, &str)> {
        self.entries.iter().filter_map(|e| match &e.check {
            Check::Unchecked { reason } => Some((&e.item, reason.as_str())),
            Check::Checked => None,
        })
    }

    /// Slugs of checked field items.
    pub fn checked_fields(&self) -> impl Iterator<Item = &str> {
        self.checked().filter_map(|item| match item {
            ItemRef::Field(slug) => Some(slug.as_str()),
            _ => None,
        })
    }

    /// Ensure the list covers exactly the record's displayed items and that
    /// every unchecked item carries a reason.
    ///
    /// Timeline entries and media are owned outside the core; any the caller
    /// lists are accepted.
    pub fn check_coverage(&self, required: &BTreeSet<ItemRef>) -> Result<(), WorkflowError> {
        let listed: BTreeSet<&ItemRef> = self.entries.iter().map(|e| &e.item).collect();
        for &item in &listed {
            let owned_by_record =
                matches!(item, ItemRef::Field(_) | ItemRef::Quote(_) | ItemRef::Source(_));
            if owned_by_record && !required.contains(item) {
                return Err(WorkflowError::UnknownItem(item.clone()));
            }
        }
        let missing: Vec<ItemRef> = required
            .iter()
            .filter(|item| !listed.contains(item))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(WorkflowError::MissingItems(missing));
        }
        let without_reason: Vec<ItemRef> = self
            .unchecked()
            .filter(|(_, reason)| reason.trim().is_empty())
            .map(|(item, _)| item.clone())
            .collect();
        if !without_reason.is_empty() {
            return Err(WorkflowError::MissingReasons(without_reason));
        }
        Ok(())
    }
}

/// Items a validator must check off: each field displayed in validation
/// mode that holds a value, every quote and every source.
pub fn displayed_items(
    record_type: &RecordType,
    record: &Record,
    evidence: &EvidenceSet,
) -> BTreeSet<ItemRef> {
    let fields = record_type
        .effective_fields(DisplayMode::Validation, &record.data)
        .into_iter()
        .filter(|f| has_value(&record.data, &f.slug))
        .map(|f| ItemRef::Field(f.slug.clone()));
    let quotes = evidence.quotes.iter().map(|q| ItemRef::Quote(q.id));
    let sources = evidence.sources.iter().map(|s| ItemRef::Source(s.id));
    fields.chain(quotes).chain(sources).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_types::QuoteId;

    fn required() -> BTreeSet<ItemRef> {
        [ItemRef::Field("name".into()), ItemRef::Quote(QuoteId::new(1))]
            .into_iter()
            .collect()
    }

    #[test]
    fn missing_items_are_reported() {
        let mut list = ValidationChecklist::new();
        list.check(ItemRef::Field("name".into()));
        let err = list.check_coverage(&required()).unwrap_err();
        assert!(matches!(err, WorkflowError::MissingItems(ref m) if m.len() == 1));
    }

    #[test]
    fn unchecked_item_needs_reason() {
        let mut list = ValidationChecklist::all_checked(required());
        list.uncheck(ItemRef::Quote(QuoteId::new(1)), "  ");
        assert!(matches!(
            list.check_coverage(&required()),
            Err(WorkflowError::MissingReasons(_))
        ));
        list.uncheck(ItemRef::Quote(QuoteId::new(1)), "wrong page");
        list.check_coverage(&required()).unwrap();
        assert_eq!(list.unchecked().count(), 1);
    }

    #[test]
    fn foreign_items_are_refused_but_media_is_accepted() {
        let mut list = ValidationChecklist::all_checked(required());
        list.check(ItemRef::Media(7));
        list.check_coverage(&required()).unwrap();
        list.check(ItemRef::Field("ghost".into()));
        assert!(matches!(
            list.check_coverage(&required()),
            Err(WorkflowError::UnknownItem(_))
        ));
    }

    #[test]
    fn later_verdict_replaces_earlier_one() {
        let mut list = ValidationChecklist::new();
        list.uncheck(ItemRef::Field("name".into()), "typo");
        list.check(ItemRef::Field("name".into()));
        assert_eq!(list.entries.len(), 1);
        assert_eq!(list.checked_fields().collect::<Vec<_>>(), vec!["name"]);
    }
}
