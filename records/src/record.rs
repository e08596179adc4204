//! The record aggregate.

use crate::error::RecordError;
use crate::item::ItemRef;
use crate::status::RecordStatus;
use attest_schema::value::has_value;
use attest_schema::{RecordData, RecordType};
use attest_types::{ProjectId, RecordId, RecordTypeId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Who submitted the record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Submitter {
    User { id: UserId },
    Guest { name: String, email: Option<String> },
}

impl Submitter {
    pub fn user(id: impl Into<UserId>) -> Self {
        Submitter::User { id: id.into() }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Submitter::User { id } => Some(id),
            Submitter::Guest { .. } => None,
        }
    }

    pub(crate) fn check(&self) -> Result<(), RecordError> {
        match self {
            Submitter::Guest { name, .. } if name.trim().is_empty() => {
                Err(RecordError::AnonymousGuest)
            }
            _ => Ok(()),
        }
    }
}

/// Verification mark on a single field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldVerification {
    pub verified: bool,
    pub by: UserId,
    pub at: Timestamp,
}

/// One reviewer's or validator's sign-off.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewStamp {
    pub by: UserId,
    pub at: Timestamp,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub by: UserId,
    pub at: Timestamp,
    pub reason: String,
}

/// An item a validator left unchecked, sent back to review.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedIssue {
    pub item: ItemRef,
    pub reason: String,
    pub flagged_by: UserId,
    pub flagged_at: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Submit,
    Approve,
    /// Applied by the system, not by a person.
    Advance,
    ReturnToReview,
    Reject,
    Validate,
}

/// One entry of a record's status history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: RecordStatus,
    pub to: RecordStatus,
    pub kind: TransitionKind,
    /// `None` for system transitions.
    pub actor: Option<UserId>,
    pub at: Timestamp,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A documented incident undergoing verification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub project_id: ProjectId,
    pub record_type_id: RecordTypeId,
    pub data: RecordData,
    pub status: RecordStatus,
    #[serde(default)]
    pub verified_fields: BTreeMap<String, FieldVerification>,
    pub submitter: Submitter,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub submitted_at: Option<Timestamp>,
    #[serde(default)]
    pub first_review: Option<ReviewStamp>,
    #[serde(default)]
    pub second_review: Option<ReviewStamp>,
    #[serde(default)]
    pub first_validation: Option<ReviewStamp>,
    #[serde(default)]
    pub second_validation: Option<ReviewStamp>,
    #[serde(default)]
    pub rejection: Option<Rejection>,
    /// Issues raised by the last return-to-review.
    #[serde(default)]
    pub flagged_issues: Vec<FlaggedIssue>,
    #[serde(default)]
    pub history: Vec<Transition>,
    /// Bumped on every write.
    #[serde(default)]
    pub revision: u64,
}

impl Record {
    /// A new record in `Draft`.
    pub fn draft(
        id: RecordId,
        record_type: &RecordType,
        data: RecordData,
        submitter: Submitter,
        now: Timestamp,
    ) -> Result<Self, RecordError> {
        submitter.check()?;
        Ok(Self {
            id,
            project_id: record_type.project_id,
            record_type_id: record_type.id,
            data,
            status: RecordStatus::Draft,
            verified_fields: BTreeMap::new(),
            submitter,
            created_at: now,
            updated_at: now,
            submitted_at: None,
            first_review: None,
            second_review: None,
            first_validation: None,
            second_validation: None,
            rejection: None,
            flagged_issues: Vec::new(),
            history: Vec::new(),
            revision: 0,
        })
    }

    pub fn first_verified_by(&self) -> Option<&UserId> {
        self.first_review.as_ref().map(|s| &s.by)
    }

    pub fn second_verified_by(&self) -> Option<&UserId> {
        self.second_review.as_ref().map(|s| &s.by)
    }

    pub fn first_validated_by(&self) -> Option<&UserId> {
        self.first_validation.as_ref().map(|s| &s.by)
    }

    pub fn second_validated_by(&self) -> Option<&UserId> {
        self.second_validation.as_ref().map(|s| &s.by)
    }

    /// Everyone who has signed off on this record so far, plus the submitter.
    pub fn participants(&self) -> Vec<&UserId> {
        [
            self.submitter.user_id(),
            self.first_verified_by(),
            self.second_verified_by(),
            self.first_validated_by(),
            self.second_validated_by(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Move to `to` if the transition graph allows it, appending history.
    pub fn apply_transition(
        &mut self,
        to: RecordStatus,
        kind: TransitionKind,
        actor: Option<&UserId>,
        now: Timestamp,
        notes: Option<String>,
    ) -> Result<(), RecordError> {
        if !self.status.can_transition_to(to) {
            return Err(RecordError::IllegalTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.history.push(Transition {
            from: self.status,
            to,
            kind,
            actor: actor.cloned(),
            at: now,
            notes,
        });
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    /// Set a field value. A changed value loses its verification mark.
    pub fn set_value(
        &mut self,
        record_type: &RecordType,
        slug: &str,
        value: Value,
        now: Timestamp,
    ) -> Result<bool, RecordError> {
        if record_type.field(slug).is_none() {
            return Err(RecordError::UnknownField(slug.to_string()));
        }
        if self.data.get(slug) == Some(&value) {
            return Ok(false);
        }
        self.data.insert(slug.to_string(), value);
        self.verified_fields.remove(slug);
        self.updated_at = now;
        Ok(true)
    }

    /// Replace the whole payload of a draft.
    pub fn replace_draft_data(&mut self, data: RecordData, now: Timestamp) -> Result<(), RecordError> {
        if self.status != RecordStatus::Draft {
            return Err(RecordError::NotEditable(self.status.to_string()));
        }
        self.data = data;
        self.updated_at = now;
        Ok(())
    }

    pub fn is_field_verified(&self, slug: &str) -> bool {
        self.verified_fields.get(slug).is_some_and(|v| v.verified)
    }

    pub fn mark_verified(&mut self, slug: &str, by: &UserId, now: Timestamp) {
        self.set_mark(slug, true, by, now);
    }

    pub fn mark_unverified(&mut self, slug: &str, by: &UserId, now: Timestamp) {
        self.set_mark(slug, false, by, now);
    }

    fn set_mark(&mut self, slug: &str, verified: bool, by: &UserId, now: Timestamp) {
        self.verified_fields.insert(
            slug.to_string(),
            FieldVerification {
                verified,
                by: by.clone(),
                at: now,
            },
        );
        self.updated_at = now;
    }

    /// Fields that block publication: gated, non-empty, not verified.
    pub fn unverified_gated_fields<'a>(&self, record_type: &'a RecordType) -> Vec<&'a str> {
        record_type
            .fields
            .iter()
            .filter(|f| f.require_verified_for_publish)
            .filter(|f| has_value(&self.data, &f.slug))
            .filter(|f| !self.is_field_verified(&f.slug))
            .map(|f| f.slug.as_str())
            .collect()
    }

    /// Data keys with no field definition any more.
    pub fn orphaned_slugs<'a>(&'a self, record_type: &RecordType) -> Vec<&'a str> {
        record_type.orphaned_slugs(&self.data)
    }
}
