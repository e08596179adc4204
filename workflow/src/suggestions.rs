//! Edit suggestions against published records.
//!
//! `pending -> first_review -> approved | rejected`, with the same
//! two-distinct-reviewer rule as the main flow. Approval writes the proposed
//! values into the record; each changed field loses its verified mark.

use crate::action::SuggestionDecision;
use crate::engine::{check_project, require, WorkflowEngine};
use crate::error::WorkflowError;
use attest_records::{
    EditSuggestion, Record, RecordError, RecordStatus, Rejection, ReviewStamp, SuggestionStatus,
};
use attest_schema::validate::check_value;
use attest_schema::{is_empty_value, RecordData, RecordType};
use attest_types::{Actor, EditSuggestionId, Timestamp};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuggestionReport {
    pub status: SuggestionStatus,
    /// Fields whose value changed on the record.
    pub applied: Vec<String>,
}

impl WorkflowEngine {
    /// Propose changes to a verified record.
    #[allow(clippy::too_many_arguments)]
    pub fn suggest_edit(
        &self,
        record_type: &RecordType,
        record: &Record,
        actor: &Actor,
        id: EditSuggestionId,
        changes: RecordData,
        rationale: Option<String>,
        now: Timestamp,
    ) -> Result<EditSuggestion, WorkflowError> {
        check_project(record, actor)?;
        require(actor.role.can_edit_evidence(), actor, "suggest edits")?;
        if record.status != RecordStatus::Verified {
            return Err(WorkflowError::WrongStage {
                action: "suggest an edit to",
                status: record.status.to_string(),
            });
        }
        if changes.is_empty() {
            return Err(WorkflowError::EmptySuggestion);
        }
        for (slug, value) in &changes {
            let field = record_type
                .field(slug)
                .ok_or_else(|| RecordError::UnknownField(slug.clone()))?;
            if !is_empty_value(value) {
                check_value(field, value).map_err(|message| WorkflowError::InvalidValue {
                    slug: slug.clone(),
                    message,
                })?;
            }
        }
        let mut suggestion = EditSuggestion::new(
            id,
            record.id,
            record.project_id,
            changes,
            actor.id.clone(),
            now,
        );
        suggestion.rationale = rationale;
        Ok(suggestion)
    }

    /// Record one reviewer's decision. The second distinct approval applies
    /// the changes to `record`.
    pub fn review_suggestion(
        &self,
        record_type: &RecordType,
        suggestion: &mut EditSuggestion,
        record: &mut Record,
        actor: &Actor,
        decision: SuggestionDecision,
        now: Timestamp,
    ) -> Result<SuggestionReport, WorkflowError> {
        check_project(record, actor)?;
        require(actor.role.can_review(), actor, "review suggestions")?;
        if !suggestion.status.is_open() {
            return Err(WorkflowError::SuggestionClosed(suggestion.status.to_string()));
        }
        if self.policy.forbid_self_review && suggestion.suggested_by == actor.id {
            return Err(WorkflowError::SelfReview);
        }

        let mut next = suggestion.clone();
        let mut applied = Vec::new();
        match decision {
            SuggestionDecision::Reject { reason } => {
                let reason = reason.trim().to_string();
                if reason.is_empty() {
                    return Err(WorkflowError::ReasonRequired);
                }
                next.status = SuggestionStatus::Rejected;
                next.rejection = Some(Rejection {
                    by: actor.id.clone(),
                    at: now,
                    reason,
                });
            }
            SuggestionDecision::Approve { notes } => {
                let stamp = ReviewStamp {
                    by: actor.id.clone(),
                    at: now,
                    notes,
                };
                if next.status == SuggestionStatus::Pending {
                    next.status = SuggestionStatus::FirstReview;
                    next.first_review = Some(stamp);
                } else {
                    if next.first_reviewer() == Some(&actor.id) {
                        return Err(WorkflowError::SameReviewer);
                    }
                    let mut edited = record.clone();
                    for (slug, value) in &next.changes {
                        if edited.set_value(record_type, slug, value.clone(), now)? {
                            applied.push(slug.clone());
                        }
                    }
                    next.status = SuggestionStatus::Approved;
                    next.second_review = Some(stamp);
                    *record = edited;
                }
            }
        }
        *suggestion = next;
        Ok(SuggestionReport {
            status: suggestion.status,
            applied,
        })
    }
}
