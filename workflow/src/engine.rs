//! The record state machine.

use crate::action::Action;
use crate::checklist::{displayed_items, ValidationChecklist};
use crate::error::WorkflowError;
use attest_evidence::EvidenceSet;
use attest_records::{
    FlaggedIssue, Record, RecordError, RecordStatus, Rejection, ReviewStamp, TransitionKind,
};
use attest_schema::{FieldDefinition, RecordType};
use attest_types::{Actor, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Workflow switches read from configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowPolicy {
    /// Submitters may not approve their own records or suggestions.
    #[serde(default)]
    pub forbid_self_review: bool,
}

/// What a successful transition did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionReport {
    pub from: RecordStatus,
    pub to: RecordStatus,
    /// The automatic `second_review -> pending_validation` hop was applied.
    pub advanced: bool,
    /// Fields newly marked verified by this action.
    pub verified_fields: Vec<String>,
}

impl TransitionReport {
    fn new(from: RecordStatus) -> Self {
        Self {
            from,
            to: from,
            advanced: false,
            verified_fields: Vec::new(),
        }
    }
}

/// Applies workflow actions to records.
///
/// Every method either fully applies or leaves the record untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkflowEngine {
    pub policy: WorkflowPolicy,
}

impl WorkflowEngine {
    pub fn new(policy: WorkflowPolicy) -> Self {
        Self { policy }
    }

    /// `draft -> pending_review`.
    pub fn submit(&self, record: &mut Record, now: Timestamp) -> Result<TransitionReport, WorkflowError> {
        let mut report = TransitionReport::new(record.status);
        if record.status != RecordStatus::Draft {
            return Err(RecordError::NotEditable(record.status.to_string()).into());
        }
        let by = record.submitter.user_id().cloned();
        record.apply_transition(
            RecordStatus::PendingReview,
            TransitionKind::Submit,
            by.as_ref(),
            now,
            None,
        )?;
        record.submitted_at = Some(now);
        report.to = record.status;
        Ok(report)
    }

    /// Apply a reviewer or validator action.
    pub fn apply(
        &self,
        record_type: &RecordType,
        evidence: &EvidenceSet,
        record: &mut Record,
        actor: &Actor,
        action: Action,
        now: Timestamp,
    ) -> Result<TransitionReport, WorkflowError> {
        check_project(record, actor)?;
        let mut next = record.clone();
        let mut report = TransitionReport::new(next.status);
        match action {
            Action::Approve { notes } => self.approve(&mut next, actor, notes, now)?,
            Action::Reject { reason } => self.reject(&mut next, actor, reason, now, &mut report)?,
            Action::ReturnToReview { checklist } => {
                self.enter_validation(&mut next, actor, "return to review", now, &mut report)?;
                return_to_review(record_type, evidence, &mut next, actor, &checklist, now)?;
            }
            Action::Validate { checklist, notes } => {
                self.enter_validation(&mut next, actor, "validate", now, &mut report)?;
                validate(record_type, evidence, &mut next, actor, &checklist, notes, now, &mut report)?;
            }
        }
        report.to = next.status;
        *record = next;
        Ok(report)
    }

    fn approve(
        &self,
        record: &mut Record,
        actor: &Actor,
        notes: Option<String>,
        now: Timestamp,
    ) -> Result<(), WorkflowError> {
        require(actor.role.can_review(), actor, "approve")?;
        if self.policy.forbid_self_review && record.submitter.user_id() == Some(&actor.id) {
            return Err(WorkflowError::SelfReview);
        }
        let stamp = ReviewStamp {
            by: actor.id.clone(),
            at: now,
            notes: notes.clone(),
        };
        match record.status {
            RecordStatus::PendingReview => {
                record.apply_transition(
                    RecordStatus::FirstReview,
                    TransitionKind::Approve,
                    Some(&actor.id),
                    now,
                    notes,
                )?;
                record.first_review = Some(stamp);
            }
            RecordStatus::FirstReview => {
                if record.first_verified_by() == Some(&actor.id) {
                    return Err(WorkflowError::SameReviewer);
                }
                record.apply_transition(
                    RecordStatus::SecondReview,
                    TransitionKind::Approve,
                    Some(&actor.id),
                    now,
                    notes,
                )?;
                record.second_review = Some(stamp);
            }
            status => {
                return Err(WorkflowError::WrongStage {
                    action: "approve",
                    status: status.to_string(),
                })
            }
        }
        Ok(())
    }

    fn reject(
        &self,
        record: &mut Record,
        actor: &Actor,
        reason: String,
        now: Timestamp,
        report: &mut TransitionReport,
    ) -> Result<(), WorkflowError> {
        if record.status.is_review_stage() {
            require(actor.role.can_review(), actor, "reject")?;
        } else {
            self.enter_validation(record, actor, "reject", now, report)?;
        }
        let reason = reason.trim().to_string();
        if reason.is_empty() {
            return Err(WorkflowError::ReasonRequired);
        }
        record.apply_transition(
            RecordStatus::Rejected,
            TransitionKind::Reject,
            Some(&actor.id),
            now,
            Some(reason.clone()),
        )?;
        record.rejection = Some(Rejection {
            by: actor.id.clone(),
            at: now,
            reason,
        });
        Ok(())
    }

    /// Role and stage check shared by validator actions. Applies the
    /// automatic hop out of `second_review` when needed.
    fn enter_validation(
        &self,
        record: &mut Record,
        actor: &Actor,
        action: &'static str,
        now: Timestamp,
        report: &mut TransitionReport,
    ) -> Result<(), WorkflowError> {
        if !record.status.is_validation_stage() {
            return Err(WorkflowError::WrongStage {
                action,
                status: record.status.to_string(),
            });
        }
        require(actor.role.can_validate(), actor, action)?;
        if record.status == RecordStatus::SecondReview {
            record.apply_transition(
                RecordStatus::PendingValidation,
                TransitionKind::Advance,
                None,
                now,
                None,
            )?;
            report.advanced = true;
        }
        Ok(())
    }

    /// Mark one field verified. The field's quote requirements must be met.
    pub fn verify_field(
        &self,
        record_type: &RecordType,
        evidence: &EvidenceSet,
        record: &mut Record,
        actor: &Actor,
        slug: &str,
        now: Timestamp,
    ) -> Result<bool, WorkflowError> {
        check_project(record, actor)?;
        require(actor.role.can_verify_fields(), actor, "verify fields")?;
        check_not_rejected(record, "verify fields of")?;
        let field = record_type
            .field(slug)
            .ok_or_else(|| RecordError::UnknownField(slug.to_string()))?;
        ensure_supported(field, evidence)?;
        if record.is_field_verified(slug) {
            return Ok(false);
        }
        record.mark_verified(slug, &actor.id, now);
        Ok(true)
    }

    /// Clear a field's verified mark.
    pub fn unverify_field(
        &self,
        record_type: &RecordType,
        record: &mut Record,
        actor: &Actor,
        slug: &str,
        now: Timestamp,
    ) -> Result<bool, WorkflowError> {
        check_project(record, actor)?;
        require(actor.role.can_verify_fields(), actor, "unverify fields")?;
        check_not_rejected(record, "unverify fields of")?;
        if record_type.field(slug).is_none() {
            return Err(RecordError::UnknownField(slug.to_string()).into());
        }
        if !record.is_field_verified(slug) {
            return Ok(false);
        }
        record.mark_unverified(slug, &actor.id, now);
        Ok(true)
    }

    /// Revoke verification of every field whose quote support has gone.
    /// Returns the slugs that lost their mark.
    pub fn revoke_unsupported(
        &self,
        record_type: &RecordType,
        evidence: &EvidenceSet,
        record: &mut Record,
        by: &UserId,
        now: Timestamp,
    ) -> Vec<String> {
        let revoked: Vec<String> = record_type
            .fields
            .iter()
            .filter(|f| record.is_field_verified(&f.slug))
            .filter(|f| ensure_supported(f, evidence).is_err())
            .map(|f| f.slug.clone())
            .collect();
        for slug in &revoked {
            record.mark_unverified(slug, by, now);
        }
        revoked
    }
}

fn return_to_review(
    record_type: &RecordType,
    evidence: &EvidenceSet,
    record: &mut Record,
    actor: &Actor,
    checklist: &ValidationChecklist,
    now: Timestamp,
) -> Result<(), WorkflowError> {
    checklist.check_coverage(&displayed_items(record_type, record, evidence))?;
    let flagged: Vec<FlaggedIssue> = checklist
        .unchecked()
        .map(|(item, reason)| FlaggedIssue {
            item: item.clone(),
            reason: reason.trim().to_string(),
            flagged_by: actor.id.clone(),
            flagged_at: now,
        })
        .collect();
    if flagged.is_empty() {
        return Err(WorkflowError::NothingFlagged);
    }
    let notes = format!("{} issue(s) flagged", flagged.len());
    record.apply_transition(
        RecordStatus::FirstReview,
        TransitionKind::ReturnToReview,
        Some(&actor.id),
        now,
        Some(notes),
    )?;
    record.flagged_issues = flagged;
    record.second_review = None;
    record.first_validation = None;
    record.second_validation = None;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn validate(
    record_type: &RecordType,
    evidence: &EvidenceSet,
    record: &mut Record,
    actor: &Actor,
    checklist: &ValidationChecklist,
    notes: Option<String>,
    now: Timestamp,
    report: &mut TransitionReport,
) -> Result<(), WorkflowError> {
    checklist.check_coverage(&displayed_items(record_type, record, evidence))?;
    let unchecked: Vec<_> = checklist.unchecked().map(|(item, _)| item.clone()).collect();
    if !unchecked.is_empty() {
        return Err(WorkflowError::UncheckedItems(unchecked));
    }
    let second = match record.status {
        RecordStatus::PendingValidation => false,
        RecordStatus::FirstValidation => {
            if record.first_validated_by() == Some(&actor.id) {
                return Err(WorkflowError::SameValidator);
            }
            true
        }
        status => {
            return Err(WorkflowError::WrongStage {
                action: "validate",
                status: status.to_string(),
            })
        }
    };

    for slug in checklist.checked_fields() {
        let field = record_type
            .field(slug)
            .ok_or_else(|| RecordError::UnknownField(slug.to_string()))?;
        ensure_supported(field, evidence)?;
        if !record.is_field_verified(slug) {
            record.mark_verified(slug, &actor.id, now);
            report.verified_fields.push(slug.to_string());
        }
    }

    let stamp = ReviewStamp {
        by: actor.id.clone(),
        at: now,
        notes: notes.clone(),
    };
    if second {
        let blocking = record.unverified_gated_fields(record_type);
        if !blocking.is_empty() {
            return Err(WorkflowError::UnverifiedFields(
                blocking.into_iter().map(str::to_string).collect(),
            ));
        }
        record.apply_transition(
            RecordStatus::Verified,
            TransitionKind::Validate,
            Some(&actor.id),
            now,
            notes,
        )?;
        record.second_validation = Some(stamp);
        record.flagged_issues.clear();
    } else {
        record.apply_transition(
            RecordStatus::FirstValidation,
            TransitionKind::Validate,
            Some(&actor.id),
            now,
            notes,
        )?;
        record.first_validation = Some(stamp);
    }
    Ok(())
}

/// Whether `field`'s quote requirements are met by `evidence`.
pub fn ensure_supported(field: &FieldDefinition, evidence: &EvidenceSet) -> Result<(), WorkflowError> {
    if !field.requires_quote {
        return Ok(());
    }
    if !evidence.field_support(&field.slug, false) {
        return Err(WorkflowError::QuoteRequired(field.slug.clone()));
    }
    if field.requires_source_for_quote && !evidence.field_support(&field.slug, true) {
        return Err(WorkflowError::SourceRequired(field.slug.clone()));
    }
    Ok(())
}

pub(crate) fn check_project(record: &Record, actor: &Actor) -> Result<(), WorkflowError> {
    if record.project_id == actor.project_id {
        Ok(())
    } else {
        Err(WorkflowError::WrongProject)
    }
}

pub(crate) fn require(allowed: bool, actor: &Actor, action: &'static str) -> Result<(), WorkflowError> {
    if allowed {
        Ok(())
    } else {
        Err(WorkflowError::NotPermitted {
            role: actor.role.to_string(),
            action,
        })
    }
}

fn check_not_rejected(record: &Record, action: &'static str) -> Result<(), WorkflowError> {
    if record.status == RecordStatus::Rejected {
        return Err(WorkflowError::WrongStage {
            action,
            status: record.status.to_string(),
        });
    }
    Ok(())
}
