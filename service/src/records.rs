//! Drafts, submission, workflow transitions, field verification and edit
//! suggestions.

use std::collections::BTreeSet;

use attest_evidence::EvidenceSet;
use attest_records::{EditSuggestion, ItemRef, Record, Submitter};
use attest_schema::{validate_submission, DisplayMode, RecordData};
use attest_store::{Sequence, Store};
use attest_types::{Actor, Clock, EditSuggestionId, RecordId, RecordTypeId, UserId};
use attest_workflow::checklist::displayed_items;
use attest_workflow::{Action, SuggestionDecision, SuggestionReport, TransitionReport};
use tracing::info;

use crate::service::refused;
use crate::{AttestService, ServiceError};

/// Guests fill in the public form; members the review form.
fn submission_mode(submitter: &Submitter) -> DisplayMode {
    match submitter {
        Submitter::Guest { .. } => DisplayMode::Guest,
        Submitter::User { .. } => DisplayMode::Review,
    }
}

fn submitter_label(submitter: &Submitter) -> UserId {
    match submitter {
        Submitter::User { id } => id.clone(),
        Submitter::Guest { name, .. } => UserId::new(format!("guest:{name}")),
    }
}

impl<S: Store, C: Clock> AttestService<S, C> {
    fn check_submitter(&self, submitter: &Submitter) -> Result<(), ServiceError> {
        if matches!(submitter, Submitter::Guest { .. }) && !self.allow_guest_submissions {
            return Err(ServiceError::GuestSubmissionsDisabled);
        }
        Ok(())
    }

    /// Create a draft, or replace the payload of an existing one.
    ///
    /// Drafts are not validated; only the submitter may change them.
    pub fn save_draft(
        &self,
        submitter: &Submitter,
        record_type: RecordTypeId,
        data: RecordData,
        existing: Option<RecordId>,
    ) -> Result<Record, ServiceError> {
        let who = submitter_label(submitter);
        self.check_submitter(submitter)
            .map_err(|e| refused("save_draft", &who, e))?;
        let record_type = self.store.get_record_type(record_type)?;
        let now = self.now();

        let record = match existing {
            None => {
                let id = RecordId::new(self.next_id(Sequence::Record)?);
                let record = Record::draft(id, &record_type, data, submitter.clone(), now)?;
                self.store.insert_record(&record, &EvidenceSet::new(id))?;
                info!(record = %id, record_type = %record_type.id, "created draft");
                record
            }
            Some(id) => {
                let (record, ()) = self
                    .store
                    .update_record::<(), ServiceError, _>(id, |record, _| {
                        if &record.submitter != submitter {
                            return Err(ServiceError::NotSubmitter);
                        }
                        if record.record_type_id != record_type.id {
                            return Err(ServiceError::Invalid(format!(
                                "{id} is not a {}",
                                record_type.slug
                            )));
                        }
                        Ok(record.replace_draft_data(data, now)?)
                    })
                    .map_err(|e| refused("save_draft", &who, e))?;
                info!(record = %id, revision = record.revision, "saved draft");
                record
            }
        };
        Ok(record)
    }

    /// Validate a draft and move it to `pending_review`.
    pub fn submit_draft(
        &self,
        submitter: &Submitter,
        record: RecordId,
    ) -> Result<(Record, TransitionReport), ServiceError> {
        let who = submitter_label(submitter);
        self.check_submitter(submitter)
            .map_err(|e| refused("submit_draft", &who, e))?;
        let record_type = self.record_type_of(record)?;
        let now = self.now();
        let (updated, report) = self
            .store
            .update_record::<TransitionReport, ServiceError, _>(record, |record, _| {
                if &record.submitter != submitter {
                    return Err(ServiceError::NotSubmitter);
                }
                validate_submission(&record_type, submission_mode(submitter), &record.data)?;
                Ok(self.workflow.submit(record, now)?)
            })
            .map_err(|e| refused("submit_draft", &who, e))?;
        info!(record = %record, from = %report.from, to = %report.to, "submitted draft");
        Ok((updated, report))
    }

    /// Create and submit a record in one step.
    pub fn submit_record(
        &self,
        submitter: &Submitter,
        record_type: RecordTypeId,
        data: RecordData,
    ) -> Result<Record, ServiceError> {
        let who = submitter_label(submitter);
        self.check_submitter(submitter)
            .map_err(|e| refused("submit_record", &who, e))?;
        let record_type = self.store.get_record_type(record_type)?;
        validate_submission(&record_type, submission_mode(submitter), &data)?;
        let now = self.now();
        let id = RecordId::new(self.next_id(Sequence::Record)?);
        let mut record = Record::draft(id, &record_type, data, submitter.clone(), now)?;
        self.workflow.submit(&mut record, now)?;
        self.store.insert_record(&record, &EvidenceSet::new(id))?;
        info!(record = %id, record_type = %record_type.id, "submitted record");
        Ok(record)
    }

    /// Apply a reviewer or validator action.
    ///
    /// Role, stage and two-person checks run against the record as re-read
    /// inside the write; on any error nothing changes.
    pub fn transition(
        &self,
        actor: &Actor,
        record: RecordId,
        action: Action,
    ) -> Result<(Record, TransitionReport), ServiceError> {
        let name = action.name();
        let record_type = self.record_type_of(record)?;
        let now = self.now();
        let (updated, report) = self
            .store
            .update_record::<TransitionReport, ServiceError, _>(record, |rec, evidence| {
                Ok(self
                    .workflow
                    .apply(&record_type, evidence, rec, actor, action, now)?)
            })
            .map_err(|e| refused(name, &actor.id, e))?;
        info!(
            record = %record,
            action = name,
            actor = %actor.id,
            from = %report.from,
            to = %report.to,
            advanced = report.advanced,
            verified = report.verified_fields.len(),
            "record transitioned"
        );
        Ok((updated, report))
    }

    /// Items a validator's checklist must cover for `record`.
    pub fn checklist_items(&self, record: RecordId) -> Result<BTreeSet<ItemRef>, ServiceError> {
        let rec = self.store.get_record(record)?;
        let record_type = self.store.get_record_type(rec.record_type_id)?;
        let evidence = self.store.get_evidence(record)?;
        Ok(displayed_items(&record_type, &rec, &evidence))
    }

    /// Mark one field verified. Returns whether the mark changed.
    pub fn verify_field(
        &self,
        actor: &Actor,
        record: RecordId,
        slug: &str,
    ) -> Result<bool, ServiceError> {
        let record_type = self.record_type_of(record)?;
        let now = self.now();
        let (_, changed) = self
            .store
            .update_record::<bool, ServiceError, _>(record, |rec, evidence| {
                Ok(self
                    .workflow
                    .verify_field(&record_type, evidence, rec, actor, slug, now)?)
            })
            .map_err(|e| refused("verify_field", &actor.id, e))?;
        if changed {
            info!(record = %record, slug, actor = %actor.id, "field verified");
        }
        Ok(changed)
    }

    pub fn unverify_field(
        &self,
        actor: &Actor,
        record: RecordId,
        slug: &str,
    ) -> Result<bool, ServiceError> {
        let record_type = self.record_type_of(record)?;
        let now = self.now();
        let (_, changed) = self
            .store
            .update_record::<bool, ServiceError, _>(record, |rec, _| {
                Ok(self
                    .workflow
                    .unverify_field(&record_type, rec, actor, slug, now)?)
            })
            .map_err(|e| refused("unverify_field", &actor.id, e))?;
        if changed {
            info!(record = %record, slug, actor = %actor.id, "field unverified");
        }
        Ok(changed)
    }

    /// Propose changes to a published record.
    pub fn suggest_edit(
        &self,
        actor: &Actor,
        record: RecordId,
        changes: RecordData,
        rationale: Option<String>,
    ) -> Result<EditSuggestion, ServiceError> {
        let result = (|| -> Result<EditSuggestion, ServiceError> {
            let rec = self.store.get_record(record)?;
            let record_type = self.store.get_record_type(rec.record_type_id)?;
            let id = EditSuggestionId::new(self.next_id(Sequence::Suggestion)?);
            let suggestion = self.workflow.suggest_edit(
                &record_type,
                &rec,
                actor,
                id,
                changes,
                rationale,
                self.now(),
            )?;
            self.store.insert_suggestion(&suggestion)?;
            Ok(suggestion)
        })()
        .map_err(|e| refused("suggest_edit", &actor.id, e))?;
        info!(
            suggestion = %result.id,
            record = %record,
            fields = result.changes.len(),
            "edit suggested"
        );
        Ok(result)
    }

    /// Approve or reject a suggestion. The second distinct approval applies
    /// the changes to the record in the same write.
    pub fn review_suggestion(
        &self,
        actor: &Actor,
        suggestion: EditSuggestionId,
        decision: SuggestionDecision,
    ) -> Result<(EditSuggestion, Record, SuggestionReport), ServiceError> {
        let current = self.store.get_suggestion(suggestion)?;
        let record_type = self.record_type_of(current.record_id)?;
        let now = self.now();
        let (updated, record, report) = self
            .store
            .update_suggestion::<SuggestionReport, ServiceError, _>(suggestion, |s, rec| {
                Ok(self
                    .workflow
                    .review_suggestion(&record_type, s, rec, actor, decision, now)?)
            })
            .map_err(|e| refused("review_suggestion", &actor.id, e))?;
        info!(
            suggestion = %suggestion,
            status = %report.status,
            applied = report.applied.len(),
            actor = %actor.id,
            "suggestion reviewed"
        );
        Ok((updated, record, report))
    }
}
