//! Audit request lifecycle: request, assign, complete, reject, unverify.

use crate::error::AuditError;
use crate::request::{
    AuditOutcome, AuditPriority, AuditScope, RequestRejection, RequestStatus, Revocation,
    VerificationRequest, VerificationResult,
};
use attest_evidence::EvidenceSet;
use attest_records::{ItemRef, Record, RecordStatus};
use attest_schema::value::has_value;
use attest_schema::RecordType;
use attest_types::{Actor, RequestId, ResultId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A verifier's finding for one item, before it is stamped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultInput {
    #[serde(default)]
    pub item: Option<ItemRef>,
    pub verified: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub caveats: Option<String>,
    #[serde(default)]
    pub issues: Vec<String>,
}

/// Engine for third-party audits.
pub struct AuditEngine;

impl AuditEngine {
    /// Items a data-scope audit may cover: fields holding a value, every
    /// quote and every source.
    pub fn eligible_items(
        &self,
        record_type: &RecordType,
        record: &Record,
        evidence: &EvidenceSet,
    ) -> Vec<ItemRef> {
        let fields = record_type
            .fields
            .iter()
            .filter(|f| has_value(&record.data, &f.slug))
            .map(|f| ItemRef::Field(f.slug.clone()));
        let quotes = evidence.quotes.iter().map(|q| ItemRef::Quote(q.id));
        let sources = evidence.sources.iter().map(|s| ItemRef::Source(s.id));
        fields.chain(quotes).chain(sources).collect()
    }

    /// Open an audit request on a published record.
    ///
    /// For data scope, `items` selects a subset of the eligible items; `None`
    /// selects all of them.
    #[allow(clippy::too_many_arguments)]
    pub fn request(
        &self,
        record_type: &RecordType,
        record: &Record,
        evidence: &EvidenceSet,
        existing: &[VerificationRequest],
        actor: &Actor,
        id: RequestId,
        scope: AuditScope,
        items: Option<Vec<ItemRef>>,
        priority: AuditPriority,
        now: Timestamp,
    ) -> Result<VerificationRequest, AuditError> {
        if actor.project_id != record.project_id {
            return Err(AuditError::WrongProject);
        }
        if !actor.role.can_request_audit() {
            return Err(not_permitted(actor, "request audits"));
        }
        if record.status != RecordStatus::Verified {
            return Err(AuditError::NotPublished(record.status.to_string()));
        }
        if let Some(open) = existing
            .iter()
            .find(|r| r.record_id == record.id && r.status.is_open())
        {
            return Err(AuditError::OpenRequest(open.id));
        }

        let items = match scope {
            AuditScope::Record => {
                if items.is_some_and(|i| !i.is_empty()) {
                    return Err(AuditError::ItemsOnRecordScope);
                }
                Vec::new()
            }
            AuditScope::Data => {
                let eligible = self.eligible_items(record_type, record, evidence);
                let selected = match items {
                    Some(items) if !items.is_empty() => {
                        if let Some(bad) = items.iter().find(|i| !eligible.contains(i)) {
                            return Err(AuditError::IneligibleItem(bad.clone()));
                        }
                        let unique: BTreeSet<ItemRef> = items.into_iter().collect();
                        unique.into_iter().collect()
                    }
                    _ => eligible,
                };
                if selected.is_empty() {
                    return Err(AuditError::NothingToAudit);
                }
                selected
            }
        };

        Ok(VerificationRequest {
            id,
            record_id: record.id,
            project_id: record.project_id,
            scope,
            items,
            priority,
            status: RequestStatus::Pending,
            requested_by: actor.id.clone(),
            requested_at: now,
            notes: None,
            assigned_to: None,
            assigned_at: None,
            completed_at: None,
            outcome: None,
            rejection: None,
            results: Vec::new(),
        })
    }

    /// Compare-and-swap assignment. Re-assigning to the same verifier is a
    /// no-op returning `false`.
    pub fn assign(
        &self,
        request: &mut VerificationRequest,
        record: &Record,
        verifier: &Actor,
        now: Timestamp,
    ) -> Result<bool, AuditError> {
        if verifier.project_id != request.project_id {
            return Err(AuditError::WrongProject);
        }
        if !verifier.role.can_audit() {
            return Err(not_permitted(verifier, "take audits"));
        }
        if !request.status.is_open() {
            return Err(wrong_status("assign", request.status));
        }
        match &request.assigned_to {
            Some(current) if *current == verifier.id => return Ok(false),
            Some(current) => return Err(AuditError::AlreadyAssigned(current.to_string())),
            None => {}
        }
        if record.participants().contains(&&verifier.id) {
            return Err(AuditError::NotIndependent);
        }
        request.assigned_to = Some(verifier.id.clone());
        request.assigned_at = Some(now);
        request.status = RequestStatus::InProgress;
        Ok(true)
    }

    /// Record the verifier's results and classify the outcome.
    pub fn complete(
        &self,
        request: &mut VerificationRequest,
        actor: &Actor,
        results: Vec<ResultInput>,
        now: Timestamp,
    ) -> Result<AuditOutcome, AuditError> {
        if request.status != RequestStatus::InProgress {
            return Err(wrong_status("complete", request.status));
        }
        check_assignee(request, actor, "complete this audit")?;
        check_coverage(request, &results)?;
        for input in &results {
            if !input.verified && input.issues.iter().all(|i| i.trim().is_empty()) {
                return Err(AuditError::IssuesRequired(describe(&input.item)));
            }
        }

        let stamped: Vec<VerificationResult> = results
            .into_iter()
            .enumerate()
            .map(|(i, input)| VerificationResult {
                id: ResultId::new(i as u64 + 1),
                item: input.item,
                verified: input.verified,
                notes: input.notes,
                caveats: input.caveats,
                issues: input
                    .issues
                    .into_iter()
                    .map(|i| i.trim().to_string())
                    .filter(|i| !i.is_empty())
                    .collect(),
                verifier: actor.id.clone(),
                verified_at: now,
                revocation: None,
            })
            .collect();
        let outcome = AuditOutcome::classify(&stamped);
        request.results = stamped;
        request.outcome = Some(outcome);
        request.status = RequestStatus::Completed;
        request.completed_at = Some(now);
        Ok(outcome)
    }

    /// The verifier judges the request unworkable. Terminal.
    pub fn reject(
        &self,
        request: &mut VerificationRequest,
        actor: &Actor,
        reason: &str,
        now: Timestamp,
    ) -> Result<(), AuditError> {
        if actor.project_id != request.project_id {
            return Err(AuditError::WrongProject);
        }
        if !actor.role.can_audit() {
            return Err(not_permitted(actor, "reject audits"));
        }
        if !request.status.is_open() {
            return Err(wrong_status("reject", request.status));
        }
        if request.assigned_to.is_some() {
            check_assignee(request, actor, "reject this audit")?;
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AuditError::ReasonRequired);
        }
        request.status = RequestStatus::Rejected;
        request.completed_at = Some(now);
        request.rejection = Some(RequestRejection {
            by: actor.id.clone(),
            at: now,
            reason: reason.to_string(),
        });
        Ok(())
    }

    /// Flag a regression on one data-level result. Returns `false` when the
    /// result was already unverified.
    pub fn unverify_item(
        &self,
        request: &mut VerificationRequest,
        actor: &Actor,
        result: ResultId,
        reason: &str,
        now: Timestamp,
    ) -> Result<bool, AuditError> {
        if actor.project_id != request.project_id {
            return Err(AuditError::WrongProject);
        }
        if !actor.role.can_unverify_audit() {
            return Err(not_permitted(actor, "unverify audit results"));
        }
        if request.status != RequestStatus::Completed {
            return Err(wrong_status("unverify results of", request.status));
        }
        if request.scope != AuditScope::Data {
            return Err(AuditError::NotDataLevel);
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AuditError::ReasonRequired);
        }
        let target = request
            .result_mut(result)
            .ok_or(AuditError::ResultNotFound(result))?;
        if !target.is_verified() {
            return Ok(false);
        }
        target.revocation = Some(Revocation {
            by: actor.id.clone(),
            at: now,
            reason: reason.to_string(),
        });
        request.outcome = Some(AuditOutcome::classify(&request.results));
        Ok(true)
    }
}

fn check_assignee(
    request: &VerificationRequest,
    actor: &Actor,
    action: &'static str,
) -> Result<(), AuditError> {
    if actor.project_id != request.project_id {
        return Err(AuditError::WrongProject);
    }
    let assigned = request.assigned_to.as_ref() == Some(&actor.id);
    if assigned || actor.role.is_admin() {
        Ok(())
    } else {
        Err(AuditError::NotAssignee(action))
    }
}

fn check_coverage(request: &VerificationRequest, results: &[ResultInput]) -> Result<(), AuditError> {
    match request.scope {
        AuditScope::Record => match results {
            [single] if single.item.is_none() => Ok(()),
            [] => Err(AuditError::MissingResult("the record".into())),
            [single] => Err(AuditError::UnexpectedResult(describe(&single.item))),
            [_, extra, ..] => Err(AuditError::UnexpectedResult(describe(&extra.item))),
        },
        AuditScope::Data => {
            let wanted: BTreeSet<&ItemRef> = request.items.iter().collect();
            let mut seen = BTreeSet::new();
            for input in results {
                let accepted = input
                    .item
                    .as_ref()
                    .is_some_and(|item| wanted.contains(&item) && seen.insert(item));
                if !accepted {
                    return Err(AuditError::UnexpectedResult(describe(&input.item)));
                }
            }
            match wanted.difference(&seen).next() {
                Some(missing) => Err(AuditError::MissingResult(missing.to_string())),
                None => Ok(()),
            }
        }
    }
}

fn describe(item: &Option<ItemRef>) -> String {
    item.as_ref()
        .map_or_else(|| "the record".to_string(), ToString::to_string)
}

fn not_permitted(actor: &Actor, action: &'static str) -> AuditError {
    AuditError::NotPermitted {
        role: actor.role.to_string(),
        action,
    }
}

fn wrong_status(action: &'static str, status: RequestStatus) -> AuditError {
    AuditError::WrongStatus {
        action,
        status: status.to_string(),
    }
}
