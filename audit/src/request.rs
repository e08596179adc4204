//! Audit requests and their results.

use attest_records::ItemRef;
use attest_types::{ProjectId, RecordId, RequestId, ResultId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditScope {
    /// One holistic result for the whole record.
    Record,
    /// One result per selected field, quote or source.
    Data,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    InProgress,
    Completed,
    /// Judged unworkable by the verifier. Distinct from a failed audit.
    Rejected,
}

impl RequestStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Passed,
    /// Some issues; the record stays published with caveats.
    Partial,
    /// Surfaced for a human decision. Never unpublishes automatically.
    Failed,
}

impl AuditOutcome {
    pub fn classify(results: &[VerificationResult]) -> Self {
        if results.iter().all(VerificationResult::passes) {
            AuditOutcome::Passed
        } else if results.iter().any(VerificationResult::is_verified) {
            AuditOutcome::Partial
        } else {
            AuditOutcome::Failed
        }
    }
}

/// A later "unverify" of a result, flagging a regression.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revocation {
    pub by: UserId,
    pub at: Timestamp,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Unique within its request.
    pub id: ResultId,
    /// `None` for the single result of a record-scope request.
    pub item: Option<ItemRef>,
    pub verified: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub caveats: Option<String>,
    #[serde(default)]
    pub issues: Vec<String>,
    pub verifier: UserId,
    pub verified_at: Timestamp,
    #[serde(default)]
    pub revocation: Option<Revocation>,
}

impl VerificationResult {
    pub fn is_verified(&self) -> bool {
        self.verified && self.revocation.is_none()
    }

    /// Verified with nothing outstanding.
    pub fn passes(&self) -> bool {
        self.is_verified() && self.issues.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRejection {
    pub by: UserId,
    pub at: Timestamp,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub id: RequestId,
    pub record_id: RecordId,
    pub project_id: ProjectId,
    pub scope: AuditScope,
    /// Empty for record scope.
    #[serde(default)]
    pub items: Vec<ItemRef>,
    #[serde(default)]
    pub priority: AuditPriority,
    pub status: RequestStatus,
    pub requested_by: UserId,
    pub requested_at: Timestamp,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<UserId>,
    #[serde(default)]
    pub assigned_at: Option<Timestamp>,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
    #[serde(default)]
    pub outcome: Option<AuditOutcome>,
    #[serde(default)]
    pub rejection: Option<RequestRejection>,
    #[serde(default)]
    pub results: Vec<VerificationResult>,
}

impl VerificationRequest {
    /// Completed with every result passing.
    pub fn fully_passed(&self) -> bool {
        self.status == RequestStatus::Completed
            && !self.results.is_empty()
            && self.results.iter().all(VerificationResult::passes)
    }

    pub fn result_mut(&mut self, id: ResultId) -> Option<&mut VerificationResult> {
        self.results.iter_mut().find(|r| r.id == id)
    }
}
