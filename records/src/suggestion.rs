//! Proposed edits against an already verified record.

use crate::record::{Rejection, ReviewStamp};
use attest_schema::RecordData;
use attest_types::{EditSuggestionId, ProjectId, RecordId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    Pending,
    FirstReview,
    Approved,
    Rejected,
}

impl SuggestionStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, SuggestionStatus::Pending | SuggestionStatus::FirstReview)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::FirstReview => "first_review",
            SuggestionStatus::Approved => "approved",
            SuggestionStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of proposed field values awaiting two reviewers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EditSuggestion {
    pub id: EditSuggestionId,
    pub record_id: RecordId,
    pub project_id: ProjectId,
    pub changes: RecordData,
    #[serde(default)]
    pub rationale: Option<String>,
    pub suggested_by: UserId,
    pub created_at: Timestamp,
    pub status: SuggestionStatus,
    #[serde(default)]
    pub first_review: Option<ReviewStamp>,
    #[serde(default)]
    pub second_review: Option<ReviewStamp>,
    #[serde(default)]
    pub rejection: Option<Rejection>,
}

impl EditSuggestion {
    pub fn new(
        id: EditSuggestionId,
        record_id: RecordId,
        project_id: ProjectId,
        changes: RecordData,
        suggested_by: UserId,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            record_id,
            project_id,
            changes,
            rationale: None,
            suggested_by,
            created_at: now,
            status: SuggestionStatus::Pending,
            first_review: None,
            second_review: None,
            rejection: None,
        }
    }

    pub fn first_reviewer(&self) -> Option<&UserId> {
        self.first_review.as_ref().map(|s| &s.by)
    }
}
