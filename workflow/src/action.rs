//! Actions a reviewer or validator can take on a record.

use crate::checklist::ValidationChecklist;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Review stages only.
    Approve {
        #[serde(default)]
        notes: Option<String>,
    },
    /// Validation stages only. At least one item must be unchecked.
    ReturnToReview { checklist: ValidationChecklist },
    /// Terminal. Reviewers reject during review, validators during validation.
    Reject { reason: String },
    /// Validation stages only. Every item must be checked.
    Validate {
        checklist: ValidationChecklist,
        #[serde(default)]
        notes: Option<String>,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Approve { .. } => "approve",
            Action::ReturnToReview { .. } => "return_to_review",
            Action::Reject { .. } => "reject",
            Action::Validate { .. } => "validate",
        }
    }
}

/// A reviewer's decision on an edit suggestion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum SuggestionDecision {
    Approve {
        #[serde(default)]
        notes: Option<String>,
    },
    Reject { reason: String },
}
