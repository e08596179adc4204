//! Record lifecycle status and the transition graph.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Draft,
    PendingReview,
    FirstReview,
    SecondReview,
    PendingValidation,
    FirstValidation,
    /// Published.
    Verified,
    Rejected,
}

impl RecordStatus {
    pub const ALL: [RecordStatus; 8] = [
        RecordStatus::Draft,
        RecordStatus::PendingReview,
        RecordStatus::FirstReview,
        RecordStatus::SecondReview,
        RecordStatus::PendingValidation,
        RecordStatus::FirstValidation,
        RecordStatus::Verified,
        RecordStatus::Rejected,
    ];

    /// Statuses directly reachable from this one.
    pub fn successors(&self) -> &'static [RecordStatus] {
        use RecordStatus::*;
        match self {
            Draft => &[PendingReview],
            PendingReview => &[FirstReview, Rejected],
            FirstReview => &[SecondReview, Rejected],
            SecondReview => &[PendingValidation],
            PendingValidation => &[FirstValidation, FirstReview, Rejected],
            FirstValidation => &[Verified, FirstReview, Rejected],
            Verified | Rejected => &[],
        }
    }

    pub fn can_transition_to(&self, next: RecordStatus) -> bool {
        self.successors().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordStatus::Verified | RecordStatus::Rejected)
    }

    /// Analysts act on the record.
    pub fn is_review_stage(&self) -> bool {
        matches!(self, RecordStatus::PendingReview | RecordStatus::FirstReview)
    }

    /// Validators act on the record. `SecondReview` is included: it advances
    /// to `PendingValidation` automatically on the first validator action.
    pub fn is_validation_stage(&self) -> bool {
        matches!(
            self,
            RecordStatus::SecondReview
                | RecordStatus::PendingValidation
                | RecordStatus::FirstValidation
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Draft => "draft",
            RecordStatus::PendingReview => "pending_review",
            RecordStatus::FirstReview => "first_review",
            RecordStatus::SecondReview => "second_review",
            RecordStatus::PendingValidation => "pending_validation",
            RecordStatus::FirstValidation => "first_validation",
            RecordStatus::Verified => "verified",
            RecordStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_shortcut_to_publication() {
        for status in RecordStatus::ALL {
            if status != RecordStatus::FirstValidation {
                assert!(!status.can_transition_to(RecordStatus::Verified), "{status}");
            }
        }
    }

    #[test]
    fn terminal_states_have_no_successors() {
        assert!(RecordStatus::Verified.successors().is_empty());
        assert!(RecordStatus::Rejected.successors().is_empty());
    }

    #[test]
    fn every_status_is_reachable_from_draft() {
        let mut seen = vec![RecordStatus::Draft];
        let mut frontier = vec![RecordStatus::Draft];
        while let Some(s) = frontier.pop() {
            for next in s.successors() {
                if !seen.contains(next) {
                    seen.push(*next);
                    frontier.push(*next);
                }
            }
        }
        assert_eq!(seen.len(), RecordStatus::ALL.len());
    }
}
