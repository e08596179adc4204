//! The derived verification level.

use crate::request::{RequestStatus, VerificationRequest};
use attest_records::RecordStatus;
use serde::{Deserialize, Serialize};

/// How independently a record's claims have been checked. Never stored;
/// always recomputed from the record status and its audit history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum VerificationLevel {
    /// Not through two-person review and validation.
    Unverified = 0,
    /// Published after the ordinary two-person checks.
    SelfVerified = 1,
    /// An audit exists but has not (or no longer) fully passed.
    AuditReady = 2,
    /// A completed third-party audit fully passed.
    Independent = 3,
}

impl From<VerificationLevel> for u8 {
    fn from(level: VerificationLevel) -> u8 {
        level as u8
    }
}

impl TryFrom<u8> for VerificationLevel {
    type Error = String;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(VerificationLevel::Unverified),
            1 => Ok(VerificationLevel::SelfVerified),
            2 => Ok(VerificationLevel::AuditReady),
            3 => Ok(VerificationLevel::Independent),
            other => Err(format!("verification level out of range: {other}")),
        }
    }
}

/// Project `status` and `requests` onto a level.
///
/// Rejected (unworkable) requests are ignored.
pub fn verification_level(status: RecordStatus, requests: &[VerificationRequest]) -> VerificationLevel {
    if status != RecordStatus::Verified {
        return VerificationLevel::Unverified;
    }
    let live = requests
        .iter()
        .filter(|r| r.status != RequestStatus::Rejected);
    let mut level = VerificationLevel::SelfVerified;
    for request in live {
        if request.fully_passed() {
            return VerificationLevel::Independent;
        }
        level = VerificationLevel::AuditReady;
    }
    level
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{AuditOutcome, AuditPriority, AuditScope, VerificationResult};
    use attest_records::ItemRef;
    use attest_types::{ProjectId, RecordId, RequestId, ResultId, Timestamp, UserId};

    fn request(status: RequestStatus, verified: &[bool]) -> VerificationRequest {
        let results = verified
            .iter()
            .enumerate()
            .map(|(i, &ok)| VerificationResult {
                id: ResultId::new(i as u64 + 1),
                item: Some(ItemRef::Field(format!("f{i}"))),
                verified: ok,
                notes: None,
                caveats: None,
                issues: if ok { vec![] } else { vec!["wrong".into()] },
                verifier: UserId::from("vera"),
                verified_at: Timestamp::new(5),
                revocation: None,
            })
            .collect::<Vec<_>>();
        VerificationRequest {
            id: RequestId::new(1),
            record_id: RecordId::new(1),
            project_id: ProjectId::new(1),
            scope: AuditScope::Data,
            items: vec![],
            priority: AuditPriority::Normal,
            status,
            requested_by: UserId::from("own"),
            requested_at: Timestamp::new(1),
            notes: None,
            assigned_to: None,
            assigned_at: None,
            completed_at: None,
            outcome: (status == RequestStatus::Completed).then(|| AuditOutcome::classify(&results)),
            rejection: None,
            results,
        }
    }

    #[test]
    fn unpublished_records_are_level_zero() {
        let passed = request(RequestStatus::Completed, &[true]);
        assert_eq!(
            verification_level(RecordStatus::FirstValidation, &[passed]),
            VerificationLevel::Unverified
        );
    }

    #[test]
    fn levels_follow_audit_history() {
        use RequestStatus::*;
        let level = |reqs: &[VerificationRequest]| verification_level(RecordStatus::Verified, reqs);
        assert_eq!(level(&[]), VerificationLevel::SelfVerified);
        assert_eq!(level(&[request(Rejected, &[])]), VerificationLevel::SelfVerified);
        assert_eq!(level(&[request(Pending, &[])]), VerificationLevel::AuditReady);
        assert_eq!(
            level(&[request(Completed, &[true, false])]),
            VerificationLevel::AuditReady
        );
        assert_eq!(
            level(&[request(Completed, &[true, false]), request(Completed, &[true, true])]),
            VerificationLevel::Independent
        );
    }

    #[test]
    fn level_serializes_as_number() {
        let json = serde_json::to_string(&VerificationLevel::AuditReady).unwrap();
        assert_eq!(json, "2");
    }
}
