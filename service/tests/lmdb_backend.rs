//! The same workflows against the LMDB backend.

mod common;

use attest_audit::{AuditPriority, AuditScope, ResultInput, VerificationLevel};
use attest_nullables::NullClock;
use attest_records::{RecordStatus, SuggestionStatus};
use attest_service::{AttestService, ServiceConfig};
use attest_store_lmdb::LmdbStore;
use attest_types::ErrorKind;
use attest_workflow::{Action, SuggestionDecision};
use serde_json::json;

use common::*;

fn lmdb_world(dir: &tempfile::TempDir) -> World<LmdbStore, NullClock> {
    let store = LmdbStore::open(dir.path(), 32 * 1024 * 1024).unwrap();
    let service = AttestService::new(store, NullClock::new(START), &ServiceConfig::default()).unwrap();
    World::build(service)
}

#[test]
fn publish_audit_and_edit_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let world = lmdb_world(&dir);
    let record = world.publish();
    assert_eq!(
        world
            .service
            .records_in_status(world.project, RecordStatus::Verified)
            .unwrap()
            .len(),
        1
    );
    assert!(world
        .service
        .records_in_status(world.project, RecordStatus::PendingReview)
        .unwrap()
        .is_empty());

    let request = world
        .service
        .request_audit(&world.actor("olga"), record.id, AuditScope::Record, None, AuditPriority::Normal)
        .unwrap();
    let vera = world.actor("vera");
    assert!(world.service.assign_audit(&vera, request.id).unwrap());
    assert_eq!(
        world
            .service
            .assign_audit(&world.actor("vince"), request.id)
            .unwrap_err()
            .kind(),
        ErrorKind::Concurrency
    );
    world
        .service
        .complete_audit(
            &vera,
            request.id,
            vec![ResultInput {
                item: None,
                verified: true,
                notes: None,
                caveats: None,
                issues: Vec::new(),
            }],
        )
        .unwrap();
    assert_eq!(
        world.service.verification_level(record.id).unwrap(),
        VerificationLevel::Independent
    );

    let suggestion = world
        .service
        .suggest_edit(&world.actor("ana"), record.id, data(json!({"victims": 5})), None)
        .unwrap();
    let approve = || SuggestionDecision::Approve { notes: None };
    world
        .service
        .review_suggestion(&world.actor("ben"), suggestion.id, approve())
        .unwrap();
    let (done, edited, _) = world
        .service
        .review_suggestion(&world.actor("eddie"), suggestion.id, approve())
        .unwrap();
    assert_eq!(done.status, SuggestionStatus::Approved);
    assert_eq!(world.service.record(record.id).unwrap(), edited);
    assert_eq!(edited.data["victims"], json!(5));
}

#[test]
fn failed_transition_leaves_the_stored_record_alone() {
    let dir = tempfile::tempdir().unwrap();
    let world = lmdb_world(&dir);
    let record = world.submit();
    world.approve("ana", record.id);
    let before = world.service.record(record.id).unwrap();
    let err = world
        .service
        .transition(&world.actor("ana"), record.id, Action::Approve { notes: None })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    assert_eq!(world.service.record(record.id).unwrap(), before);
}

#[test]
fn ledger_survives_reopening() {
    let dir = tempfile::tempdir().unwrap();
    let project = {
        let world = lmdb_world(&dir);
        world
            .service
            .grant_credits(&world.actor("olga"), 10, "initial")
            .unwrap();
        world
            .service
            .grant_credits(&world.actor("olga"), 5, "second")
            .unwrap();
        world.project
    };
    let store = LmdbStore::open(dir.path(), 32 * 1024 * 1024).unwrap();
    let service = AttestService::new(store, NullClock::new(START), &ServiceConfig::default()).unwrap();
    let summary = service.reconcile_ledger(project).unwrap();
    assert_eq!(summary.balance, 15);
    assert_eq!(summary.entries, 2);
}
