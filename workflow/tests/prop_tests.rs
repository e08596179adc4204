use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;

use attest_evidence::EvidenceSet;
use attest_records::{ItemRef, Record, RecordStatus, Submitter};
use attest_schema::{FieldDefinition, FieldKind, RecordData, RecordType, TextConfig};
use attest_types::{Actor, ProjectId, RecordId, RecordTypeId, Role, Timestamp};
use attest_workflow::{Action, ValidationChecklist, WorkflowEngine};

fn record_type() -> RecordType {
    let mut rt = RecordType::new(RecordTypeId::new(1), ProjectId::new(1), "Incident", "incident");
    rt.fields.push(FieldDefinition::new(
        "summary",
        "Summary",
        FieldKind::Text(TextConfig::default()),
    ));
    rt
}

fn submitted() -> Record {
    let data: RecordData = [("summary".to_string(), json!("Detained at 02:00"))]
        .into_iter()
        .collect();
    let mut record = Record::draft(
        RecordId::new(1),
        &record_type(),
        data,
        Submitter::user("sub"),
        Timestamp::new(1),
    )
    .unwrap();
    WorkflowEngine::default()
        .submit(&mut record, Timestamp::new(1))
        .unwrap();
    record
}

fn actor() -> impl Strategy<Value = Actor> {
    (
        prop::sample::select(vec!["ana", "ben", "cy"]),
        prop::sample::select(vec![Role::Analyst, Role::Validator, Role::Admin, Role::Viewer]),
    )
        .prop_map(|(id, role)| Actor::new(id, role, ProjectId::new(1)))
}

fn action() -> impl Strategy<Value = Action> {
    let field = ItemRef::Field("summary".into());
    let checked = ValidationChecklist::all_checked([field.clone()]);
    let mut flagged = ValidationChecklist::new();
    flagged.uncheck(field, "date is wrong");
    prop_oneof![
        4 => Just(Action::Approve { notes: None }),
        3 => Just(Action::Validate { checklist: checked, notes: None }),
        1 => Just(Action::ReturnToReview { checklist: flagged }),
        1 => prop::sample::select(vec!["", "duplicate"])
            .prop_map(|r| Action::Reject { reason: r.to_string() }),
    ]
}

proptest! {
    /// Whatever sequence of actions is attempted, the record only moves
    /// along edges of the transition graph and the two signers of each
    /// stage stay distinct.
    #[test]
    fn status_follows_graph(steps in prop::collection::vec((actor(), action()), 0..30)) {
        let engine = WorkflowEngine::default();
        let rt = record_type();
        let evidence = EvidenceSet::new(RecordId::new(1));
        let mut record = submitted();
        let mut seen = BTreeSet::from([record.status]);

        for (i, (who, act)) in steps.into_iter().enumerate() {
            let before = record.clone();
            match engine.apply(&rt, &evidence, &mut record, &who, act, Timestamp::new(2 + i as u64)) {
                Ok(_) => {
                    let new_entries = &record.history[before.history.len()..];
                    prop_assert!(!new_entries.is_empty());
                    for t in new_entries {
                        prop_assert!(t.from.can_transition_to(t.to), "{} -> {}", t.from, t.to);
                    }
                }
                Err(_) => prop_assert_eq!(&record, &before),
            }
            seen.insert(record.status);

            if let (Some(a), Some(b)) = (record.first_verified_by(), record.second_verified_by()) {
                prop_assert_ne!(a, b);
            }
            if let (Some(a), Some(b)) = (record.first_validated_by(), record.second_validated_by()) {
                prop_assert_ne!(a, b);
            }
        }
        prop_assert!(!seen.contains(&RecordStatus::Draft));
    }
}
