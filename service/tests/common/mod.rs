#![allow(dead_code)]

use attest_nullables::{NullClock, NullStore, StaticRoles};
use attest_records::{Record, RecordStatus, Submitter};
use attest_schema::{FieldDefinition, FieldKind, NumberConfig, RecordData, RecordType, TextConfig};
use attest_service::{AttestService, NewQuote, NewSource, ServiceConfig};
use attest_store::Store;
use attest_types::{Actor, Clock, ProjectId, QuoteId, RecordId, Role, SourceId, UserId};
use attest_workflow::{Action, ValidationChecklist};
use serde_json::{json, Value};

pub const START: u64 = 1_700_000_000;

pub fn data(value: Value) -> RecordData {
    serde_json::from_value(value).unwrap()
}

pub fn incident_fields() -> Vec<FieldDefinition> {
    vec![
        FieldDefinition::new("title", "Title", FieldKind::Text(TextConfig::default())).required(),
        FieldDefinition::new("location", "Location", FieldKind::Text(TextConfig::default()))
            .with_quote_requirement(false),
        FieldDefinition::new("victims", "Victims", FieldKind::Number(NumberConfig::default())),
    ]
}

pub fn incident() -> RecordData {
    data(json!({"title": "Flood", "location": "Riverside", "victims": 3}))
}

/// Role assignments used by every scenario.
pub fn roles(project: ProjectId) -> StaticRoles {
    StaticRoles::new()
        .with("olga", project, Role::Owner)
        .with("ana", project, Role::Analyst)
        .with("ben", project, Role::Analyst)
        .with("eddie", project, Role::Editor)
        .with("val", project, Role::Validator)
        .with("vic", project, Role::Validator)
        .with("vera", project, Role::Verifier)
        .with("vince", project, Role::Verifier)
        .with("viewer", project, Role::Viewer)
}

pub struct World<S: Store, C: Clock> {
    pub service: AttestService<S, C>,
    pub roles: StaticRoles,
    pub project: ProjectId,
    pub record_type: RecordType,
}

pub type NullWorld = World<NullStore, NullClock>;

pub fn null_world() -> NullWorld {
    null_world_with(ServiceConfig::default())
}

pub fn null_world_with(config: ServiceConfig) -> NullWorld {
    let service = AttestService::new(NullStore::new(), NullClock::new(START), &config).unwrap();
    World::build(service)
}

impl<S: Store, C: Clock> World<S, C> {
    pub fn build(service: AttestService<S, C>) -> Self {
        let project = service
            .create_project(&UserId::from("olga"), "Incident Watch", "incident-watch")
            .unwrap();
        let roles = roles(project.id);
        let owner = Actor::resolve(&roles, &UserId::from("olga"), project.id).unwrap();
        let record_type = service
            .create_record_type(&owner, "Incident", "incident", incident_fields())
            .unwrap();
        Self {
            service,
            roles,
            project: project.id,
            record_type,
        }
    }

    pub fn actor(&self, user: &str) -> Actor {
        self.service
            .resolve_actor(&self.roles, &UserId::from(user), self.project)
            .unwrap()
    }

    pub fn submit(&self) -> Record {
        self.service
            .submit_record(&Submitter::user("sam"), self.record_type.id, incident())
            .unwrap()
    }

    /// Attach a sourced quote supporting `location`.
    pub fn support_location(&self, record: RecordId) -> (SourceId, QuoteId) {
        let ana = self.actor("ana");
        let source = self
            .service
            .attach_source(
                &ana,
                record,
                NewSource {
                    url: "https://news.example/flood".into(),
                    title: "Evening News".into(),
                    ..NewSource::default()
                },
            )
            .unwrap();
        let quote = self
            .service
            .attach_quote(
                &ana,
                record,
                NewQuote {
                    text: "The river broke its banks at Riverside.".into(),
                    source: Some(source.id),
                    fields: vec!["location".into()],
                    ..NewQuote::default()
                },
            )
            .unwrap();
        (source.id, quote.id)
    }

    pub fn approve(&self, user: &str, record: RecordId) -> Record {
        self.service
            .transition(&self.actor(user), record, Action::Approve { notes: None })
            .unwrap()
            .0
    }

    pub fn full_checklist(&self, record: RecordId) -> ValidationChecklist {
        ValidationChecklist::all_checked(self.service.checklist_items(record).unwrap())
    }

    pub fn validate(&self, user: &str, record: RecordId) -> Record {
        let checklist = self.full_checklist(record);
        self.service
            .transition(
                &self.actor(user),
                record,
                Action::Validate {
                    checklist,
                    notes: None,
                },
            )
            .unwrap()
            .0
    }

    /// Submit, support, review twice and validate twice.
    pub fn publish(&self) -> Record {
        let record = self.submit();
        self.support_location(record.id);
        self.approve("ana", record.id);
        self.approve("ben", record.id);
        self.validate("val", record.id);
        let published = self.validate("vic", record.id);
        assert_eq!(published.status, RecordStatus::Verified);
        published
    }
}
