//! The service object and the checks shared by every operation.

use attest_audit::AuditEngine;
use attest_quota::{QuotaGovernor, TierTable};
use attest_records::{Record, RecordStatus};
use attest_schema::{RecordType, SchemaRegistry};
use attest_store::{Sequence, Store};
use attest_types::{Actor, Clock, ErrorKind, ProjectId, RecordId, RoleProvider, Timestamp, UserId};
use attest_workflow::WorkflowEngine;
use tracing::{debug, warn};

use crate::{ServiceConfig, ServiceError};

/// Request-scoped API over a storage backend `S` and a time source `C`.
pub struct AttestService<S, C> {
    pub(crate) store: S,
    pub(crate) clock: C,
    pub(crate) registry: SchemaRegistry,
    pub(crate) workflow: WorkflowEngine,
    pub(crate) audit: AuditEngine,
    pub(crate) governor: QuotaGovernor,
    pub(crate) tiers: TierTable,
    pub(crate) allow_guest_submissions: bool,
}

impl<S: Store, C: Clock> AttestService<S, C> {
    pub fn new(store: S, clock: C, config: &ServiceConfig) -> Result<Self, ServiceError> {
        config.validate()?;
        Ok(Self {
            store,
            clock,
            registry: SchemaRegistry,
            workflow: WorkflowEngine::new(config.workflow_policy()),
            audit: AuditEngine,
            governor: QuotaGovernor,
            tiers: config.quota.clone(),
            allow_guest_submissions: config.workflow.allow_guest_submissions,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Look up `user`'s role in `project` and build the actor for a call.
    pub fn resolve_actor(
        &self,
        roles: &impl RoleProvider,
        user: &UserId,
        project: ProjectId,
    ) -> Result<Actor, ServiceError> {
        Actor::resolve(roles, user, project).map_err(|e| {
            warn!(user = %user, %project, error = %e, "actor resolution refused");
            ServiceError::from(e)
        })
    }

    pub fn record(&self, id: RecordId) -> Result<Record, ServiceError> {
        debug!(record = %id, "read record");
        Ok(self.store.get_record(id)?)
    }

    /// Work queue: records of `project` currently in `status`.
    pub fn records_in_status(
        &self,
        project: ProjectId,
        status: RecordStatus,
    ) -> Result<Vec<Record>, ServiceError> {
        let records = self.store.records_in_status(project, status)?;
        debug!(%project, %status, count = records.len(), "listed work queue");
        Ok(records)
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub(crate) fn next_id(&self, sequence: Sequence) -> Result<u64, ServiceError> {
        Ok(self.store.next_id(sequence)?)
    }

    pub(crate) fn record_type_of(&self, record: RecordId) -> Result<RecordType, ServiceError> {
        let record = self.store.get_record(record)?;
        Ok(self.store.get_record_type(record.record_type_id)?)
    }
}

pub(crate) fn same_project(actor: &Actor, project: ProjectId) -> Result<(), ServiceError> {
    if actor.project_id == project {
        Ok(())
    } else {
        Err(ServiceError::WrongProject)
    }
}

pub(crate) fn require(allowed: bool, actor: &Actor, action: &'static str) -> Result<(), ServiceError> {
    if allowed {
        Ok(())
    } else {
        Err(ServiceError::NotPermitted {
            role: actor.role.to_string(),
            action,
        })
    }
}

/// Log refusals worth an operator's attention and pass the error on.
pub(crate) fn refused(operation: &'static str, actor: &UserId, err: ServiceError) -> ServiceError {
    match err.kind() {
        ErrorKind::Permission
        | ErrorKind::Concurrency
        | ErrorKind::QuotaExceeded
        | ErrorKind::InsufficientCredits => {
            warn!(operation, actor = %actor, kind = err.kind().as_str(), error = %err, "refused")
        }
        ErrorKind::Storage => {
            tracing::error!(operation, actor = %actor, error = %err, "storage failure")
        }
        _ => debug!(operation, actor = %actor, error = %err, "rejected"),
    }
    err
}
