//! Third-party audits of published records.

use attest_audit::{
    verification_level, AuditOutcome, AuditPriority, AuditScope, ResultInput, VerificationLevel,
    VerificationRequest,
};
use attest_records::ItemRef;
use attest_store::{Sequence, Store};
use attest_types::{Actor, Clock, RecordId, RequestId, ResultId};
use tracing::{debug, info};

use crate::service::refused;
use crate::{AttestService, ServiceError};

impl<S: Store, C: Clock> AttestService<S, C> {
    /// Open an audit request on a verified record. `items` narrows a data
    /// scope audit; `None` covers every eligible item.
    pub fn request_audit(
        &self,
        actor: &Actor,
        record: RecordId,
        scope: AuditScope,
        items: Option<Vec<ItemRef>>,
        priority: AuditPriority,
    ) -> Result<VerificationRequest, ServiceError> {
        let result = (|| -> Result<VerificationRequest, ServiceError> {
            let rec = self.store.get_record(record)?;
            let record_type = self.store.get_record_type(rec.record_type_id)?;
            let evidence = self.store.get_evidence(record)?;
            let id = RequestId::new(self.next_id(Sequence::Request)?);
            let now = self.now();
            self.store
                .create_request::<ServiceError, _>(record, |existing| {
                    Ok(self.audit.request(
                        &record_type,
                        &rec,
                        &evidence,
                        existing,
                        actor,
                        id,
                        scope,
                        items,
                        priority,
                        now,
                    )?)
                })
        })()
        .map_err(|e| refused("request_audit", &actor.id, e))?;
        info!(
            request = %result.id,
            record = %record,
            scope = ?result.scope,
            items = result.items.len(),
            "audit requested"
        );
        Ok(result)
    }

    /// Claim a request. Claiming again as the same verifier is a no-op
    /// returning `false`; another verifier's claim fails with a concurrency
    /// error.
    pub fn assign_audit(&self, verifier: &Actor, request: RequestId) -> Result<bool, ServiceError> {
        let current = self.store.get_request(request)?;
        let record = self.store.get_record(current.record_id)?;
        let now = self.now();
        let (_, claimed) = self
            .store
            .update_request::<bool, ServiceError, _>(request, |req| {
                Ok(self.audit.assign(req, &record, verifier, now)?)
            })
            .map_err(|e| refused("assign_audit", &verifier.id, e))?;
        if claimed {
            info!(request = %request, verifier = %verifier.id, "audit assigned");
        }
        Ok(claimed)
    }

    /// Record the verifier's results. Returns the completed request and the
    /// record's verification level after the write.
    pub fn complete_audit(
        &self,
        actor: &Actor,
        request: RequestId,
        results: Vec<ResultInput>,
    ) -> Result<(VerificationRequest, VerificationLevel), ServiceError> {
        let now = self.now();
        let (updated, outcome) = self
            .store
            .update_request::<AuditOutcome, ServiceError, _>(request, |req| {
                Ok(self.audit.complete(req, actor, results, now)?)
            })
            .map_err(|e| refused("complete_audit", &actor.id, e))?;
        let level = self.verification_level(updated.record_id)?;
        info!(
            request = %request,
            outcome = ?outcome,
            level = u8::from(level),
            "audit completed"
        );
        Ok((updated, level))
    }

    /// The verifier judges the request unworkable.
    pub fn reject_audit(
        &self,
        actor: &Actor,
        request: RequestId,
        reason: &str,
    ) -> Result<VerificationRequest, ServiceError> {
        let now = self.now();
        let (updated, ()) = self
            .store
            .update_request::<(), ServiceError, _>(request, |req| {
                Ok(self.audit.reject(req, actor, reason, now)?)
            })
            .map_err(|e| refused("reject_audit", &actor.id, e))?;
        info!(request = %request, "audit request rejected");
        Ok(updated)
    }

    /// Flag a regression on one result of a completed audit.
    pub fn unverify_audit_item(
        &self,
        actor: &Actor,
        request: RequestId,
        result: ResultId,
        reason: &str,
    ) -> Result<bool, ServiceError> {
        let now = self.now();
        let (_, changed) = self
            .store
            .update_request::<bool, ServiceError, _>(request, |req| {
                Ok(self.audit.unverify_item(req, actor, result, reason, now)?)
            })
            .map_err(|e| refused("unverify_audit_item", &actor.id, e))?;
        if changed {
            info!(request = %request, result = %result, "audit result revoked");
        }
        Ok(changed)
    }

    pub fn audit_requests(&self, record: RecordId) -> Result<Vec<VerificationRequest>, ServiceError> {
        Ok(self.store.requests_for_record(record)?)
    }

    /// Derived from the record status and its audit requests on every call.
    pub fn verification_level(&self, record: RecordId) -> Result<VerificationLevel, ServiceError> {
        let rec = self.store.get_record(record)?;
        let requests = self.store.requests_for_record(record)?;
        let level = verification_level(rec.status, &requests);
        debug!(record = %record, level = u8::from(level), "verification level");
        Ok(level)
    }
}
