//! AI quota checks, usage metering and the project credit ledger.

use attest_quota::{reconcile, CreditTransaction, LedgerSummary, QuotaDecision};
use attest_store::{CommittedUsage, Store, UsageKey};
use attest_types::{Actor, Clock, ProjectId, UserId};
use tracing::{error, info, warn};

use crate::service::{refused, require};
use crate::{AttestService, ServiceError};

/// Usage keys are NUL-delimited, so neither part may contain NUL.
fn check_usage_key(user: &UserId, operation: &str) -> Result<(), ServiceError> {
    if operation.trim().is_empty() {
        return Err(ServiceError::Invalid("operation name must be non-empty".into()));
    }
    if operation.contains('\0') {
        return Err(ServiceError::Invalid("operation name contains NUL".into()));
    }
    if user.as_str().is_empty() || user.as_str().contains('\0') {
        return Err(ServiceError::Invalid(format!("user id {:?} is not usable", user.as_str())));
    }
    Ok(())
}

impl<S: Store, C: Clock> AttestService<S, C> {
    /// Would one more `operation` by `user` in `project` be allowed now?
    /// Read-only; nothing is recorded.
    pub fn check_quota(
        &self,
        user: &UserId,
        project: ProjectId,
        operation: &str,
    ) -> Result<QuotaDecision, ServiceError> {
        check_usage_key(user, operation)?;
        let (tier_name, tier) = self.tiers.resolve(user)?;
        let now = self.now();
        let key = UsageKey::new(user.clone(), project, operation);
        let windows = self.store.usage_windows(&key, now)?;
        let balance = self.store.account(project)?.balance;
        let decision = self.governor.evaluate(tier_name, tier, &windows, balance, now);
        if let Some(reason) = &decision.reason {
            warn!(user = %user, %project, operation, tier = tier_name, %reason, "quota check denied");
        }
        Ok(decision)
    }

    /// Re-evaluate the quota and, if allowed, record the usage and charge the
    /// project in one atomic write.
    pub fn record_usage(
        &self,
        actor: &Actor,
        operation: &str,
        meta: Vec<(String, String)>,
    ) -> Result<CommittedUsage, ServiceError> {
        check_usage_key(&actor.id, operation)?;
        let (tier_name, tier) = self
            .tiers
            .resolve(&actor.id)
            .map_err(|e| refused("record_usage", &actor.id, e.into()))?;
        let now = self.now();
        let key = UsageKey::new(actor.id.clone(), actor.project_id, operation);
        let committed = self
            .store
            .commit_usage::<ServiceError, _>(&key, meta, now, |windows, account| {
                let decision =
                    self.governor
                        .evaluate(tier_name, tier, windows, account.balance, now);
                Ok(decision.into_result()?)
            })
            .map_err(|e| refused("record_usage", &actor.id, e))?;
        info!(
            usage = %committed.usage.id,
            user = %actor.id,
            project = %actor.project_id,
            operation,
            credits = committed.usage.credits_used,
            balance = committed.balance,
            "usage recorded"
        );
        Ok(committed)
    }

    /// Top up the actor's project. Owners and admins only.
    pub fn grant_credits(
        &self,
        actor: &Actor,
        amount: u64,
        memo: &str,
    ) -> Result<CreditTransaction, ServiceError> {
        require(actor.role.is_admin(), actor, "grant credits")
            .map_err(|e| refused("grant_credits", &actor.id, e))?;
        let tx = self
            .store
            .grant_credits::<ServiceError>(actor.project_id, amount, &actor.id, memo, self.now())
            .map_err(|e| refused("grant_credits", &actor.id, e))?;
        info!(
            project = %actor.project_id,
            amount,
            balance = tx.balance_after,
            hash = %tx.hash_hex(),
            "credits granted"
        );
        Ok(tx)
    }

    /// Check that the project's ledger chain is intact and sums to its
    /// balance.
    pub fn reconcile_ledger(&self, project: ProjectId) -> Result<LedgerSummary, ServiceError> {
        let account = self.store.account(project)?;
        let transactions = self.store.transactions(project)?;
        match reconcile(&account, &transactions) {
            Ok(summary) => {
                info!(%project, balance = summary.balance, entries = summary.entries, "ledger reconciled");
                Ok(summary)
            }
            Err(e) => {
                error!(%project, error = %e, "ledger does not reconcile");
                Err(e.into())
            }
        }
    }
}
