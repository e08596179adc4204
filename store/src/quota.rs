//! Usage and credit ledger storage trait.

use crate::StoreError;
use attest_quota::{CreditAccount, CreditTransaction, QuotaError, UsageRecord, UsageWindows};
use attest_types::{ProjectId, Timestamp, TransactionId, UsageId, UserId};

/// What a metered request is counted against.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UsageKey {
    pub user: UserId,
    pub project: ProjectId,
    pub operation: String,
}

impl UsageKey {
    pub fn new(user: UserId, project: ProjectId, operation: impl Into<String>) -> Self {
        Self {
            user,
            project,
            operation: operation.into(),
        }
    }
}

/// A usage event written together with its charge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommittedUsage {
    pub usage: UsageRecord,
    pub transaction: Option<CreditTransaction>,
    pub balance: i64,
}

pub trait QuotaStore {
    /// Count and oldest timestamp of prior usage of `key` in each trailing
    /// window ending at `now`.
    fn usage_windows(&self, key: &UsageKey, now: Timestamp) -> Result<UsageWindows, StoreError>;

    /// The project's account; a fresh zero-balance account if none exists.
    fn account(&self, project: ProjectId) -> Result<CreditAccount, StoreError>;

    /// Ledger entries in append order.
    fn transactions(&self, project: ProjectId) -> Result<Vec<CreditTransaction>, StoreError>;

    /// Evaluate and commit one usage event in a single write transaction.
    ///
    /// `evaluate` receives the windows and account as read inside the
    /// transaction and returns the credit cost, or refuses. On success the
    /// usage record, the conditional decrement and the ledger entry are
    /// written together.
    fn commit_usage<E, F>(
        &self,
        key: &UsageKey,
        meta: Vec<(String, String)>,
        now: Timestamp,
        evaluate: F,
    ) -> Result<CommittedUsage, E>
    where
        E: From<StoreError> + From<QuotaError>,
        F: FnOnce(&UsageWindows, &CreditAccount) -> Result<u64, E>;

    /// Append a positive ledger entry.
    fn grant_credits<E>(
        &self,
        project: ProjectId,
        amount: u64,
        actor: &UserId,
        memo: &str,
        at: Timestamp,
    ) -> Result<CreditTransaction, E>
    where
        E: From<StoreError> + From<QuotaError>;
}

/// Build the usage record for `key` and charge `cost` to `account`. Shared
/// by every backend so the charge rules live in one place.
#[allow(clippy::too_many_arguments)]
pub fn charge_usage(
    account: &mut CreditAccount,
    usage_id: UsageId,
    transaction_id: TransactionId,
    key: &UsageKey,
    meta: Vec<(String, String)>,
    cost: u64,
    now: Timestamp,
) -> Result<(UsageRecord, Option<CreditTransaction>), QuotaError> {
    let usage = UsageRecord {
        id: usage_id,
        user: key.user.clone(),
        project: key.project,
        operation: key.operation.clone(),
        at: now,
        credits_used: cost,
        meta,
    };
    let transaction = if cost > 0 {
        Some(account.charge(transaction_id, &usage)?)
    } else {
        None
    };
    Ok((usage, transaction))
}
