//! Usage records and the per-project credit ledger.

use crate::error::QuotaError;
use attest_types::{ProjectId, Timestamp, TransactionId, UsageId, UserId};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};

type Blake2b256 = Blake2b<U32>;

/// Hash sealed by the first entry of every ledger.
pub const GENESIS_HASH: [u8; 32] = [0u8; 32];

/// One metered operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: UsageId,
    pub user: UserId,
    pub project: ProjectId,
    pub operation: String,
    pub at: Timestamp,
    pub credits_used: u64,
    /// Caller-supplied context (template id, model, ...).
    pub meta: Vec<(String, String)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Grant,
    Charge,
}

/// An append-only ledger entry. `hash` covers every other field and the
/// previous entry's hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: TransactionId,
    pub project: ProjectId,
    pub kind: TransactionKind,
    /// Positive for grants, negative for charges.
    pub amount: i64,
    pub balance_after: i64,
    pub usage: Option<UsageId>,
    pub actor: Option<UserId>,
    pub memo: String,
    pub at: Timestamp,
    pub prev_hash: [u8; 32],
    pub hash: [u8; 32],
}

impl CreditTransaction {
    fn digest(&self) -> [u8; 32] {
        let mut hasher = Blake2b256::new();
        hasher.update(self.prev_hash);
        hasher.update(self.id.to_be_bytes());
        hasher.update(self.project.to_be_bytes());
        hasher.update([self.kind as u8]);
        hasher.update(self.amount.to_be_bytes());
        hasher.update(self.balance_after.to_be_bytes());
        hasher.update(self.usage.map_or(0, |u| u.get()).to_be_bytes());
        if let Some(actor) = &self.actor {
            hasher.update(actor.as_str().as_bytes());
        }
        hasher.update([0u8]);
        hasher.update(self.memo.as_bytes());
        hasher.update(self.at.as_secs().to_be_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        out
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Whether the stored hash matches the entry's contents.
    pub fn is_sealed(&self) -> bool {
        self.digest() == self.hash
    }
}

/// A project's credit balance and the head of its ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAccount {
    pub project: ProjectId,
    pub balance: i64,
    pub head: [u8; 32],
    pub entries: u64,
}

impl CreditAccount {
    pub fn new(project: ProjectId) -> Self {
        Self {
            project,
            balance: 0,
            head: GENESIS_HASH,
            entries: 0,
        }
    }

    /// Conditionally decrement by `usage.credits_used`. On insufficient
    /// balance the account is left untouched.
    pub fn charge(
        &mut self,
        id: TransactionId,
        usage: &UsageRecord,
    ) -> Result<CreditTransaction, QuotaError> {
        let cost = usage.credits_used;
        let amount = i64::try_from(cost)
            .map_err(|_| QuotaError::InvalidAmount(format!("{cost} credits")))?;
        if cost == 0 {
            return Err(QuotaError::InvalidAmount("charge of zero credits".into()));
        }
        if self.balance < amount {
            return Err(QuotaError::InsufficientCredits {
                balance: self.balance,
                required: cost,
            });
        }
        Ok(self.append(
            id,
            TransactionKind::Charge,
            -amount,
            Some(usage.id),
            Some(usage.user.clone()),
            format!("{} by {}", usage.operation, usage.user),
            usage.at,
        ))
    }

    pub fn grant(
        &mut self,
        id: TransactionId,
        amount: u64,
        actor: &UserId,
        memo: impl Into<String>,
        at: Timestamp,
    ) -> Result<CreditTransaction, QuotaError> {
        let signed = i64::try_from(amount)
            .ok()
            .filter(|a| *a > 0)
            .ok_or_else(|| QuotaError::InvalidAmount(format!("grant of {amount} credits")))?;
        if self.balance.checked_add(signed).is_none() {
            return Err(QuotaError::InvalidAmount("balance overflow".into()));
        }
        Ok(self.append(
            id,
            TransactionKind::Grant,
            signed,
            None,
            Some(actor.clone()),
            memo.into(),
            at,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn append(
        &mut self,
        id: TransactionId,
        kind: TransactionKind,
        amount: i64,
        usage: Option<UsageId>,
        actor: Option<UserId>,
        memo: String,
        at: Timestamp,
    ) -> CreditTransaction {
        let mut tx = CreditTransaction {
            id,
            project: self.project,
            kind,
            amount,
            balance_after: self.balance + amount,
            usage,
            actor,
            memo,
            at,
            prev_hash: self.head,
            hash: GENESIS_HASH,
        };
        tx.hash = tx.digest();
        self.balance = tx.balance_after;
        self.head = tx.hash;
        self.entries += 1;
        tx
    }
}

/// Result of a successful reconciliation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub project: ProjectId,
    pub balance: i64,
    pub entries: u64,
    pub head: String,
}

/// Check that `transactions` (in append order) form an intact chain whose
/// amounts sum to the account balance.
pub fn reconcile(
    account: &CreditAccount,
    transactions: &[CreditTransaction],
) -> Result<LedgerSummary, QuotaError> {
    let mut running = 0i64;
    let mut prev = GENESIS_HASH;
    for tx in transactions {
        if tx.project != account.project {
            return Err(QuotaError::Unreconciled(format!(
                "{} belongs to {}",
                tx.id, tx.project
            )));
        }
        if tx.prev_hash != prev {
            return Err(QuotaError::Unreconciled(format!("{} breaks the hash chain", tx.id)));
        }
        if !tx.is_sealed() {
            return Err(QuotaError::Unreconciled(format!("{} was altered", tx.id)));
        }
        running += tx.amount;
        if tx.balance_after != running {
            return Err(QuotaError::Unreconciled(format!(
                "{} records balance {} but amounts sum to {}",
                tx.id, tx.balance_after, running
            )));
        }
        prev = tx.hash;
    }
    if running != account.balance {
        return Err(QuotaError::Unreconciled(format!(
            "balance {} but amounts sum to {}",
            account.balance, running
        )));
    }
    if prev != account.head || transactions.len() as u64 != account.entries {
        return Err(QuotaError::Unreconciled("account head does not match ledger".into()));
    }
    Ok(LedgerSummary {
        project: account.project,
        balance: running,
        entries: account.entries,
        head: hex::encode(prev),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(id: u64, credits: u64) -> UsageRecord {
        UsageRecord {
            id: UsageId::new(id),
            user: UserId::from("ana"),
            project: ProjectId::new(1),
            operation: "template_generation".into(),
            at: Timestamp::new(100 + id),
            credits_used: credits,
            meta: Vec::new(),
        }
    }

    fn funded(amount: u64) -> (CreditAccount, Vec<CreditTransaction>) {
        let mut account = CreditAccount::new(ProjectId::new(1));
        let tx = account
            .grant(
                TransactionId::new(1),
                amount,
                &UserId::from("owner"),
                "initial",
                Timestamp::new(1),
            )
            .unwrap();
        (account, vec![tx])
    }

    #[test]
    fn charge_is_conditional() {
        let (mut account, mut ledger) = funded(3);
        ledger.push(account.charge(TransactionId::new(2), &usage(1, 2)).unwrap());
        let before = account.clone();
        let err = account.charge(TransactionId::new(3), &usage(2, 2)).unwrap_err();
        assert!(matches!(
            err,
            QuotaError::InsufficientCredits {
                balance: 1,
                required: 2
            }
        ));
        assert_eq!(account, before);
        let summary = reconcile(&account, &ledger).unwrap();
        assert_eq!(summary.balance, 1);
        assert_eq!(summary.entries, 2);
    }

    #[test]
    fn tampering_is_detected() {
        let (mut account, mut ledger) = funded(10);
        ledger.push(account.charge(TransactionId::new(2), &usage(1, 4)).unwrap());
        ledger[0].amount = 100;
        assert!(reconcile(&account, &ledger).is_err());

        let (account, mut ledger) = funded(10);
        ledger.clear();
        assert!(matches!(
            reconcile(&account, &ledger),
            Err(QuotaError::Unreconciled(_))
        ));
    }

    #[test]
    fn zero_and_oversized_grants_are_refused() {
        let mut account = CreditAccount::new(ProjectId::new(1));
        assert!(account
            .grant(TransactionId::new(1), 0, &UserId::from("o"), "", Timestamp::new(1))
            .is_err());
        assert!(account
            .grant(TransactionId::new(1), u64::MAX, &UserId::from("o"), "", Timestamp::new(1))
            .is_err());
        assert_eq!(account.entries, 0);
    }
}
