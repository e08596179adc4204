//! LMDB implementation of QuotaStore.
//!
//! Usage key: `user ++ 0x00 ++ project(8) ++ operation ++ 0x00 ++ at(8) ++ usage(8)`.
//! Everything before `at` is the (user, project, operation) prefix, and the
//! big-endian timestamp sorts events by time, so one range scan from
//! `now - 30d` to `now` yields the whole monthly window.
//!
//! Accounts (`project(8)`) and ledger entries (`project(8) ++ tx(8)`) are
//! bincode; transaction ids increase, so a prefix scan is append order.

use std::ops::Bound;

use attest_quota::window::MONTH_SECS;
use attest_quota::{CreditAccount, CreditTransaction, QuotaError, UsageRecord, UsageWindows};
use attest_store::{charge_usage, CommittedUsage, QuotaStore, Sequence, StoreError, UsageKey};
use attest_types::{ProjectId, Timestamp, TransactionId, UsageId, UserId};
use heed::{RoTxn, RwTxn};
use tracing::info;

use crate::environment::{composite_key, increment_prefix};
use crate::error::backend;
use crate::{LmdbError, LmdbStore};

fn usage_prefix(key: &UsageKey) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(key.user.as_str().len() + key.operation.len() + 10);
    prefix.extend_from_slice(key.user.as_str().as_bytes());
    prefix.push(0);
    prefix.extend_from_slice(&key.project.to_be_bytes());
    prefix.extend_from_slice(key.operation.as_bytes());
    prefix.push(0);
    prefix
}

fn usage_key(key: &UsageKey, usage: &UsageRecord) -> Vec<u8> {
    let mut k = usage_prefix(key);
    k.extend_from_slice(&usage.at.as_secs().to_be_bytes());
    k.extend_from_slice(&usage.id.to_be_bytes());
    k
}

impl LmdbStore {
    fn tally_in(
        &self,
        txn: &RoTxn<'_>,
        key: &UsageKey,
        now: Timestamp,
    ) -> Result<UsageWindows, LmdbError> {
        let prefix = usage_prefix(key);
        let mut lower = prefix.clone();
        lower.extend_from_slice(&now.minus_secs(MONTH_SECS).as_secs().to_be_bytes());
        let mut upper = prefix;
        upper.extend_from_slice(&now.plus_secs(1).as_secs().to_be_bytes());
        let bounds = (
            Bound::Included(lower.as_slice()),
            Bound::Excluded(upper.as_slice()),
        );
        let mut events = Vec::new();
        for result in self.usage_db.range(txn, &bounds)? {
            let (_key, val) = result?;
            let usage: UsageRecord = bincode::deserialize(val)?;
            events.push(usage.at);
        }
        Ok(UsageWindows::tally(events, now))
    }

    fn account_in(&self, txn: &RoTxn<'_>, project: ProjectId) -> Result<CreditAccount, LmdbError> {
        match self.accounts_db.get(txn, &project.to_be_bytes())? {
            Some(bytes) => Ok(bincode::deserialize(bytes)?),
            None => Ok(CreditAccount::new(project)),
        }
    }

    fn write_ledger(
        &self,
        txn: &mut RwTxn<'_>,
        account: &CreditAccount,
        tx: &CreditTransaction,
    ) -> Result<(), LmdbError> {
        let project = account.project.to_be_bytes();
        self.ledger_db.put(
            txn,
            &composite_key(&project, tx.id.get()),
            &bincode::serialize(tx)?,
        )?;
        self.accounts_db
            .put(txn, &project, &bincode::serialize(account)?)?;
        Ok(())
    }
}

impl QuotaStore for LmdbStore {
    fn usage_windows(&self, key: &UsageKey, now: Timestamp) -> Result<UsageWindows, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.tally_in(&rtxn, key, now)?)
    }

    fn account(&self, project: ProjectId) -> Result<CreditAccount, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.account_in(&rtxn, project)?)
    }

    fn transactions(&self, project: ProjectId) -> Result<Vec<CreditTransaction>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let prefix = project.to_be_bytes();
        let mut upper = prefix.to_vec();
        increment_prefix(&mut upper);
        let bounds = (
            Bound::Included(prefix.as_slice()),
            Bound::Excluded(upper.as_slice()),
        );
        let iter = self
            .ledger_db
            .range(&rtxn, &bounds)
            .map_err(LmdbError::from)?;
        let mut ledger = Vec::new();
        for result in iter {
            let (_key, val) = result.map_err(LmdbError::from)?;
            ledger.push(bincode::deserialize(val).map_err(LmdbError::from)?);
        }
        Ok(ledger)
    }

    fn commit_usage<E, F>(
        &self,
        key: &UsageKey,
        meta: Vec<(String, String)>,
        now: Timestamp,
        evaluate: F,
    ) -> Result<CommittedUsage, E>
    where
        E: From<StoreError> + From<QuotaError>,
        F: FnOnce(&UsageWindows, &CreditAccount) -> Result<u64, E>,
    {
        let mut wtxn = self.env.write_txn().map_err(backend)?;
        let windows = self.tally_in(&wtxn, key, now).map_err(backend)?;
        let mut account = self.account_in(&wtxn, key.project).map_err(backend)?;

        let cost = evaluate(&windows, &account)?;

        let usage_id = UsageId::new(self.next_id_in(&mut wtxn, Sequence::Usage).map_err(backend)?);
        let tx_id = TransactionId::new(
            self.next_id_in(&mut wtxn, Sequence::Transaction)
                .map_err(backend)?,
        );
        let (usage, transaction) =
            charge_usage(&mut account, usage_id, tx_id, key, meta, cost, now)?;

        let bytes = bincode::serialize(&usage).map_err(backend)?;
        self.usage_db
            .put(&mut wtxn, &usage_key(key, &usage), &bytes)
            .map_err(backend)?;
        if let Some(tx) = &transaction {
            self.write_ledger(&mut wtxn, &account, tx).map_err(backend)?;
        }
        wtxn.commit().map_err(backend)?;

        if cost > 0 {
            info!(
                user = %key.user,
                project = %key.project,
                operation = %key.operation,
                cost,
                balance = account.balance,
                "charged usage"
            );
        }
        Ok(CommittedUsage {
            usage,
            transaction,
            balance: account.balance,
        })
    }

    fn grant_credits<E>(
        &self,
        project: ProjectId,
        amount: u64,
        actor: &UserId,
        memo: &str,
        at: Timestamp,
    ) -> Result<CreditTransaction, E>
    where
        E: From<StoreError> + From<QuotaError>,
    {
        let mut wtxn = self.env.write_txn().map_err(backend)?;
        let mut account = self.account_in(&wtxn, project).map_err(backend)?;
        let tx_id = TransactionId::new(
            self.next_id_in(&mut wtxn, Sequence::Transaction)
                .map_err(backend)?,
        );
        let tx = account.grant(tx_id, amount, actor, memo, at)?;
        self.write_ledger(&mut wtxn, &account, &tx).map_err(backend)?;
        wtxn.commit().map_err(backend)?;
        info!(%project, amount, balance = account.balance, "granted credits");
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::open_temp;
    use attest_quota::reconcile;
    use attest_quota::window::{DAY_SECS, HOUR_SECS};

    #[derive(Debug)]
    enum TestError {
        Store(StoreError),
        Quota(QuotaError),
    }

    impl From<StoreError> for TestError {
        fn from(e: StoreError) -> Self {
            TestError::Store(e)
        }
    }

    impl From<QuotaError> for TestError {
        fn from(e: QuotaError) -> Self {
            TestError::Quota(e)
        }
    }

    fn key(user: &str, operation: &str) -> UsageKey {
        UsageKey::new(UserId::from(user), ProjectId::new(1), operation)
    }

    fn free(store: &LmdbStore, key: &UsageKey, at: Timestamp) {
        store
            .commit_usage::<TestError, _>(key, Vec::new(), at, |_, _| Ok(0))
            .unwrap();
    }

    #[test]
    fn windows_count_only_matching_events() {
        let (_dir, store) = open_temp();
        let now = Timestamp::new(100 * DAY_SECS);
        let ana = key("ana", "summarise");
        free(&store, &ana, now.minus_secs(10));
        free(&store, &ana, now.minus_secs(2 * HOUR_SECS));
        free(&store, &ana, now.minus_secs(40 * DAY_SECS));
        free(&store, &key("ana", "extract"), now.minus_secs(5));
        free(&store, &key("anab", "summarise"), now.minus_secs(5));

        let w = store.usage_windows(&ana, now).unwrap();
        assert_eq!(w.hour.count, 1);
        assert_eq!(w.day.count, 2);
        assert_eq!(w.month.count, 2);
        assert_eq!(w.day.oldest, Some(now.minus_secs(2 * HOUR_SECS)));
    }

    #[test]
    fn usage_charge_and_ledger_commit_atomically() {
        let (_dir, store) = open_temp();
        let project = ProjectId::new(1);
        store
            .grant_credits::<TestError>(project, 3, &UserId::from("owner"), "seed", Timestamp::new(1))
            .unwrap();

        let ana = key("ana", "summarise");
        let committed = store
            .commit_usage::<TestError, _>(&ana, Vec::new(), Timestamp::new(10), |_, _| Ok(2))
            .unwrap();
        assert_eq!(committed.balance, 1);
        assert!(committed.transaction.is_some());

        let refused = store.commit_usage::<TestError, _>(&ana, Vec::new(), Timestamp::new(11), |_, _| Ok(2));
        assert!(matches!(
            refused,
            Err(TestError::Quota(QuotaError::InsufficientCredits { balance: 1, required: 2 }))
        ));
        assert_eq!(store.usage_windows(&ana, Timestamp::new(12)).unwrap().hour.count, 1);

        let account = store.account(project).unwrap();
        let ledger = store.transactions(project).unwrap();
        assert_eq!(ledger.len(), 2);
        let summary = reconcile(&account, &ledger).unwrap();
        assert_eq!(summary.balance, 1);
    }

    #[test]
    fn evaluation_sees_state_inside_the_transaction() {
        let (_dir, store) = open_temp();
        let ana = key("ana", "summarise");
        let now = Timestamp::new(5000);
        free(&store, &ana, now.minus_secs(1));
        let result = store.commit_usage::<TestError, _>(&ana, Vec::new(), now, |windows, _| {
            if windows.hour.count >= 1 {
                Err(StoreError::Backend("limit".into()).into())
            } else {
                Ok(0)
            }
        });
        assert!(matches!(result, Err(TestError::Store(_))));
        assert_eq!(store.usage_windows(&ana, now).unwrap().hour.count, 1);
    }
}
