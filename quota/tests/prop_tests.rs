use proptest::prelude::*;

use attest_quota::{
    reconcile, CreditAccount, CreditTransaction, QuotaDenial, QuotaError, QuotaGovernor, Tier,
    UsageRecord, UsageWindows, Window,
};
use attest_types::{ProjectId, Timestamp, TransactionId, UsageId, UserId};

#[derive(Clone, Debug)]
enum Op {
    Grant(u64),
    Charge(u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..50).prop_map(Op::Grant),
        (1u64..30).prop_map(Op::Charge),
    ]
}

proptest! {
    /// After any mix of grants and charges the balance equals the sum of
    /// ledger amounts, never goes negative, and the chain verifies.
    #[test]
    fn ledger_always_reconciles(ops in prop::collection::vec(op(), 0..40)) {
        let mut account = CreditAccount::new(ProjectId::new(7));
        let mut ledger: Vec<CreditTransaction> = Vec::new();
        for (i, op) in ops.into_iter().enumerate() {
            let id = TransactionId::new(i as u64 + 1);
            let at = Timestamp::new(i as u64);
            let result = match op {
                Op::Grant(n) => account.grant(id, n, &UserId::from("owner"), "top-up", at),
                Op::Charge(n) => account.charge(id, &UsageRecord {
                    id: UsageId::new(i as u64 + 1),
                    user: UserId::from("ana"),
                    project: ProjectId::new(7),
                    operation: "summarise".into(),
                    at,
                    credits_used: n,
                    meta: Vec::new(),
                }),
            };
            match result {
                Ok(tx) => ledger.push(tx),
                Err(e) => prop_assert!(matches!(e, QuotaError::InsufficientCredits { .. }), "unexpected error: {:?}", e),
            }
            prop_assert!(account.balance >= 0);
            let sum: i64 = ledger.iter().map(|t| t.amount).sum();
            prop_assert_eq!(sum, account.balance);
        }
        prop_assert!(reconcile(&account, &ledger).is_ok());
    }

    /// Whenever more than one window is exhausted, the tightest one is
    /// reported.
    #[test]
    fn tightest_exhausted_window_is_reported(
        ages in prop::collection::vec(0u64..(40 * 86_400), 0..40),
        hour in 1u32..6,
        day in 1u32..12,
        month in 1u32..30,
    ) {
        let now = Timestamp::new(100 * 86_400);
        let usage = UsageWindows::tally(ages.iter().map(|a| now.minus_secs(*a)), now);
        let tier = Tier {
            requests_per_hour: Some(hour),
            requests_per_day: Some(day),
            requests_per_month: Some(month),
            credits_per_request: None,
        };
        let decision = QuotaGovernor.evaluate("t", &tier, &usage, 0, now);
        let first_full = Window::ALL
            .into_iter()
            .find(|w| usage.get(*w).count >= tier.limit(*w).unwrap_or(u32::MAX));
        match (first_full, decision.reason) {
            (None, None) => prop_assert!(decision.allowed),
            (Some(expected), Some(QuotaDenial::RateLimited { window, .. })) => {
                prop_assert_eq!(expected, window)
            }
            (expected, reason) => prop_assert!(false, "{:?} vs {:?}", expected, reason),
        }
    }
}
