//! Quota evaluation.

use crate::error::QuotaError;
use crate::tier::Tier;
use crate::window::{UsageWindows, Window};
use attest_types::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a request was refused.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum QuotaDenial {
    RateLimited {
        window: Window,
        limit: u32,
        used: u32,
        reset_at: Timestamp,
    },
    InsufficientCredits { balance: i64, required: u64 },
}

impl fmt::Display for QuotaDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaDenial::RateLimited { window, limit, .. } => {
                write!(f, "{window} limit of {limit} requests reached")
            }
            QuotaDenial::InsufficientCredits { balance, required } => {
                write!(f, "project balance {balance} cannot cover {required} credits")
            }
        }
    }
}

impl From<QuotaDenial> for QuotaError {
    fn from(denial: QuotaDenial) -> Self {
        match denial {
            QuotaDenial::RateLimited {
                window,
                limit,
                used,
                reset_at,
            } => QuotaError::Exceeded {
                window,
                limit,
                used,
                reset_at,
            },
            QuotaDenial::InsufficientCredits { balance, required } => {
                QuotaError::InsufficientCredits { balance, required }
            }
        }
    }
}

/// Answer to a quota check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaDecision {
    pub allowed: bool,
    /// Requests left in the tightest limited window; `None` when unlimited.
    pub remaining: Option<u32>,
    /// When the tightest limited window frees a slot.
    pub reset_at: Option<Timestamp>,
    pub tier: String,
    /// Credits the request costs.
    pub cost: u64,
    pub reason: Option<QuotaDenial>,
}

impl QuotaDecision {
    /// `Ok(cost)` when allowed.
    pub fn into_result(self) -> Result<u64, QuotaError> {
        match self.reason {
            None => Ok(self.cost),
            Some(denial) => Err(denial.into()),
        }
    }
}

/// Stateless evaluator of tier ceilings and credit balance.
pub struct QuotaGovernor;

impl QuotaGovernor {
    /// Evaluate one more request against `usage` and the project `balance`.
    ///
    /// Windows are checked hour, day, month; the first exhausted one is
    /// reported with its own reset time. Credits are checked only once every
    /// window has room.
    pub fn evaluate(
        &self,
        tier_name: &str,
        tier: &Tier,
        usage: &UsageWindows,
        balance: i64,
        now: Timestamp,
    ) -> QuotaDecision {
        let mut decision = QuotaDecision {
            allowed: true,
            remaining: None,
            reset_at: None,
            tier: tier_name.to_string(),
            cost: tier.cost(),
            reason: None,
        };

        for window in Window::ALL {
            let Some(limit) = tier.limit(window) else {
                continue;
            };
            let used = usage.get(window);
            let reset_at = used.reset_at(window, now);
            if used.count >= limit {
                decision.allowed = false;
                decision.remaining = Some(0);
                decision.reset_at = Some(reset_at);
                decision.reason = Some(QuotaDenial::RateLimited {
                    window,
                    limit,
                    used: used.count,
                    reset_at,
                });
                return decision;
            }
            let left = limit - used.count;
            if decision.remaining.map_or(true, |r| left < r) {
                decision.remaining = Some(left);
                decision.reset_at = Some(reset_at);
            }
        }

        let cost = tier.cost();
        if cost > 0 && i64::try_from(cost).map_or(true, |cost| balance < cost) {
            decision.allowed = false;
            decision.reason = Some(QuotaDenial::InsufficientCredits {
                balance,
                required: cost,
            });
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{DAY_SECS, HOUR_SECS};

    fn tier(hour: u32, day: u32) -> Tier {
        Tier {
            requests_per_hour: Some(hour),
            requests_per_day: Some(day),
            requests_per_month: None,
            credits_per_request: None,
        }
    }

    fn events(now: Timestamp, ages: &[u64]) -> UsageWindows {
        UsageWindows::tally(ages.iter().map(|a| now.minus_secs(*a)), now)
    }

    #[test]
    fn hourly_window_binds_before_daily() {
        let now = Timestamp::new(5 * DAY_SECS);
        let usage = events(now, &[100, 200, 300]);
        let d = QuotaGovernor.evaluate("free", &tier(3, 10), &usage, 0, now);
        assert!(!d.allowed);
        assert!(matches!(
            d.reason,
            Some(QuotaDenial::RateLimited { window: Window::Hour, limit: 3, used: 3, .. })
        ));
        assert_eq!(d.reset_at, Some(now.minus_secs(300).plus_secs(HOUR_SECS)));
    }

    #[test]
    fn daily_reset_comes_from_daily_window() {
        let now = Timestamp::new(5 * DAY_SECS);
        let usage = events(now, &[2 * HOUR_SECS, 5 * HOUR_SECS, 20 * HOUR_SECS]);
        let d = QuotaGovernor.evaluate("free", &tier(3, 3), &usage, 0, now);
        assert!(matches!(
            d.reason,
            Some(QuotaDenial::RateLimited { window: Window::Day, .. })
        ));
        assert_eq!(d.reset_at, Some(now.minus_secs(20 * HOUR_SECS).plus_secs(DAY_SECS)));
    }

    #[test]
    fn remaining_tracks_tightest_window() {
        let now = Timestamp::new(5 * DAY_SECS);
        let usage = events(now, &[10, 2 * HOUR_SECS]);
        let d = QuotaGovernor.evaluate("free", &tier(3, 3), &usage, 0, now);
        assert!(d.allowed);
        assert_eq!(d.remaining, Some(1));
        assert_eq!(d.reset_at, Some(now.minus_secs(2 * HOUR_SECS).plus_secs(DAY_SECS)));
    }

    #[test]
    fn oversized_cost_is_refused_for_credits() {
        let now = Timestamp::new(1000);
        let mut whale = tier(10, 10);
        whale.credits_per_request = Some(u64::MAX);
        let d = QuotaGovernor.evaluate("whale", &whale, &UsageWindows::default(), i64::MAX, now);
        assert!(!d.allowed);
        assert!(matches!(
            d.reason,
            Some(QuotaDenial::InsufficientCredits { required: u64::MAX, .. })
        ));
    }

    #[test]
    fn credits_are_a_distinct_refusal() {
        let now = Timestamp::new(1000);
        let mut paid = tier(10, 10);
        paid.credits_per_request = Some(5);
        let d = QuotaGovernor.evaluate("pro", &paid, &UsageWindows::default(), 4, now);
        assert_eq!(
            d.reason,
            Some(QuotaDenial::InsufficientCredits {
                balance: 4,
                required: 5
            })
        );
        assert!(matches!(
            d.into_result(),
            Err(QuotaError::InsufficientCredits { .. })
        ));
        let d = QuotaGovernor.evaluate("pro", &paid, &UsageWindows::default(), 5, now);
        assert_eq!(d.into_result().unwrap(), 5);
    }
}
