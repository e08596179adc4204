//! Usage tiers.

use crate::error::QuotaError;
use crate::window::Window;
use attest_types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ceilings and cost of one tier. `None` means unlimited / free.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tier {
    pub requests_per_hour: Option<u32>,
    pub requests_per_day: Option<u32>,
    pub requests_per_month: Option<u32>,
    /// Charged against the project, not the user.
    pub credits_per_request: Option<u64>,
}

impl Tier {
    pub fn limit(&self, window: Window) -> Option<u32> {
        match window {
            Window::Hour => self.requests_per_hour,
            Window::Day => self.requests_per_day,
            Window::Month => self.requests_per_month,
        }
    }

    /// Credits one request costs; zero when the tier is free.
    pub fn cost(&self) -> u64 {
        self.credits_per_request.unwrap_or(0)
    }
}

/// Named tiers, the default tier and per-user assignments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTable {
    #[serde(default = "default_tier_name")]
    pub default_tier: String,
    #[serde(default = "default_tiers")]
    pub tiers: BTreeMap<String, Tier>,
    /// user id -> tier name
    #[serde(default)]
    pub assignments: BTreeMap<String, String>,
}

fn default_tier_name() -> String {
    "free".to_string()
}

fn default_tiers() -> BTreeMap<String, Tier> {
    let mut tiers = BTreeMap::new();
    tiers.insert(
        "free".to_string(),
        Tier {
            requests_per_hour: Some(3),
            requests_per_day: Some(10),
            requests_per_month: Some(100),
            credits_per_request: None,
        },
    );
    tiers.insert(
        "pro".to_string(),
        Tier {
            requests_per_hour: Some(30),
            requests_per_day: Some(200),
            requests_per_month: Some(3000),
            credits_per_request: Some(1),
        },
    );
    tiers
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            default_tier: default_tier_name(),
            tiers: default_tiers(),
            assignments: BTreeMap::new(),
        }
    }
}

impl TierTable {
    /// The tier name and definition that apply to `user`.
    pub fn resolve(&self, user: &UserId) -> Result<(&str, &Tier), QuotaError> {
        let name = self
            .assignments
            .get(user.as_str())
            .unwrap_or(&self.default_tier);
        self.tiers
            .get_key_value(name)
            .map(|(k, t)| (k.as_str(), t))
            .ok_or_else(|| QuotaError::UnknownTier(name.clone()))
    }

    /// Every assignment and the default must name a defined tier, and every
    /// cost must fit a ledger amount.
    pub fn validate(&self) -> Result<(), QuotaError> {
        if let Some((name, tier)) = self
            .tiers
            .iter()
            .find(|(_, tier)| i64::try_from(tier.cost()).is_err())
        {
            return Err(QuotaError::InvalidAmount(format!(
                "tier {name} costs {} credits per request",
                tier.cost()
            )));
        }
        std::iter::once(&self.default_tier)
            .chain(self.assignments.values())
            .find(|name| !self.tiers.contains_key(*name))
            .map_or(Ok(()), |name| Err(QuotaError::UnknownTier(name.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_overrides_default() {
        let mut table = TierTable::default();
        table.assignments.insert("ana".into(), "pro".into());
        assert_eq!(table.resolve(&UserId::from("ana")).unwrap().0, "pro");
        assert_eq!(table.resolve(&UserId::from("ben")).unwrap().0, "free");
    }

    #[test]
    fn dangling_assignment_is_invalid() {
        let mut table = TierTable::default();
        table.assignments.insert("ana".into(), "gold".into());
        assert!(matches!(table.validate(), Err(QuotaError::UnknownTier(t)) if t == "gold"));
        assert!(table.resolve(&UserId::from("ana")).is_err());
    }

    #[test]
    fn cost_beyond_ledger_range_is_invalid() {
        let mut table = TierTable::default();
        table.tiers.insert(
            "whale".into(),
            Tier {
                credits_per_request: Some(u64::MAX),
                ..Tier::default()
            },
        );
        assert!(matches!(table.validate(), Err(QuotaError::InvalidAmount(_))));
    }

    #[test]
    fn loads_from_toml() {
        let table: TierTable = toml::from_str(
            r#"
            default_tier = "basic"
            [tiers.basic]
            requests_per_hour = 5
            credits_per_request = 2
            "#,
        )
        .unwrap();
        let (name, tier) = table.resolve(&UserId::from("x")).unwrap();
        assert_eq!(name, "basic");
        assert_eq!(tier.limit(Window::Hour), Some(5));
        assert_eq!(tier.limit(Window::Day), None);
        assert_eq!(tier.cost(), 2);
    }
}
