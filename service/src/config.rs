//! Service configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use attest_quota::TierTable;
use attest_utils::LogFormat;
use attest_workflow::WorkflowPolicy;

use crate::ServiceError;

/// Configuration for an Attest deployment.
///
/// Loaded from a TOML file via [`ServiceConfig::from_toml_file`] or built
/// programmatically for tests. Every field has a default, so an empty file
/// is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in mebibytes.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Usage tiers and per-user assignments.
    #[serde(default)]
    pub quota: TierTable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Accept records from people without a project role.
    #[serde(default = "default_true")]
    pub allow_guest_submissions: bool,

    #[serde(default)]
    pub forbid_self_review: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./attest_data")
}

fn default_map_size_mb() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ServiceConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, ServiceError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ServiceError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse and check configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ServiceError> {
        let config: Self = toml::from_str(s).map_err(|e| ServiceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ServiceError> {
        toml::to_string_pretty(self).map_err(|e| ServiceError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.map_size_mb == 0 {
            return Err(ServiceError::Config("map_size_mb must be positive".into()));
        }
        self.quota
            .validate()
            .map_err(|e| ServiceError::Config(e.to_string()))
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn workflow_policy(&self) -> WorkflowPolicy {
        WorkflowPolicy {
            forbid_self_review: self.workflow.forbid_self_review,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            allow_guest_submissions: default_true(),
            forbid_self_review: false,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            workflow: WorkflowConfig::default(),
            quota: TierTable::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = ServiceConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = ServiceConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = ServiceConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.map_size_mb, 1024);
        assert_eq!(config.log_format, LogFormat::Human);
        assert!(config.workflow.allow_guest_submissions);
        assert_eq!(config.quota.default_tier, "free");
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            log_format = "json"

            [workflow]
            forbid_self_review = true

            [quota]
            default_tier = "team"

            [quota.tiers.team]
            requests_per_hour = 3
            requests_per_day = 10
            credits_per_request = 2

            [quota.assignments]
            ana = "team"
        "#;
        let config = ServiceConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.workflow_policy().forbid_self_review);
        assert!(config.workflow.allow_guest_submissions);
        let team = &config.quota.tiers["team"];
        assert_eq!(team.requests_per_hour, Some(3));
        assert_eq!(team.requests_per_month, None);
    }

    #[test]
    fn unknown_default_tier_is_a_config_error() {
        let result = ServiceConfig::from_toml_str("[quota]\ndefault_tier = \"gold\"\n");
        assert!(matches!(result, Err(ServiceError::Config(_))));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = ServiceConfig::from_toml_file("/nonexistent/attest.toml");
        assert!(matches!(result, Err(ServiceError::Config(_))));
    }
}
