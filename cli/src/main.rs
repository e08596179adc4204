//! Attest operator CLI.

use std::path::{Path, PathBuf};

use anyhow::Context;
use attest_schema::{RecordType, SchemaRegistry};
use attest_service::{AttestService, ServiceConfig};
use attest_store_lmdb::LmdbStore;
use attest_types::{Actor, Clock, ProjectId, Role, SystemClock, UserId};
use attest_utils::{format_until, init_logging, LogFormat};
use clap::Parser;

#[derive(Parser)]
#[command(name = "attest", about = "Attest verification core operator tool")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// flags and env vars override them.
    #[arg(long, env = "ATTEST_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory holding the LMDB store.
    #[arg(long, env = "ATTEST_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "ATTEST_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output: "human" or "json".
    #[arg(long, env = "ATTEST_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Inspect the effective configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Record type schema tools.
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
    /// Project credit ledger tools.
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },
    /// AI usage quota tools.
    Quota {
        #[command(subcommand)]
        action: QuotaAction,
    },
}

#[derive(clap::Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
}

#[derive(clap::Subcommand)]
enum SchemaAction {
    /// Validate a record type JSON document.
    Check { file: PathBuf },
}

#[derive(clap::Subcommand)]
enum LedgerAction {
    /// Verify a project's balance against its hash-chained ledger.
    Reconcile {
        #[arg(long)]
        project: u64,
    },
    /// Append a credit grant to a project's ledger.
    Grant {
        #[arg(long)]
        project: u64,
        #[arg(long)]
        amount: u64,
        /// Operator recorded on the ledger entry.
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "operator grant")]
        memo: String,
    },
}

#[derive(clap::Subcommand)]
enum QuotaAction {
    /// Show whether one more request would be allowed now.
    Status {
        #[arg(long)]
        user: String,
        #[arg(long)]
        project: u64,
        #[arg(long)]
        operation: String,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<ServiceConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = ServiceConfig::from_toml_file(&path.to_string_lossy())
                .with_context(|| format!("loading config from {}", path.display()))?;
            tracing::debug!("loaded config from {}", path.display());
            config
        }
        None => ServiceConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    config.validate()?;
    Ok(config)
}

fn open_service(config: &ServiceConfig) -> anyhow::Result<AttestService<LmdbStore, SystemClock>> {
    let store = LmdbStore::open(&config.data_dir, config.map_size_bytes())
        .with_context(|| format!("opening store at {}", config.data_dir.display()))?;
    Ok(AttestService::new(store, SystemClock, config)?)
}

fn check_schema(file: &Path) -> anyhow::Result<RecordType> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let record_type: RecordType = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", file.display()))?;
    SchemaRegistry.validate(&record_type)?;
    Ok(record_type)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level);

    match cli.command {
        Command::Config { action } => match action {
            ConfigAction::Show => print!("{}", config.to_toml_string()?),
        },
        Command::Schema { action } => match action {
            SchemaAction::Check { file } => {
                let record_type = check_schema(&file)?;
                println!(
                    "{}: record type '{}' with {} fields and {} groups is valid",
                    file.display(),
                    record_type.slug,
                    record_type.fields.len(),
                    record_type.groups.len()
                );
            }
        },
        Command::Ledger { action } => {
            let service = open_service(&config)?;
            match action {
                LedgerAction::Reconcile { project } => {
                    let summary = service.reconcile_ledger(ProjectId::new(project))?;
                    println!(
                        "project {}: balance {} over {} entries, head {}",
                        summary.project, summary.balance, summary.entries, summary.head
                    );
                }
                LedgerAction::Grant {
                    project,
                    amount,
                    user,
                    memo,
                } => {
                    let operator = Actor::new(user, Role::Owner, ProjectId::new(project));
                    let tx = service.grant_credits(&operator, amount, &memo)?;
                    println!(
                        "{}: granted {} credits, balance {} ({})",
                        tx.id,
                        amount,
                        tx.balance_after,
                        tx.hash_hex()
                    );
                }
            }
        }
        Command::Quota { action } => match action {
            QuotaAction::Status {
                user,
                project,
                operation,
            } => {
                let service = open_service(&config)?;
                let decision =
                    service.check_quota(&UserId::new(user), ProjectId::new(project), &operation)?;
                let now = service.clock().now().as_secs();
                println!(
                    "tier {}: {}",
                    decision.tier,
                    if decision.allowed { "allowed" } else { "denied" }
                );
                match decision.remaining {
                    Some(left) => println!("remaining: {left}"),
                    None => println!("remaining: unlimited"),
                }
                if let Some(reset) = decision.reset_at {
                    println!("resets: {}", format_until(now, reset.as_secs()));
                }
                println!("cost: {} credits", decision.cost);
                if let Some(reason) = decision.reason {
                    println!("reason: {reason}");
                }
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_line_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_file_defaults() {
        let cli = Cli::parse_from([
            "attest",
            "--data-dir",
            "/tmp/attest-elsewhere",
            "--log-level",
            "debug",
            "config",
            "show",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/attest-elsewhere"));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.map_size_mb, ServiceConfig::default().map_size_mb);
    }

    #[test]
    fn schema_check_reads_record_type_documents() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("incident.json");
        std::fs::write(
            &good,
            r#"{"id": 1, "project_id": 1, "name": "Incident", "slug": "incident"}"#,
        )
        .unwrap();
        assert_eq!(check_schema(&good).unwrap().slug, "incident");

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(check_schema(&bad).is_err());
        assert!(check_schema(&dir.path().join("missing.json")).is_err());
    }
}
