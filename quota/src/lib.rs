//! Quota and credit governor for metered AI-assisted operations.
//!
//! A request is keyed by (user, project, operation). The user's tier sets
//! hourly, daily and monthly ceilings and an optional per-request credit
//! cost charged to the project. Windows are checked tightest first so a
//! caller is always told about the window that actually binds.
//!
//! Charges and grants are appended to a per-project ledger. Each entry
//! seals the hash of the previous one, and the account balance must always
//! equal the sum of the ledger amounts.

pub mod error;
pub mod governor;
pub mod ledger;
pub mod tier;
pub mod window;

pub use error::QuotaError;
pub use governor::{QuotaDecision, QuotaDenial, QuotaGovernor};
pub use ledger::{
    reconcile, CreditAccount, CreditTransaction, LedgerSummary, TransactionKind, UsageRecord,
};
pub use tier::{Tier, TierTable};
pub use window::{UsageWindows, Window, WindowUsage};
