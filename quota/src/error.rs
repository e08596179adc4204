use crate::window::Window;
use attest_types::{ErrorKind, Timestamp};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("{window} limit of {limit} reached ({used} used); resets at {reset_at}")]
    Exceeded {
        window: Window,
        limit: u32,
        used: u32,
        reset_at: Timestamp,
    },

    #[error("insufficient credits: balance {balance}, required {required}")]
    InsufficientCredits { balance: i64, required: u64 },

    #[error("unknown tier: {0}")]
    UnknownTier(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("ledger does not reconcile: {0}")]
    Unreconciled(String),
}

impl QuotaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuotaError::Exceeded { .. } => ErrorKind::QuotaExceeded,
            QuotaError::InsufficientCredits { .. } => ErrorKind::InsufficientCredits,
            QuotaError::UnknownTier(_) | QuotaError::InvalidAmount(_) => ErrorKind::Validation,
            QuotaError::Unreconciled(_) => ErrorKind::Storage,
        }
    }
}
