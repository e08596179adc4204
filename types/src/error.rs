//! The error taxonomy shared by every crate.

use thiserror::Error;

/// Classification of a failed core operation.
///
/// Every domain error maps onto exactly one kind. All kinds are scoped to a
/// single request; none is fatal to the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or incomplete input. The caller corrects it; never retried.
    Validation,
    /// Illegal state transition attempted.
    State,
    /// Role or ownership check failed.
    Permission,
    /// A compare-and-swap was lost. Refetch before retrying.
    Concurrency,
    /// A rate-limit window is exhausted.
    QuotaExceeded,
    /// The project credit balance cannot cover the cost.
    InsufficientCredits,
    /// The referenced entity does not exist.
    NotFound,
    /// The persistence layer failed.
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::State => "state",
            ErrorKind::Permission => "permission",
            ErrorKind::Concurrency => "concurrency",
            ErrorKind::QuotaExceeded => "quota_exceeded",
            ErrorKind::InsufficientCredits => "insufficient_credits",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Storage => "storage",
        }
    }
}

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("user {user} has no role in project {project}")]
    NotAMember { user: String, project: String },
}

impl TypesError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TypesError::UnknownRole(_) => ErrorKind::Validation,
            TypesError::NotAMember { .. } => ErrorKind::Permission,
        }
    }
}
