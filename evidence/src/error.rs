use attest_types::{ErrorKind, QuoteId, SourceId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("quote {0} not found on this record")]
    QuoteNotFound(QuoteId),

    #[error("source {0} not found on this record")]
    SourceNotFound(SourceId),

    #[error("quote text must be non-empty")]
    EmptyQuote,

    #[error("invalid source: {0}")]
    InvalidSource(String),

    #[error("field slug must be non-empty")]
    EmptySlug,

    #[error("{0} is already attached")]
    Duplicate(String),
}

impl EvidenceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvidenceError::QuoteNotFound(_) | EvidenceError::SourceNotFound(_) => {
                ErrorKind::NotFound
            }
            _ => ErrorKind::Validation,
        }
    }
}
