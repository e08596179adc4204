use attest_records::ItemRef;
use attest_types::{ErrorKind, RequestId, ResultId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("record is {0}; only verified records can be audited")]
    NotPublished(String),

    #[error("role {role} may not {action}")]
    NotPermitted { role: String, action: &'static str },

    #[error("actor belongs to another project")]
    WrongProject,

    #[error("request {0} is still open for this record")]
    OpenRequest(RequestId),

    #[error("record has nothing to audit")]
    NothingToAudit,

    #[error("{0} cannot be audited on this record")]
    IneligibleItem(ItemRef),

    #[error("record-scope requests take no item list")]
    ItemsOnRecordScope,

    #[error("already assigned to {0}")]
    AlreadyAssigned(String),

    #[error("verifier took part in reviewing this record")]
    NotIndependent,

    #[error("only the assigned verifier may {0}")]
    NotAssignee(&'static str),

    #[error("cannot {action} a request that is {status}")]
    WrongStatus { action: &'static str, status: String },

    #[error("no result for {0}")]
    MissingResult(String),

    #[error("unexpected result for {0}")]
    UnexpectedResult(String),

    #[error("result for {0} is unverified but lists no issue")]
    IssuesRequired(String),

    #[error("a reason is required")]
    ReasonRequired,

    #[error("result {0} not found")]
    ResultNotFound(ResultId),

    #[error("only data-level results can be unverified")]
    NotDataLevel,
}

impl AuditError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuditError::NotPublished(_)
            | AuditError::OpenRequest(_)
            | AuditError::WrongStatus { .. } => ErrorKind::State,
            AuditError::NotPermitted { .. }
            | AuditError::WrongProject
            | AuditError::NotIndependent
            | AuditError::NotAssignee(_) => ErrorKind::Permission,
            AuditError::AlreadyAssigned(_) => ErrorKind::Concurrency,
            AuditError::ResultNotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Validation,
        }
    }
}
