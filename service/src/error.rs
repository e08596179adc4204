use attest_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Identity(#[from] attest_types::TypesError),

    #[error("schema error: {0}")]
    Schema(#[from] attest_schema::SchemaError),

    #[error("evidence error: {0}")]
    Evidence(#[from] attest_evidence::EvidenceError),

    #[error("record error: {0}")]
    Record(#[from] attest_records::RecordError),

    #[error("workflow error: {0}")]
    Workflow(#[from] attest_workflow::WorkflowError),

    #[error("audit error: {0}")]
    Audit(#[from] attest_audit::AuditError),

    #[error("quota error: {0}")]
    Quota(#[from] attest_quota::QuotaError),

    #[error("store error: {0}")]
    Store(#[from] attest_store::StoreError),

    #[error("role {role} may not {action}")]
    NotPermitted { role: String, action: &'static str },

    #[error("actor belongs to another project")]
    WrongProject,

    #[error("only the submitter may change this draft")]
    NotSubmitter,

    #[error("guest submissions are disabled")]
    GuestSubmissionsDisabled,

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("config error: {0}")]
    Config(String),
}

impl ServiceError {
    /// The error taxonomy class, for mapping onto a transport's responses.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Identity(e) => e.kind(),
            ServiceError::Schema(e) => e.kind(),
            ServiceError::Evidence(e) => e.kind(),
            ServiceError::Record(e) => e.kind(),
            ServiceError::Workflow(e) => e.kind(),
            ServiceError::Audit(e) => e.kind(),
            ServiceError::Quota(e) => e.kind(),
            ServiceError::Store(e) => e.kind(),
            ServiceError::NotPermitted { .. }
            | ServiceError::WrongProject
            | ServiceError::NotSubmitter
            | ServiceError::GuestSubmissionsDisabled => ErrorKind::Permission,
            ServiceError::Invalid(_) | ServiceError::Config(_) => ErrorKind::Validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_quota::QuotaError;
    use attest_store::StoreError;

    #[test]
    fn wrapped_errors_keep_their_kind() {
        let err = ServiceError::from(QuotaError::InsufficientCredits {
            balance: 0,
            required: 1,
        });
        assert_eq!(err.kind(), ErrorKind::InsufficientCredits);
        let err = ServiceError::from(StoreError::NotFound("rec_1".into()));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(ServiceError::NotSubmitter.kind(), ErrorKind::Permission);
    }
}
