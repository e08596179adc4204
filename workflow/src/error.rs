use attest_records::{ItemRef, RecordError};
use attest_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("role {role} may not {action}")]
    NotPermitted { role: String, action: &'static str },

    #[error("actor belongs to another project")]
    WrongProject,

    #[error("cannot {action} a record in status {status}")]
    WrongStage { action: &'static str, status: String },

    #[error("already approved by this user: awaiting another analyst")]
    SameReviewer,

    #[error("already validated by this user: awaiting another validator")]
    SameValidator,

    #[error("submitters may not review their own records")]
    SelfReview,

    #[error("a reason is required")]
    ReasonRequired,

    #[error("checklist is missing: {}", join_items(.0))]
    MissingItems(Vec<ItemRef>),

    #[error("checklist references {0}, which is not on this record")]
    UnknownItem(ItemRef),

    #[error("unchecked items need a reason: {}", join_items(.0))]
    MissingReasons(Vec<ItemRef>),

    #[error("cannot validate with unchecked items: {}", join_items(.0))]
    UncheckedItems(Vec<ItemRef>),

    #[error("nothing to return: every item is checked")]
    NothingFlagged,

    #[error("field {0} needs a linked quote before it can be verified")]
    QuoteRequired(String),

    #[error("field {0} needs a linked quote citing a source with a url")]
    SourceRequired(String),

    #[error("cannot publish with unverified fields: {}", .0.join(", "))]
    UnverifiedFields(Vec<String>),

    #[error("invalid value for {slug}: {message}")]
    InvalidValue { slug: String, message: String },

    #[error("suggestion is {0} and no longer open")]
    SuggestionClosed(String),

    #[error("a suggestion needs at least one change")]
    EmptySuggestion,
}

fn join_items(items: &[ItemRef]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::Record(e) => e.kind(),
            WorkflowError::NotPermitted { .. }
            | WorkflowError::WrongProject
            | WorkflowError::SameReviewer
            | WorkflowError::SameValidator
            | WorkflowError::SelfReview => ErrorKind::Permission,
            WorkflowError::WrongStage { .. }
            | WorkflowError::UnverifiedFields(_)
            | WorkflowError::SuggestionClosed(_) => ErrorKind::State,
            _ => ErrorKind::Validation,
        }
    }
}
