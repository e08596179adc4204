use attest_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("field {0} is not part of this record type")]
    UnknownField(String),

    #[error("record is {0} and can no longer be edited")]
    NotEditable(String),

    #[error("illegal status change from {from} to {to}")]
    IllegalTransition { from: String, to: String },

    #[error("guest submitter needs a name")]
    AnonymousGuest,
}

impl RecordError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecordError::UnknownField(_) | RecordError::AnonymousGuest => ErrorKind::Validation,
            RecordError::NotEditable(_) | RecordError::IllegalTransition { .. } => ErrorKind::State,
        }
    }
}
