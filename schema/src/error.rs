use attest_types::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single problem with one field of a submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldProblem {
    pub slug: String,
    pub message: String,
}

impl FieldProblem {
    pub fn new(slug: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.slug, self.message)
    }
}

fn join_problems(problems: &[FieldProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid field slug {0:?}: use lowercase letters, digits and underscores")]
    InvalidSlug(String),

    #[error("field {0} already exists in this record type")]
    DuplicateSlug(String),

    #[error("field {0} not found")]
    FieldNotFound(String),

    #[error("field slug is immutable: cannot rename {from} to {to}")]
    SlugImmutable { from: String, to: String },

    #[error("field group {0} does not belong to this record type")]
    ForeignGroup(u64),

    #[error("field group {0} not found")]
    GroupNotFound(u64),

    #[error("invalid config for field {slug}: {reason}")]
    InvalidConfig { slug: String, reason: String },

    #[error("show_when on {slug} references unknown field {target}")]
    UnknownDependency { slug: String, target: String },

    #[error("field {slug} is referenced by the show_when rule of {dependent}")]
    FieldReferenced { slug: String, dependent: String },

    #[error("record type {0} not found")]
    RecordTypeNotFound(String),

    #[error("submission is invalid: {}", join_problems(.0))]
    InvalidSubmission(Vec<FieldProblem>),
}

impl SchemaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchemaError::FieldNotFound(_)
            | SchemaError::GroupNotFound(_)
            | SchemaError::RecordTypeNotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Validation,
        }
    }
}
