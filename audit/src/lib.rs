//! Third-party audit subsystem.
//!
//! An optional, independent verification pass over a record that is already
//! published. Audits never change the record's status; they only add
//! results, from which the record's verification level is derived.

pub mod engine;
pub mod error;
pub mod level;
pub mod request;

pub use engine::{AuditEngine, ResultInput};
pub use error::AuditError;
pub use level::{verification_level, VerificationLevel};
pub use request::{
    AuditOutcome, AuditPriority, AuditScope, RequestRejection, RequestStatus, Revocation,
    VerificationRequest, VerificationResult,
};
