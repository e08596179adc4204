//! Fundamental types for the attest verification core.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! identifiers, timestamps and clocks, roles and actors, and the error taxonomy
//! that every domain error maps onto.

pub mod actor;
pub mod error;
pub mod ids;
pub mod time;

pub use actor::{Actor, Role, RoleProvider};
pub use error::{ErrorKind, TypesError};
pub use ids::{
    EditSuggestionId, FieldGroupId, ProjectId, QuoteId, RecordId, RecordTypeId, RequestId,
    ResultId, SourceId, TransactionId, UsageId, UserId,
};
pub use time::{Clock, SystemClock, Timestamp};
