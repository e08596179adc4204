//! Records under verification.
//!
//! A record holds a free-form data payload keyed by field slug, its
//! lifecycle status, and a map of which fields have been marked verified and
//! by whom. Status changes are made by the workflow engine; this crate only
//! knows which changes the transition graph allows.

pub mod error;
pub mod item;
pub mod record;
pub mod status;
pub mod suggestion;

pub use error::RecordError;
pub use item::ItemRef;
pub use record::{
    FieldVerification, FlaggedIssue, Record, Rejection, ReviewStamp, Submitter, Transition,
    TransitionKind,
};
pub use status::RecordStatus;
pub use suggestion::{EditSuggestion, SuggestionStatus};
