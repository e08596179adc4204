//! Verification workflow engine.
//!
//! Moves a record from submission through two-person review and two-person
//! validation to publication (`verified`) or rejection. Every transition is
//! all-or-nothing: the engine works on a copy of the record and only writes
//! it back once every check has passed.
//!
//! The engine also owns field-level verification (a field may only be marked
//! verified when its quote requirements are met), the publish gate, and the
//! lighter edit-suggestion sub-flow for records that are already published.

pub mod action;
pub mod checklist;
pub mod engine;
pub mod error;
pub mod suggestions;

pub use action::{Action, SuggestionDecision};
pub use checklist::{Check, ValidationChecklist};
pub use engine::{TransitionReport, WorkflowEngine, WorkflowPolicy};
pub use error::WorkflowError;
pub use suggestions::SuggestionReport;
