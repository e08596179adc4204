//! Attest service boundary.
//!
//! [`AttestService`] ties the schema registry, evidence store, workflow
//! engine, audit subsystem and quota governor to a [`Store`] backend. Every
//! mutating call takes an explicit [`Actor`] and runs its checks inside the
//! backend's write transaction, so two-person and balance rules are judged
//! against the latest committed state.
//!
//! [`Store`]: attest_store::Store
//! [`Actor`]: attest_types::Actor

pub mod audit;
pub mod config;
pub mod error;
pub mod evidence;
pub mod quota;
pub mod records;
pub mod schema;
pub mod service;

pub use config::{ServiceConfig, WorkflowConfig};
pub use error::ServiceError;
pub use evidence::{NewQuote, NewSource};
pub use service::AttestService;
