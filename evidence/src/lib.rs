//! Evidence attached to a record: quotes, sources, and quote→field links.
//!
//! Links are many-to-many: a quote may support several fields and a field
//! may be supported by several quotes. The link set lives on the quote, so
//! deleting a quote can never leave a dangling link behind.

pub mod error;
pub mod quote;
pub mod set;
pub mod source;

pub use error::EvidenceError;
pub use quote::Quote;
pub use set::{EvidenceSet, SourceDetached};
pub use source::{Source, SourceType};
