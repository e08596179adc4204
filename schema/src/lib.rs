//! Schema registry for attest record types.
//!
//! A project owns record types; each record type owns a set of field
//! definitions and optional groups. Field configuration is a closed tagged
//! union keyed by field type, so an unknown type or a config that does not
//! match its type is rejected when the schema is written, never at render
//! time.
//!
//! The one non-trivial algorithm here is conditional visibility
//! ([`visibility`]): a field may carry a `show_when` rule evaluated against
//! the in-progress record data. Hidden fields are excluded from both
//! rendering and required-field validation.

pub mod error;
pub mod field;
pub mod record_type;
pub mod registry;
pub mod validate;
pub mod value;
pub mod visibility;

pub use error::{FieldProblem, SchemaError};
pub use field::{
    ChoiceConfig, ChoiceOption, DateConfig, DisplayMode, FieldDefinition, FieldKind, FieldType,
    FieldWidth, LocationConfig, NoConfig, NumberConfig, PersonConfig, TextConfig, Visibility,
};
pub use record_type::{FieldGroup, Project, RecordType};
pub use registry::SchemaRegistry;
pub use validate::validate_submission;
pub use value::{is_empty_value, unwrap_composite, RecordData};
pub use visibility::{ConditionOperator, ShowWhen};
