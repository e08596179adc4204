//! Logging and formatting helpers shared by the Attest service and CLI.

pub mod logging;
pub mod time;

pub use logging::{init_logging, LogFormat, UnknownLogFormat};
pub use time::{format_duration, format_until};
