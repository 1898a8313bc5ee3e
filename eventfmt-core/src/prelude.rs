//! Prelude module for convenient imports.
//!
//! ```rust
//! use eventfmt_core::prelude::*;
//! ```
//!
//! Brings in the event model and the four entry points (flatten, format,
//! encode, decode) without the lower-level template and codec pieces.

// Data model
pub use crate::event::{
    Event, Key, LOG_FAILURE, LOG_FORMAT, LOG_LEVEL, LOG_NAMESPACE, LOG_SYSTEM, LOG_TIME,
};
pub use crate::failure::Failure;
pub use crate::level::LogLevel;
pub use crate::value::{LogObject, Value};

// Errors
pub use crate::error::{EventfmtError, EventfmtResult, FormatError, ObjectError};

// Entry points
pub use crate::extract::extract_field;
pub use crate::flatten::flatten_event;
pub use crate::format::{classic_log_text, event_as_text, format_event, TextOptions};
pub use crate::json::{event_as_json, event_from_json, JsonCodec};

// Log files
#[cfg(feature = "files")]
pub use crate::json::{events_from_json_log, JsonLogWriter};
#[cfg(feature = "files")]
pub use crate::scan::gather_log_files;
