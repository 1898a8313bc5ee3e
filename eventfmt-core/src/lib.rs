//! eventfmt-core: crash-proof structured event formatting and persistence
//!
//! Producers log events: key/value mappings with an optional format
//! template such as `"{user} logged in from {addr!r}"`. This library turns
//! those events into text and into durable JSON, and guarantees that no
//! value inside an event can make either step fail.
//!
//! # Features
//!
//! - **Template parsing**: `{name!conversion:spec}` fields, dotted and
//!   indexed paths, and `{name()}` call fields
//! - **Flattening**: freeze every field's value, `str` and `repr` before
//!   the live objects can change or go away
//! - **Total formatting**: render any event; failures become diagnostics
//! - **Classic log lines**: `"{time} [{namespace}#{level}] {message}"`
//! - **JSON codec**: placeholders for unpersistable values, tagged
//!   encodings for levels, failures and captures, open registry
//! - **JSON-lines files**: record-separator framing, truncation recovery,
//!   parallel decoding
//!
//! # Quick Start
//!
//! ```
//! use eventfmt_core::prelude::*;
//!
//! let mut event = Event::with_format("{user} logged in")
//!     .with("user", "ada")
//!     .with(LOG_LEVEL, LogLevel::Info);
//!
//! let line = event_as_json(&mut event);
//! let restored = event_from_json(&line).unwrap();
//! assert_eq!(format_event(&restored), "ada logged in");
//! ```
//!
//! # Module Organization
//!
//! - [`value`]: dynamic values and the [`LogObject`] host-object trait
//! - [`event`]: the event mapping and its reserved keys
//! - [`template`]: template parser, key derivation, format specs
//! - [`resolve`]: attribute/item traversal and calls
//! - [`extract`]: field extraction from live or flattened events
//! - [`flatten`]: capturing field snapshots
//! - [`format`]: message, classic line, and configurable text rendering
//! - [`time`]: timestamp rendering
//! - [`json`]: JSON codec, class registry, JSON-lines files
//! - [`error`]: typed error handling
//!
//! # Cargo Features
//!
//! - `files` (default): JSON-lines log files and log file discovery

pub mod config;
pub mod error;
pub mod event;
pub mod extract;
pub mod failure;
pub mod filter;
pub mod flatten;
pub mod format;
pub mod json;
pub mod level;
pub mod logging;
pub mod prelude;
pub mod resolve;
#[cfg(feature = "files")]
pub mod scan;
pub mod template;
pub mod time;
pub mod value;

// ============================================================================
// Explicit Re-exports
// ============================================================================

// Error types
pub use error::{
    CodecError, EventfmtError, EventfmtResult, FormatError, IoResultExt, ObjectError,
    RecordError, TemplateSyntaxError,
};

// Data model
pub use event::{
    Event, Key, LOG_FAILURE, LOG_FLATTENED, LOG_FORMAT, LOG_LEVEL, LOG_NAMESPACE, LOG_SYSTEM,
    LOG_TIME,
};
pub use failure::Failure;
pub use flatten::CapturedValue;
pub use level::LogLevel;
pub use value::{guarded, LogObject, Value, UNPERSISTABLE};

// Templates
pub use template::{
    base_key, format_text, format_value, parse_template, template_fields, Conversion,
    FieldRef, FormatSpec, KeyFlattener, Segment, TemplateParser,
};

// Resolution and extraction
pub use extract::{extract_field, extract_field_with};
pub use resolve::{DynamicResolver, FieldPath, PathSegment, Resolver};

// Flattening
pub use flatten::{flatten_event, flatten_event_with};

// Formatting
pub use format::{
    classic_log_text, event_as_text, format_event, format_event_as_classic_log_text,
    format_unformattable_event, format_with_call, TextOptions, UNFORMATTABLE,
};
pub use time::{format_time, format_time_in, DEFAULT_TIME_FORMAT};

// JSON
pub use json::{
    event_as_json, event_from_json, ClassCodec, ClassRegistry, JsonCodec, CAPTURED_TAG,
    CLASS_TAG_KEY, FAILURE_TAG, LEVEL_TAG,
};
#[cfg(feature = "files")]
pub use json::{
    decode_records, events_from_json_log, split_records, JsonLogReader, JsonLogWriter,
    RECORD_SEPARATOR,
};

// Filtering
pub use filter::EventFilter;

// Configuration
pub use config::{load_config, EventfmtConfig, InputConfig, OutputConfig, TimeConfig};

// Logging
pub use logging::{init_structured_logging, log_file_summary, log_unreadable};

// File discovery
#[cfg(feature = "files")]
pub use scan::{gather_log_files, LOG_EXTENSIONS};

#[cfg(test)]
mod tests;
