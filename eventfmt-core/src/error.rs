//! Typed error handling for eventfmt.
//!
//! Errors here never escape the four total entry points (flatten, format,
//! encode, decode content); they are what those entry points downgrade into
//! diagnostic text or placeholders. Callers that use the lower-level pieces
//! directly (the template parser, `extract_field`, the spec formatter) get
//! them as ordinary `Result`s.

use std::path::PathBuf;
use thiserror::Error;

/// A malformed replacement field in a format template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateSyntaxError {
    /// A lone `}` outside of a replacement field.
    #[error("Single '}}' encountered in format string")]
    UnmatchedClose,

    /// A `{` that is never closed.
    #[error("expected '}}' before end of string")]
    Unterminated,

    /// `!x` followed by something other than `:` or `}`.
    #[error("expected ':' after conversion specifier")]
    ConversionNotTerminated,

    /// A conversion character other than `s` or `r`.
    #[error("Unknown conversion specifier {0}")]
    UnknownConversion(char),

    /// A `{` inside a field name.
    #[error("unexpected '{{' in field name")]
    UnexpectedBrace,

    /// An unterminated `[` inside a field name.
    #[error("Missing ']' in format string")]
    UnterminatedIndex,
}

/// Failure raised by a live host object while it is being rendered,
/// traversed, or called.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectError {
    /// The object does not expose the requested attribute.
    #[error("'{type_name}' object has no attribute '{attribute}'")]
    NoAttribute {
        type_name: String,
        attribute: String,
    },

    /// The object is not callable.
    #[error("'{0}' object is not callable")]
    NotCallable(String),

    /// The object's own code reported a failure.
    #[error("{type_name}: {message}")]
    Raised { type_name: String, message: String },

    /// The object's code panicked; the panic was contained.
    #[error("panic in '{type_name}': {message}")]
    Panicked { type_name: String, message: String },
}

impl ObjectError {
    /// An error raised by host code, named like an exception type.
    pub fn raised(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Raised {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Missing attribute on an object of the given type.
    pub fn no_attribute(type_name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::NoAttribute {
            type_name: type_name.into(),
            attribute: attribute.into(),
        }
    }
}

/// Anything that can go wrong while rendering one event.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    /// The template could not be parsed.
    #[error(transparent)]
    Syntax(#[from] TemplateSyntaxError),

    /// `log_format` held something other than text or bytes.
    #[error("Log format must be unicode or bytes, not {0}")]
    FormatType(String),

    /// A bytes template was not valid UTF-8.
    #[error("'utf-8' codec can't decode format bytes: {0}")]
    Decode(String),

    /// The first segment of a field path is not in the event.
    #[error("KeyError: '{0}'")]
    KeyNotFound(String),

    /// Index into a list was out of range, or the container was not indexable.
    #[error("IndexError: {0}")]
    Index(String),

    /// A live object failed while being traversed, called, or rendered.
    #[error(transparent)]
    Object(#[from] ObjectError),

    /// A format spec could not be parsed or applied to the value.
    #[error("ValueError: {0}")]
    Spec(String),

    /// A value that needed a snapshot was captured without one.
    #[error("captured field '{0}' has no usable snapshot")]
    MissingSnapshot(String),
}

impl FormatError {
    /// Build a spec error from any message.
    pub fn spec(message: impl Into<String>) -> Self {
        Self::Spec(message.into())
    }
}

/// JSON decoding failures that are not about event content.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The text is not JSON at all.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document parsed, but its top level is not an object.
    #[error("JSON event must be an object, got {0}")]
    NotAnObject(&'static str),
}

/// Why one persisted log record was skipped.
#[derive(Error, Debug)]
pub enum RecordError {
    /// A record-separator record that does not end in a newline.
    #[error("Unable to read truncated JSON record")]
    Truncated,

    /// The record bytes are not UTF-8.
    #[error("Unable to decode UTF-8 for JSON record: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),

    /// The record is not a JSON object.
    #[error("Unable to read JSON record: {0}")]
    Codec(#[from] CodecError),
}

/// Main error type for eventfmt operations that touch the outside world.
#[derive(Error, Debug)]
pub enum EventfmtError {
    /// I/O error when reading/writing files
    #[error("I/O error at {path}: {message}")]
    Io {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Invalid argument provided
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl EventfmtError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Get the path associated with this error, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::InvalidArgument { .. } => None,
        }
    }
}

/// Convenience type alias for eventfmt results.
pub type EventfmtResult<T> = Result<T, EventfmtError>;

/// Extension trait for converting std::io::Error with path context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    fn with_path(self, path: impl Into<PathBuf>) -> EventfmtResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> EventfmtResult<T> {
        self.map_err(|e| EventfmtError::io(path, e))
    }
}
