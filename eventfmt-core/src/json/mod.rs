//! JSON persistence of events.
//!
//! - [`codec`]: value and event encoding with placeholders
//! - [`registry`]: tagged encodings for levels, failures, captures
//! - `file`: JSON-lines log files (feature `files`)

pub mod codec;
#[cfg(feature = "files")]
pub mod file;
pub mod registry;

pub use codec::JsonCodec;
#[cfg(feature = "files")]
pub use file::{
    decode_records, events_from_json_log, split_records, JsonLogReader, JsonLogWriter,
    RECORD_SEPARATOR,
};
pub use registry::{
    ClassCodec, ClassRegistry, CAPTURED_TAG, CLASS_TAG_KEY, FAILURE_TAG, LEVEL_TAG,
};

use crate::error::CodecError;
use crate::event::Event;

/// Flatten `event` and encode it as one line of JSON with the built-in
/// codec.
///
/// # Example
///
/// ```
/// use eventfmt_core::{event_as_json, event_from_json, format_event, Event};
///
/// let mut event = Event::with_format("{who} says hi").with("who", "ada");
/// let line = event_as_json(&mut event);
/// let restored = event_from_json(&line).unwrap();
/// assert_eq!(format_event(&restored), "ada says hi");
/// ```
pub fn event_as_json(event: &mut Event) -> String {
    JsonCodec::new().event_as_json(event)
}

/// Decode one JSON document with the built-in codec.
pub fn event_from_json(text: &str) -> Result<Event, CodecError> {
    JsonCodec::new().event_from_json(text)
}
