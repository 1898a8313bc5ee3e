//! Capturing live field values before they can change.
//!
//! Flattening walks the template once, resolves every field against the
//! live event, and stores a [`CapturedValue`] under the field's derived
//! key. From then on the formatter and the JSON codec only read those
//! snapshots, so a value that mutates, disappears, or cannot be
//! serialized still renders the way it did when the event was logged.

use tracing::debug;

use crate::event::{Event, LOG_FLATTENED};
use crate::extract::resolve_live;
use crate::resolve::{DynamicResolver, Resolver};
use crate::template::{parse_template, Conversion, KeyFlattener, Segment};
use crate::value::Value;

/// A field value frozen at flatten time.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedValue {
    /// Persistable form of the resolved value; anything JSON cannot hold
    /// is already the unpersistable placeholder.
    pub value: Value,
    /// `str` snapshot, `None` if rendering failed.
    pub text: Option<String>,
    /// `repr` snapshot, `None` if rendering failed.
    pub repr: Option<String>,
}

impl CapturedValue {
    /// Snapshot `value` now. Rendering failures leave the snapshot empty.
    pub fn capture(value: &Value) -> Self {
        Self {
            value: value.persistable(),
            text: value.to_text().ok(),
            repr: value.repr().ok(),
        }
    }

    /// The snapshot a conversion reads: `repr` for `!r`, `str` otherwise.
    pub fn snapshot(&self, conversion: Conversion) -> Option<&str> {
        match conversion {
            Conversion::Repr => self.repr.as_deref(),
            Conversion::None | Conversion::Str => self.text.as_deref(),
        }
    }
}

/// Flatten `event` in place.
///
/// Does nothing when the event is already flattened, has no usable
/// template, or the template has no fields. A field that cannot be
/// resolved is left uncaptured; formatting will report it later.
///
/// # Example
///
/// ```
/// use eventfmt_core::{flatten_event, format_event, Event};
///
/// let mut event = Event::with_format("{n!r}").with("n", "x");
/// flatten_event(&mut event);
/// assert!(event.is_flattened());
/// event.remove("n");
/// assert_eq!(format_event(&event), "'x'");
/// ```
pub fn flatten_event(event: &mut Event) {
    flatten_event_with(event, &DynamicResolver)
}

/// [`flatten_event`] with a caller-supplied [`Resolver`].
pub fn flatten_event_with(event: &mut Event, resolver: &dyn Resolver) {
    if event.is_flattened() {
        return;
    }
    let template = match event.template() {
        Ok(Some(template)) => template,
        Ok(None) => return,
        Err(err) => {
            debug!(error = %err, "not flattening event with unusable format");
            return;
        }
    };

    let segments = match parse_template(&template).collect::<Result<Vec<Segment>, _>>() {
        Ok(segments) => segments,
        Err(err) => {
            debug!(error = %err, "not flattening event with malformed format");
            return;
        }
    };
    let fields: Vec<_> = segments.into_iter().filter_map(|s| s.field).collect();
    if fields.is_empty() {
        return;
    }

    let mut keys = KeyFlattener::new();
    let mut captures = Vec::with_capacity(fields.len());
    for field in &fields {
        let key = keys.key_for(field);
        if event.get(&key).and_then(Value::as_captured).is_some() {
            continue;
        }
        match resolve_live(field, event, resolver) {
            Ok(value) => captures.push((key, CapturedValue::capture(&value))),
            Err(err) => debug!(field = %field.name, error = %err, "field not captured"),
        }
    }

    for (key, captured) in captures {
        event.insert(key, Value::Captured(Box::new(captured)));
    }
    event.insert(LOG_FLATTENED, true);
}
