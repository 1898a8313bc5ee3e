//! The event mapping and its reserved keys.
//!
//! An [`Event`] is an ordered list of key/value pairs. Keys are usually
//! names, but producers may log arbitrary values as keys (`{1: 2}`), so a
//! key can also be a [`Value`]. Insertion order is kept for diagnostics;
//! equality ignores it.

use crate::error::{FormatError, ObjectError};
use crate::failure::Failure;
use crate::level::LogLevel;
use crate::value::{str_repr, Value};

/// Format template (text or UTF-8 bytes).
pub const LOG_FORMAT: &str = "log_format";
/// Event timestamp, seconds since the epoch.
pub const LOG_TIME: &str = "log_time";
/// Namespace of the logger that emitted the event.
pub const LOG_NAMESPACE: &str = "log_namespace";
/// [`LogLevel`] of the event.
pub const LOG_LEVEL: &str = "log_level";
/// Free-form system label; takes priority over namespace and level in text output.
pub const LOG_SYSTEM: &str = "log_system";
/// Marker set once the flattener has captured every field.
pub const LOG_FLATTENED: &str = "log_flattened";
/// Captured [`Failure`] for events logged from an error handler.
pub const LOG_FAILURE: &str = "log_failure";

/// Key of one event entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    /// An ordinary string key.
    Name(String),
    /// Any other value used as a key.
    Value(Value),
}

impl Key {
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Value(_) => None,
        }
    }

    /// Repr of the key.
    pub fn repr(&self) -> Result<String, ObjectError> {
        match self {
            Self::Name(name) => Ok(str_repr(name)),
            Self::Value(value) => value.repr(),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Value> for Key {
    fn from(value: Value) -> Self {
        match value {
            Value::Str(name) => Self::Name(name),
            other => Self::Value(other),
        }
    }
}

/// A structured log event.
#[derive(Debug, Clone, Default)]
pub struct Event {
    entries: Vec<(Key, Value)>,
}

impl Event {
    /// Empty event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Event with just a format template.
    pub fn with_format(format: impl Into<Value>) -> Self {
        Self::new().with(LOG_FORMAT, format)
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<Key>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace. Replacing keeps the original position.
    pub fn insert(&mut self, key: impl Into<Key>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Look up a named entry.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_name() == Some(name))
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove a named entry, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self
            .entries
            .iter()
            .position(|(k, _)| k.as_name() == Some(name))?;
        Some(self.entries.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// The raw `log_format` value, whatever its type.
    pub fn format(&self) -> Option<&Value> {
        self.get(LOG_FORMAT)
    }

    /// The template as text.
    ///
    /// `Ok(None)` when there is no `log_format`. Bytes must be UTF-8; any
    /// other type is an error.
    pub fn template(&self) -> Result<Option<String>, FormatError> {
        match self.format() {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(Value::Bytes(b)) => String::from_utf8(b.clone())
                .map(Some)
                .map_err(|e| FormatError::Decode(e.utf8_error().to_string())),
            Some(other) => Err(FormatError::FormatType(other.type_name().to_string())),
        }
    }

    /// `log_time` as seconds, if it is numeric.
    pub fn time(&self) -> Option<f64> {
        self.get(LOG_TIME).and_then(Value::as_f64)
    }

    pub fn namespace(&self) -> Option<&Value> {
        self.get(LOG_NAMESPACE)
    }

    /// `log_level`, if it holds a known level.
    pub fn level(&self) -> Option<LogLevel> {
        self.get(LOG_LEVEL).and_then(Value::as_level)
    }

    pub fn system(&self) -> Option<&Value> {
        self.get(LOG_SYSTEM)
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.get(LOG_FAILURE).and_then(Value::as_failure)
    }

    /// Has the flattener already run on this event?
    pub fn is_flattened(&self) -> bool {
        matches!(self.get(LOG_FLATTENED), Some(Value::Bool(true)))
    }

    /// Dict-style dump of the whole event. Fails if any key or value does.
    pub fn repr(&self) -> Result<String, ObjectError> {
        let parts = self
            .entries
            .iter()
            .map(|(k, v)| Ok(format!("{}: {}", k.repr()?, v.repr()?)))
            .collect::<Result<Vec<_>, ObjectError>>()?;
        Ok(format!("{{{}}}", parts.join(", ")))
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().all(|(key, value)| {
                other
                    .entries
                    .iter()
                    .any(|(k, v)| k == key && v == value)
            })
    }
}

impl<K, V> FromIterator<(K, V)> for Event
where
    K: Into<Key>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut event = Event::new();
        for (k, v) in iter {
            event.insert(k, v);
        }
        event
    }
}
