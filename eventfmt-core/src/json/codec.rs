//! Event to JSON and back.

use serde_json::{Map, Number, Value as JsonValue};

use super::registry::{ClassRegistry, CLASS_TAG_KEY};
use crate::error::CodecError;
use crate::event::{Event, Key};
use crate::flatten::flatten_event;
use crate::value::{float_repr, Value};

/// JSON encoder/decoder bound to a [`ClassRegistry`].
#[derive(Debug, Clone, Default)]
pub struct JsonCodec {
    registry: ClassRegistry,
}

impl JsonCodec {
    /// Codec with the built-in special types.
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec with a caller-built registry.
    pub fn with_registry(registry: ClassRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Encode one value. Never fails: anything without a JSON form
    /// becomes the unpersistable placeholder.
    pub fn encode_value(&self, value: &Value) -> JsonValue {
        match value {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::Number((*i).into()),
            Value::Float(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or_else(|| self.encode_value(&Value::unpersistable())),
            Value::Str(s) => JsonValue::String(s.clone()),
            // latin-1: one code point per byte, so every byte survives
            Value::Bytes(bytes) => JsonValue::String(bytes.iter().map(|&b| char::from(b)).collect()),
            Value::List(items) => {
                JsonValue::Array(items.iter().map(|v| self.encode_value(v)).collect())
            }
            Value::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.encode_value(v)))
                    .collect(),
            ),
            special => self
                .registry
                .encode(special, self)
                .unwrap_or_else(|| self.encode_value(&Value::unpersistable())),
        }
    }

    /// Decode one value. Tagged objects with an unknown tag or malformed
    /// fields become [`Value::Null`].
    pub fn decode_value(&self, json: &JsonValue) -> Value {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Value::Str(s.clone()),
            JsonValue::Array(items) => {
                Value::List(items.iter().map(|v| self.decode_value(v)).collect())
            }
            JsonValue::Object(fields) => match fields.get(CLASS_TAG_KEY) {
                Some(tag) => tag
                    .as_str()
                    .and_then(|tag| self.registry.get(tag))
                    .and_then(|class| class.decode(fields, self))
                    .unwrap_or(Value::Null),
                None => Value::Map(
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), self.decode_value(v)))
                        .collect(),
                ),
            },
        }
    }

    /// Encode an event as it stands, without flattening.
    ///
    /// Non-string keys that have a JSON text form (numbers, booleans,
    /// null) are stored under that text; other keys are dropped.
    pub fn encode_event(&self, event: &Event) -> JsonValue {
        let mut object = Map::with_capacity(event.len());
        for (key, value) in event.iter() {
            if let Some(key) = json_key(key) {
                object.insert(key, self.encode_value(value));
            }
        }
        JsonValue::Object(object)
    }

    /// Flatten `event`, then render it as one line of JSON.
    pub fn event_as_json(&self, event: &mut Event) -> String {
        flatten_event(event);
        self.encode_event(event).to_string()
    }

    /// Parse one JSON document into an event.
    pub fn event_from_json(&self, text: &str) -> Result<Event, CodecError> {
        let json: JsonValue = serde_json::from_str(text)?;
        self.decode_event(&json)
    }

    /// Decode an already-parsed document; its top level must be an object.
    pub fn decode_event(&self, json: &JsonValue) -> Result<Event, CodecError> {
        let JsonValue::Object(fields) = json else {
            return Err(CodecError::NotAnObject(json_kind(json)));
        };
        Ok(fields
            .iter()
            .map(|(k, v)| (k.as_str(), self.decode_value(v)))
            .collect())
    }
}

fn json_key(key: &Key) -> Option<String> {
    match key {
        Key::Name(name) => Some(name.clone()),
        Key::Value(Value::Int(i)) => Some(i.to_string()),
        Key::Value(Value::Float(f)) if f.is_finite() => Some(float_repr(*f)),
        Key::Value(Value::Bool(b)) => Some(b.to_string()),
        Key::Value(Value::Null) => Some("null".to_string()),
        Key::Value(_) => None,
    }
}

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
