//! Tagged encodings for the domain types JSON has no native form for.
//!
//! A special object is persisted as a JSON object carrying
//! [`CLASS_TAG_KEY`] plus its own fields. The registry maps each tag to
//! the [`ClassCodec`] that writes and reads those fields.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use super::codec::JsonCodec;
use crate::failure::Failure;
use crate::flatten::CapturedValue;
use crate::level::LogLevel;
use crate::value::Value;

/// Key that marks a JSON object as a tagged special object.
pub const CLASS_TAG_KEY: &str = "__class_uuid__";
/// Tag of [`LogLevel`] values.
pub const LEVEL_TAG: &str = "02E59486-F24D-46AD-8224-3ACDF2A5732A";
/// Tag of [`Failure`] values.
pub const FAILURE_TAG: &str = "E76887E2-20ED-49BF-A8F8-BA25CC586F2D";
/// Tag of [`CapturedValue`] values.
pub const CAPTURED_TAG: &str = "8A5E2F4B-3C1D-4E7A-9B60-D2C4F1E8A357";

/// Encoder/decoder pair for one tagged type.
pub trait ClassCodec: Send + Sync {
    /// The tag stored under [`CLASS_TAG_KEY`].
    fn tag(&self) -> &str;

    /// Fields for `value`, or `None` if this codec does not handle it.
    fn encode(&self, value: &Value, codec: &JsonCodec) -> Option<Map<String, JsonValue>>;

    /// Rebuild a value from its fields. `None` means the fields are malformed.
    fn decode(&self, fields: &Map<String, JsonValue>, codec: &JsonCodec) -> Option<Value>;
}

/// Tag to codec lookup. [`Default`] holds the built-in codecs.
#[derive(Clone)]
pub struct ClassRegistry {
    codecs: BTreeMap<String, Arc<dyn ClassCodec>>,
}

impl ClassRegistry {
    /// A registry with no codecs at all.
    pub fn empty() -> Self {
        Self {
            codecs: BTreeMap::new(),
        }
    }

    /// Add a codec, replacing any codec with the same tag.
    pub fn register<C: ClassCodec + 'static>(&mut self, codec: C) -> &mut Self {
        self.codecs.insert(codec.tag().to_string(), Arc::new(codec));
        self
    }

    pub fn get(&self, tag: &str) -> Option<&dyn ClassCodec> {
        self.codecs.get(tag).map(|c| c.as_ref())
    }

    /// Tags in lookup order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.codecs.keys().map(String::as_str)
    }

    /// Encode with the first codec that accepts `value`, tag included.
    pub(crate) fn encode(&self, value: &Value, codec: &JsonCodec) -> Option<JsonValue> {
        self.codecs.values().find_map(|class| {
            let mut fields = class.encode(value, codec)?;
            fields.insert(
                CLASS_TAG_KEY.to_string(),
                JsonValue::String(class.tag().to_string()),
            );
            Some(JsonValue::Object(fields))
        })
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(LevelCodec)
            .register(FailureCodec)
            .register(CapturedCodec);
        registry
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.tags()).finish()
    }
}

struct LevelCodec;

impl ClassCodec for LevelCodec {
    fn tag(&self) -> &str {
        LEVEL_TAG
    }

    fn encode(&self, value: &Value, _: &JsonCodec) -> Option<Map<String, JsonValue>> {
        let level = value.as_level()?;
        let mut fields = Map::new();
        fields.insert("name".into(), level.name().into());
        Some(fields)
    }

    fn decode(&self, fields: &Map<String, JsonValue>, _: &JsonCodec) -> Option<Value> {
        let name = fields.get("name")?.as_str()?;
        LogLevel::from_name(name).map(Value::Level)
    }
}

struct FailureCodec;

fn encode_failure(failure: &Failure) -> Map<String, JsonValue> {
    let mut fields = Map::new();
    fields.insert("type".into(), failure.type_name.clone().into());
    fields.insert("message".into(), failure.message.clone().into());
    fields.insert("parents".into(), failure.parents.clone().into());
    fields.insert("frames".into(), failure.frames.clone().into());
    let cause = match &failure.cause {
        Some(cause) => {
            let mut nested = encode_failure(cause);
            nested.insert(CLASS_TAG_KEY.into(), FAILURE_TAG.into());
            JsonValue::Object(nested)
        }
        None => JsonValue::Null,
    };
    fields.insert("cause".into(), cause);
    fields
}

fn strings(value: Option<&JsonValue>) -> Option<Vec<String>> {
    match value {
        None | Some(JsonValue::Null) => Some(Vec::new()),
        Some(JsonValue::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        Some(_) => None,
    }
}

impl ClassCodec for FailureCodec {
    fn tag(&self) -> &str {
        FAILURE_TAG
    }

    fn encode(&self, value: &Value, _: &JsonCodec) -> Option<Map<String, JsonValue>> {
        value.as_failure().map(encode_failure)
    }

    fn decode(&self, fields: &Map<String, JsonValue>, codec: &JsonCodec) -> Option<Value> {
        let type_name = fields.get("type")?.as_str()?;
        let message = fields.get("message")?.as_str()?;
        let mut failure = Failure::new(type_name, message)
            .with_parents(strings(fields.get("parents"))?)
            .with_frames(strings(fields.get("frames"))?);
        match fields.get("cause") {
            None | Some(JsonValue::Null) => {}
            Some(cause) => match codec.decode_value(cause) {
                Value::Failure(cause) => failure = failure.with_cause(cause),
                _ => return None,
            },
        }
        Some(Value::Failure(failure))
    }
}

struct CapturedCodec;

fn optional_text(value: Option<&JsonValue>) -> Option<Option<String>> {
    match value {
        None | Some(JsonValue::Null) => Some(None),
        Some(JsonValue::String(s)) => Some(Some(s.clone())),
        Some(_) => None,
    }
}

impl ClassCodec for CapturedCodec {
    fn tag(&self) -> &str {
        CAPTURED_TAG
    }

    fn encode(&self, value: &Value, codec: &JsonCodec) -> Option<Map<String, JsonValue>> {
        let captured = value.as_captured()?;
        let mut fields = Map::new();
        fields.insert("value".into(), codec.encode_value(&captured.value));
        fields.insert("str".into(), captured.text.clone().into());
        fields.insert("repr".into(), captured.repr.clone().into());
        Some(fields)
    }

    fn decode(&self, fields: &Map<String, JsonValue>, codec: &JsonCodec) -> Option<Value> {
        let value = fields
            .get("value")
            .map_or(Value::Null, |v| codec.decode_value(v));
        Some(Value::Captured(Box::new(CapturedValue {
            value,
            text: optional_text(fields.get("str"))?,
            repr: optional_text(fields.get("repr"))?,
        })))
    }
}
