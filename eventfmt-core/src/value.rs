//! Dynamic values carried by events.
//!
//! Events hold arbitrary producer data, so every value is a [`Value`]:
//! JSON-native data, the special domain types the codec knows how to
//! persist ([`LogLevel`], [`Failure`], [`CapturedValue`]), and live host
//! objects behind the [`LogObject`] trait. Live objects are the only part
//! of the model that can misbehave; every call into one goes through
//! [`guarded`] so a panic in host code becomes an [`ObjectError`].

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::ObjectError;
use crate::failure::Failure;
use crate::flatten::CapturedValue;
use crate::level::LogLevel;

/// Key of the unpersistable placeholder map.
pub const UNPERSISTABLE: &str = "unpersistable";

/// A live host object that can be rendered, traversed, and called.
///
/// Only `type_name` and `repr` are required. `to_text` falls back to
/// `repr`, and objects without attributes or call semantics keep the
/// default error-returning implementations.
pub trait LogObject: Send + Sync {
    /// Name of the object's type, used in error messages.
    fn type_name(&self) -> &str;

    /// Debugging representation of the object.
    fn repr(&self) -> Result<String, ObjectError>;

    /// Human-readable text of the object.
    fn to_text(&self) -> Result<String, ObjectError> {
        self.repr()
    }

    /// Look up a named attribute.
    fn attribute(&self, name: &str) -> Result<Value, ObjectError> {
        Err(ObjectError::no_attribute(self.type_name(), name))
    }

    /// Call the object with no arguments.
    fn call(&self) -> Result<Value, ObjectError> {
        Err(ObjectError::NotCallable(self.type_name().to_string()))
    }
}

/// Closure wrapper behind [`Value::callable`].
struct FnObject<F> {
    func: F,
}

impl<F> LogObject for FnObject<F>
where
    F: Fn() -> Result<Value, ObjectError> + Send + Sync,
{
    fn type_name(&self) -> &str {
        "function"
    }

    fn repr(&self) -> Result<String, ObjectError> {
        Ok("<function>".to_string())
    }

    fn call(&self) -> Result<Value, ObjectError> {
        (self.func)()
    }
}

/// Run host object code, turning a panic into an [`ObjectError`].
pub fn guarded<T>(
    type_name: &str,
    f: impl FnOnce() -> Result<T, ObjectError>,
) -> Result<T, ObjectError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(ObjectError::Panicked {
            type_name: type_name.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Any value an event can carry.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Level(LogLevel),
    Failure(Failure),
    Captured(Box<CapturedValue>),
    Object(Arc<dyn LogObject>),
}

impl Value {
    /// Wrap a live host object.
    pub fn object<T: LogObject + 'static>(obj: T) -> Self {
        Self::Object(Arc::new(obj))
    }

    /// Wrap a zero-argument closure; `{name()}` in a template calls it.
    pub fn callable<F>(func: F) -> Self
    where
        F: Fn() -> Result<Value, ObjectError> + Send + Sync + 'static,
    {
        Self::object(FnObject { func })
    }

    /// Raw bytes.
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// The `{"unpersistable": true}` placeholder.
    pub fn unpersistable() -> Self {
        let mut map = BTreeMap::new();
        map.insert(UNPERSISTABLE.to_string(), Value::Bool(true));
        Self::Map(map)
    }

    /// Type name used in error messages.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "dict",
            Self::Level(_) => "LogLevel",
            Self::Failure(_) => "Failure",
            Self::Captured(_) => "CapturedValue",
            Self::Object(obj) => obj.type_name(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view used for timestamps.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_level(&self) -> Option<LogLevel> {
        match self {
            Self::Level(level) => Some(*level),
            _ => None,
        }
    }

    pub fn as_failure(&self) -> Option<&Failure> {
        match self {
            Self::Failure(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn as_captured(&self) -> Option<&CapturedValue> {
        match self {
            Self::Captured(captured) => Some(captured),
            _ => None,
        }
    }

    /// Can this value be written to JSON without a placeholder?
    pub fn is_persistable(&self) -> bool {
        match self {
            Self::Float(f) => f.is_finite(),
            Self::List(items) => items.iter().all(Value::is_persistable),
            Self::Map(map) => map.values().all(Value::is_persistable),
            Self::Object(_) => false,
            _ => true,
        }
    }

    /// Copy of this value with every unpersistable part replaced by the
    /// placeholder. Never touches live object state.
    pub fn persistable(&self) -> Value {
        match self {
            Self::Float(f) if !f.is_finite() => Value::unpersistable(),
            Self::List(items) => Self::List(items.iter().map(Value::persistable).collect()),
            Self::Map(map) => Self::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.persistable()))
                    .collect(),
            ),
            Self::Object(_) => Value::unpersistable(),
            other => other.clone(),
        }
    }

    /// The "str" conversion.
    pub fn to_text(&self) -> Result<String, ObjectError> {
        match self {
            Self::Str(s) => Ok(s.clone()),
            Self::Level(level) => Ok(level.name().to_string()),
            Self::Failure(failure) => Ok(failure.to_string()),
            Self::Captured(captured) => match &captured.text {
                Some(text) => Ok(text.clone()),
                None => captured.value.to_text(),
            },
            Self::Object(obj) => guarded(obj.type_name(), || obj.to_text()),
            other => other.repr(),
        }
    }

    /// The "repr" conversion.
    pub fn repr(&self) -> Result<String, ObjectError> {
        match self {
            Self::Null => Ok("None".to_string()),
            Self::Bool(true) => Ok("True".to_string()),
            Self::Bool(false) => Ok("False".to_string()),
            Self::Int(i) => Ok(i.to_string()),
            Self::Float(f) => Ok(float_repr(*f)),
            Self::Str(s) => Ok(str_repr(s)),
            Self::Bytes(b) => Ok(bytes_repr(b)),
            Self::List(items) => {
                let parts = items
                    .iter()
                    .map(Value::repr)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("[{}]", parts.join(", ")))
            }
            Self::Map(map) => {
                let parts = map
                    .iter()
                    .map(|(k, v)| Ok(format!("{}: {}", str_repr(k), v.repr()?)))
                    .collect::<Result<Vec<_>, ObjectError>>()?;
                Ok(format!("{{{}}}", parts.join(", ")))
            }
            Self::Level(level) => Ok(format!("<LogLevel={}>", level.name())),
            Self::Failure(failure) => Ok(format!("<Failure {failure}>")),
            Self::Captured(captured) => Ok(format!(
                "{{'value': {}, 'str': {}, 'repr': {}}}",
                captured.value.repr()?,
                opt_repr(captured.text.as_deref()),
                opt_repr(captured.repr.as_deref()),
            )),
            Self::Object(obj) => guarded(obj.type_name(), || obj.repr()),
        }
    }
}

fn opt_repr(s: Option<&str>) -> String {
    s.map(str_repr).unwrap_or_else(|| "None".to_string())
}

/// Quote and escape a string for repr output.
pub(crate) fn str_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c == '\x7f' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn bytes_repr(bytes: &[u8]) -> String {
    let quote = if bytes.contains(&b'\'') && !bytes.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };
    let mut out = String::with_capacity(bytes.len() + 3);
    out.push('b');
    out.push(quote as char);
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b if b == quote => {
                out.push('\\');
                out.push(b as char);
            }
            0x20..=0x7e => out.push(b as char),
            b => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out.push(quote as char);
    out
}

/// Shortest round-trip float text, switching to exponent form outside
/// `1e-4 <= |f| < 1e16`.
pub(crate) fn float_repr(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if f == 0.0 {
        return if f.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }
    let sci = format!("{f:e}");
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m.to_string(), e.parse::<i32>().unwrap_or(0)),
        None => (sci.clone(), 0),
    };
    if (-4..16).contains(&exp) {
        let plain = f.to_string();
        if plain.contains('.') {
            plain
        } else {
            format!("{plain}.0")
        }
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Self::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Self::Level(level) => f.debug_tuple("Level").field(level).finish(),
            Self::Failure(failure) => f.debug_tuple("Failure").field(failure).finish(),
            Self::Captured(captured) => f.debug_tuple("Captured").field(captured).finish(),
            Self::Object(obj) => write!(f, "Object(<{}>)", obj.type_name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Level(a), Self::Level(b)) => a == b,
            (Self::Failure(a), Self::Failure(b)) => a == b,
            (Self::Captured(a), Self::Captured(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<LogLevel> for Value {
    fn from(level: LogLevel) -> Self {
        Self::Level(level)
    }
}

impl From<Failure> for Value {
    fn from(failure: Failure) -> Self {
        Self::Failure(failure)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self::Map(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}
