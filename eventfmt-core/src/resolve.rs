//! Field path resolution against live values.
//!
//! A field name like `request.headers[host]` is a root key looked up in
//! the event followed by attribute (`.name`) and item (`[key]`) steps.
//! [`Resolver`] owns the steps; the event lookup lives in `extract`.

use crate::error::{FormatError, ObjectError};
use crate::value::{guarded, Value};

/// One step after the root name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// `.name`
    Attr(String),
    /// `[key]`; digits index lists, anything else keys maps.
    Item(String),
}

/// A parsed field path: root key plus traversal steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    pub root: String,
    pub segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Split a field name (without any trailing `()`) into its parts.
    pub fn parse(name: &str) -> Result<Self, FormatError> {
        let split = name.find(['.', '[']).unwrap_or(name.len());
        let (root, mut rest) = name.split_at(split);
        let mut segments = Vec::new();

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('.') {
                let end = after.find(['.', '[']).unwrap_or(after.len());
                if end == 0 {
                    return Err(FormatError::spec("Empty attribute in format string"));
                }
                segments.push(PathSegment::Attr(after[..end].to_string()));
                rest = &after[end..];
            } else if let Some(after) = rest.strip_prefix('[') {
                let end = after
                    .find(']')
                    .ok_or_else(|| FormatError::spec("Missing ']' in format string"))?;
                if end == 0 {
                    return Err(FormatError::spec("Empty attribute in format string"));
                }
                segments.push(PathSegment::Item(after[..end].to_string()));
                rest = &after[end + 1..];
            } else {
                return Err(FormatError::spec(
                    "Only '.' or '[' may follow ']' in format field specifier",
                ));
            }
        }

        Ok(Self {
            root: root.to_string(),
            segments,
        })
    }
}

/// Attribute traversal and call semantics for field values.
pub trait Resolver {
    /// Walk `path` starting from `root`.
    fn resolve_attribute_path(
        &self,
        root: &Value,
        path: &[PathSegment],
    ) -> Result<Value, FormatError>;

    /// Call `value` with no arguments.
    fn invoke(&self, value: &Value) -> Result<Value, FormatError>;
}

/// The built-in resolver. Knows the attributes of the special domain
/// types and delegates everything else to [`crate::value::LogObject`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DynamicResolver;

impl DynamicResolver {
    fn attribute(value: &Value, name: &str) -> Result<Value, FormatError> {
        let found = match value {
            Value::Object(obj) => {
                return Ok(guarded(obj.type_name(), || obj.attribute(name))?);
            }
            Value::Level(level) if name == "name" => Some(Value::from(level.name())),
            Value::Failure(failure) => match name {
                "type" => Some(Value::from(failure.type_name.as_str())),
                "message" => Some(Value::from(failure.message.as_str())),
                "traceback" => Some(Value::from(failure.traceback())),
                "parents" => Some(Value::List(
                    failure.parents.iter().map(|p| Value::from(p.as_str())).collect(),
                )),
                _ => None,
            },
            Value::Captured(captured) => match name {
                "value" => Some(captured.value.clone()),
                "str" => Some(Value::from(captured.text.clone())),
                "repr" => Some(Value::from(captured.repr.clone())),
                _ => None,
            },
            _ => None,
        };
        found.ok_or_else(|| ObjectError::no_attribute(value.type_name(), name).into())
    }

    fn item(value: &Value, key: &str) -> Result<Value, FormatError> {
        match value {
            Value::List(items) => {
                let index: usize = key.parse().map_err(|_| {
                    ObjectError::raised("TypeError", "list indices must be integers")
                })?;
                items
                    .get(index)
                    .cloned()
                    .ok_or_else(|| FormatError::Index("list index out of range".to_string()))
            }
            Value::Map(map) => map
                .get(key)
                .cloned()
                .ok_or_else(|| FormatError::KeyNotFound(key.to_string())),
            other => Err(ObjectError::raised(
                "TypeError",
                format!("'{}' object is not subscriptable", other.type_name()),
            )
            .into()),
        }
    }
}

impl Resolver for DynamicResolver {
    fn resolve_attribute_path(
        &self,
        root: &Value,
        path: &[PathSegment],
    ) -> Result<Value, FormatError> {
        let mut current = root.clone();
        for segment in path {
            current = match segment {
                PathSegment::Attr(name) => Self::attribute(&current, name)?,
                PathSegment::Item(key) => Self::item(&current, key)?,
            };
        }
        Ok(current)
    }

    fn invoke(&self, value: &Value) -> Result<Value, FormatError> {
        match value {
            Value::Object(obj) => Ok(guarded(obj.type_name(), || obj.call())?),
            other => Err(ObjectError::NotCallable(other.type_name().to_string()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::Failure;
    use crate::level::LogLevel;
    use crate::value::LogObject;
    use std::collections::BTreeMap;

    struct Point;

    impl LogObject for Point {
        fn type_name(&self) -> &str {
            "Point"
        }

        fn repr(&self) -> Result<String, ObjectError> {
            Ok("Point(1, 2)".to_string())
        }

        fn attribute(&self, name: &str) -> Result<Value, ObjectError> {
            match name {
                "x" => Ok(Value::Int(1)),
                "y" => Ok(Value::Int(2)),
                "boom" => panic!("attribute getter blew up"),
                _ => Err(ObjectError::no_attribute("Point", name)),
            }
        }
    }

    fn resolve(root: &Value, name: &str) -> Result<Value, FormatError> {
        let path = FieldPath::parse(name).unwrap();
        DynamicResolver.resolve_attribute_path(root, &path.segments)
    }

    #[test]
    fn test_parse_paths() {
        let path = FieldPath::parse("a.b[0].c").unwrap();
        assert_eq!(path.root, "a");
        assert_eq!(
            path.segments,
            vec![
                PathSegment::Attr("b".into()),
                PathSegment::Item("0".into()),
                PathSegment::Attr("c".into()),
            ]
        );
        assert_eq!(FieldPath::parse("").unwrap().root, "");
    }

    #[test]
    fn test_parse_errors() {
        assert!(FieldPath::parse("a..b").is_err());
        assert!(FieldPath::parse("a[0]b").is_err());
        assert!(FieldPath::parse("a[]").is_err());
    }

    #[test]
    fn test_object_attributes() {
        let point = Value::object(Point);
        assert_eq!(resolve(&point, "p.x").unwrap(), Value::Int(1));
        let err = resolve(&point, "p.z").unwrap_err();
        assert_eq!(err.to_string(), "'Point' object has no attribute 'z'");
    }

    #[test]
    fn test_attribute_panic_is_contained() {
        let err = resolve(&Value::object(Point), "p.boom").unwrap_err();
        assert!(matches!(
            err,
            FormatError::Object(ObjectError::Panicked { .. })
        ));
    }

    #[test]
    fn test_items() {
        let mut map = BTreeMap::new();
        map.insert("host".to_string(), Value::from("example.com"));
        let root = Value::List(vec![Value::Map(map)]);
        assert_eq!(
            resolve(&root, "r[0][host]").unwrap(),
            Value::from("example.com")
        );
        assert!(matches!(
            resolve(&root, "r[3]"),
            Err(FormatError::Index(_))
        ));
        assert!(matches!(
            resolve(&root, "r[0][port]"),
            Err(FormatError::KeyNotFound(_))
        ));
        assert!(resolve(&Value::Int(3), "r[0]").is_err());
    }

    #[test]
    fn test_domain_attributes() {
        assert_eq!(
            resolve(&Value::Level(LogLevel::Error), "l.name").unwrap(),
            Value::from("error")
        );
        let failure = Value::Failure(Failure::new("ValueError", "bad input"));
        assert_eq!(resolve(&failure, "f.type").unwrap(), Value::from("ValueError"));
        assert_eq!(
            resolve(&failure, "f.message").unwrap(),
            Value::from("bad input")
        );
    }

    #[test]
    fn test_invoke() {
        let callable = Value::callable(|| Ok(Value::Int(42)));
        assert_eq!(DynamicResolver.invoke(&callable).unwrap(), Value::Int(42));
        let err = DynamicResolver.invoke(&Value::Int(1)).unwrap_err();
        assert_eq!(err.to_string(), "'int' object is not callable");
    }
}
