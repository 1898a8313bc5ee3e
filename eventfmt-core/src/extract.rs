//! Field extraction from live or flattened events.

use crate::error::FormatError;
use crate::event::Event;
use crate::flatten::CapturedValue;
use crate::resolve::{DynamicResolver, FieldPath, Resolver};
use crate::template::{base_key, parse_template, Conversion, FieldRef};
use crate::value::Value;

/// Extract the value a field reference names.
///
/// `field` is the inside of a replacement field: a dotted path with an
/// optional `!s`/`!r` conversion and `:spec`. With no conversion the
/// value itself is returned; with a conversion, its text.
///
/// On a flattened event only the captured snapshots are consulted, so the
/// answer is the same one the event gave at flatten time. An event that
/// has not been flattened is resolved live.
///
/// # Example
///
/// ```
/// use eventfmt_core::{extract_field, Event, Value};
///
/// let event = Event::with_format("{n}").with("n", 7);
/// assert_eq!(extract_field("n", &event).unwrap(), Value::Int(7));
/// assert_eq!(extract_field("n!r", &event).unwrap(), Value::from("7"));
/// ```
pub fn extract_field(field: &str, event: &Event) -> Result<Value, FormatError> {
    extract_field_with(field, event, &DynamicResolver)
}

/// [`extract_field`] with a caller-supplied [`Resolver`].
pub fn extract_field_with(
    field: &str,
    event: &Event,
    resolver: &dyn Resolver,
) -> Result<Value, FormatError> {
    let template = format!("{{{field}}}");
    let field_ref = parse_template(&template)
        .next()
        .transpose()?
        .and_then(|seg| seg.field)
        .ok_or_else(|| FormatError::KeyNotFound(field.to_string()))?;

    if event.is_flattened() {
        let captured = find_capture(event, &field_ref)
            .ok_or_else(|| FormatError::KeyNotFound(field_ref.name.clone()))?;
        return captured_view(captured, &field_ref);
    }

    let value = resolve_live(&field_ref, event, resolver)?;
    Ok(match field_ref.conversion {
        Conversion::None => value,
        Conversion::Str => Value::Str(value.to_text()?),
        Conversion::Repr => Value::Str(value.repr()?),
    })
}

/// Resolve a field against the live event: root lookup, traversal, and
/// the optional trailing call.
pub(crate) fn resolve_live(
    field: &FieldRef,
    event: &Event,
    resolver: &dyn Resolver,
) -> Result<Value, FormatError> {
    let path = FieldPath::parse(field.path())?;
    let root = event
        .get(&path.root)
        .ok_or_else(|| FormatError::KeyNotFound(path.root.clone()))?;
    let value = resolver.resolve_attribute_path(root, &path.segments)?;
    if field.wants_call() {
        resolver.invoke(&value)
    } else {
        Ok(value)
    }
}

/// Capture for the first occurrence of `field`: the exact key, or the
/// same name and spec captured under another conversion.
fn find_capture<'e>(event: &'e Event, field: &FieldRef) -> Option<&'e CapturedValue> {
    let mut conversions = vec![field.conversion];
    conversions.extend(
        [Conversion::None, Conversion::Str, Conversion::Repr]
            .into_iter()
            .filter(|c| *c != field.conversion),
    );
    conversions.into_iter().find_map(|conversion| {
        event
            .get(&base_key(&field.name, &field.spec, conversion))
            .and_then(Value::as_captured)
    })
}

fn captured_view(captured: &CapturedValue, field: &FieldRef) -> Result<Value, FormatError> {
    match field.conversion {
        Conversion::None => Ok(captured.value.clone()),
        conversion => captured
            .snapshot(conversion)
            .map(Value::from)
            .ok_or_else(|| FormatError::MissingSnapshot(field.name.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObjectError;
    use crate::flatten::flatten_event;
    use crate::value::LogObject;

    struct ObjectWithRepr;

    impl LogObject for ObjectWithRepr {
        fn type_name(&self) -> &str {
            "ObjectWithRepr"
        }

        fn repr(&self) -> Result<String, ObjectError> {
            Ok("repr".to_string())
        }
    }

    struct Something;

    impl LogObject for Something {
        fn type_name(&self) -> &str {
            "Something"
        }

        fn repr(&self) -> Result<String, ObjectError> {
            Ok("<Something>".to_string())
        }

        fn attribute(&self, name: &str) -> Result<Value, ObjectError> {
            match name {
                "number" => Ok(Value::Int(7)),
                "object" => Ok(Value::object(ObjectWithRepr)),
                _ => Err(ObjectError::no_attribute("Something", name)),
            }
        }
    }

    fn something_event() -> Event {
        Event::with_format("{something.number} {something.object}")
            .with("something", Value::object(Something))
    }

    fn check_extraction(event: &Event) {
        assert_eq!(
            extract_field("something.number", event).unwrap(),
            Value::Int(7)
        );
        assert_eq!(
            extract_field("something.number!s", event).unwrap(),
            Value::from("7")
        );
        assert_eq!(
            extract_field("something.object!s", event).unwrap(),
            Value::from("repr")
        );
    }

    #[test]
    fn test_extract_field() {
        check_extraction(&something_event());
    }

    #[test]
    fn test_extract_field_flatten_first() {
        let mut event = something_event();
        flatten_event(&mut event);
        check_extraction(&event);
    }

    #[test]
    fn test_missing_key() {
        let event = Event::with_format("{a}");
        assert_eq!(
            extract_field("a", &event),
            Err(FormatError::KeyNotFound("a".into()))
        );
    }

    #[test]
    fn test_flattened_event_ignores_uncaptured_fields() {
        let mut event = Event::with_format("{a}").with("a", 1).with("b", 2);
        flatten_event(&mut event);
        assert_eq!(extract_field("a", &event).unwrap(), Value::Int(1));
        assert_eq!(
            extract_field("b", &event),
            Err(FormatError::KeyNotFound("b".into()))
        );
    }

    #[test]
    fn test_extract_with_call() {
        let event = Event::with_format("{f()}")
            .with("f", Value::callable(|| Ok(Value::from("hi"))));
        assert_eq!(extract_field("f()", &event).unwrap(), Value::from("hi"));
        assert_eq!(extract_field("f()!r", &event).unwrap(), Value::from("'hi'"));
    }

    #[test]
    fn test_syntax_error() {
        let event = Event::new();
        assert!(matches!(
            extract_field("a!x", &event),
            Err(FormatError::Syntax(_))
        ));
    }
}
