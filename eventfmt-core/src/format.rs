//! Rendering events to text.
//!
//! [`format_event`] is total: whatever the event holds, it returns a
//! string. Rendering failures fall back to [`format_unformattable_event`],
//! which itself falls back to a pair-by-pair dump when even the event's
//! repr fails.

use std::fmt::{Display, Write};
use std::panic::{self, AssertUnwindSafe};

use crate::error::{FormatError, ObjectError};
use crate::event::Event;
use crate::extract::resolve_live;
use crate::flatten::CapturedValue;
use crate::resolve::{DynamicResolver, Resolver};
use crate::template::{format_text, format_value, parse_template, Conversion, FieldRef, KeyFlattener};
use crate::time::{format_time, DEFAULT_TIME_FORMAT};
use crate::value::{panic_message, Value};

/// Stands in for a system label that cannot be rendered.
pub const UNFORMATTABLE: &str = "UNFORMATTABLE";

/// Render an event's message. Never fails.
///
/// Missing `log_format` gives an empty string. Anything that goes wrong
/// while rendering gives a diagnostic message instead.
///
/// # Example
///
/// ```
/// use eventfmt_core::{format_event, Event};
///
/// let event = Event::with_format("id:{id}").with("id", "123");
/// assert_eq!(format_event(&event), "id:123");
/// ```
pub fn format_event(event: &Event) -> String {
    match event.template() {
        Ok(None) => String::new(),
        Ok(Some(template)) => match render_contained(&template, event) {
            Ok(text) => text,
            Err(err) => format_unformattable_event(event, &err),
        },
        Err(err) => format_unformattable_event(event, &err),
    }
}

/// Render `template` against `event`, calling fields that end in `()`.
///
/// Fields captured by the flattener are answered from their snapshots;
/// everything else is resolved live.
pub fn format_with_call(template: &str, event: &Event) -> Result<String, FormatError> {
    render(template, event, &DynamicResolver)
}

/// [`format_with_call`], with a panic anywhere in rendering turned into an
/// error.
fn render_contained(template: &str, event: &Event) -> Result<String, FormatError> {
    panic::catch_unwind(AssertUnwindSafe(|| format_with_call(template, event))).unwrap_or_else(
        |payload| {
            Err(ObjectError::Panicked {
                type_name: "format".to_string(),
                message: panic_message(payload.as_ref()),
            }
            .into())
        },
    )
}

fn render(template: &str, event: &Event, resolver: &dyn Resolver) -> Result<String, FormatError> {
    let mut keys = KeyFlattener::new();
    let mut out = String::with_capacity(template.len());
    for segment in parse_template(template) {
        let segment = segment?;
        out.push_str(&segment.literal);
        let Some(field) = segment.field else {
            continue;
        };
        let key = keys.key_for(&field);
        let text = match event.get(&key).and_then(Value::as_captured) {
            Some(captured) => render_captured(captured, &field)?,
            None => render_value(&resolve_live(&field, event, resolver)?, &field)?,
        };
        out.push_str(&text);
    }
    Ok(out)
}

fn render_value(value: &Value, field: &FieldRef) -> Result<String, FormatError> {
    match field.conversion {
        Conversion::Repr => format_text(&value.repr()?, &field.spec),
        Conversion::Str => format_text(&value.to_text()?, &field.spec),
        Conversion::None => format_value(value, &field.spec),
    }
}

fn render_captured(captured: &CapturedValue, field: &FieldRef) -> Result<String, FormatError> {
    if field.conversion == Conversion::None && !field.spec.is_empty() {
        return format_value(&captured.value, &field.spec);
    }
    let snapshot = captured
        .snapshot(field.conversion)
        .ok_or_else(|| FormatError::MissingSnapshot(field.name.clone()))?;
    format_text(snapshot, &field.spec)
}

/// Diagnostic text for an event that could not be rendered.
///
/// Never fails, even when `error` cannot be displayed or parts of the
/// event cannot be repr'd.
pub fn format_unformattable_event(event: &Event, error: &dyn Display) -> String {
    let error_text = display_safely(error);
    if let (Some(error_text), Ok(repr)) = (&error_text, event.repr()) {
        return format!("Unable to format event {repr}: {error_text}");
    }

    let recoverable = event
        .iter()
        .map(|(key, value)| {
            let key = key
                .repr()
                .unwrap_or_else(|_| "<unrepresentable key>".to_string());
            format!("{key} = {}", safe_repr(value))
        })
        .collect::<Vec<_>>()
        .join(", ");
    let error_text = error_text.unwrap_or_else(|| "<error could not be displayed>".to_string());
    let details = match event.repr() {
        Ok(_) => "the error could not be displayed".to_string(),
        Err(err) => format!("event repr failed: {err}"),
    };
    format!(
        "MESSAGE LOST: unformattable object logged: {error_text}\n\
         Recoverable data: {recoverable}\n\
         Exception during formatting:\n{details}"
    )
}

fn display_safely(error: &dyn Display) -> Option<String> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        let mut out = String::new();
        write!(out, "{error}").ok().map(|()| out)
    }))
    .ok()
    .flatten()
}

fn safe_repr(value: &Value) -> String {
    value
        .repr()
        .unwrap_or_else(|err| format!("<{} instance with error: {err}>", value.type_name()))
}

/// The bracketed label of a text line: `log_system` if present and not
/// null, otherwise `namespace#level` with `-` for missing parts.
fn system_label(event: &Event) -> String {
    if let Some(system) = event.system().filter(|system| !system.is_null()) {
        return system
            .to_text()
            .unwrap_or_else(|_| UNFORMATTABLE.to_string());
    }
    let namespace = match event.namespace() {
        Some(ns) => ns.to_text().unwrap_or_else(|_| UNFORMATTABLE.to_string()),
        None => "-".to_string(),
    };
    let level = event.level().map_or("-", |level| level.name());
    format!("{namespace}#{level}")
}

/// Render an event as one classic log line:
/// `"{time} [{namespace}#{level}] {message}\n"`.
///
/// `format_time` renders `log_time`. Returns `None` when the event has no
/// message to show. Continuation lines are indented with a tab.
pub fn format_event_as_classic_log_text<F>(event: &Event, format_time: F) -> Option<String>
where
    F: Fn(Option<f64>) -> String,
{
    let text = format_event(event);
    if text.is_empty() {
        return None;
    }
    let text = text.replace('\n', "\n\t");
    Some(format!(
        "{} [{}] {text}\n",
        format_time(event.time()),
        system_label(event)
    ))
}

/// [`format_event_as_classic_log_text`] with local-time timestamps in the
/// default format.
pub fn classic_log_text(event: &Event) -> Option<String> {
    format_event_as_classic_log_text(event, |when| {
        format_time(when, Some(DEFAULT_TIME_FORMAT), "-")
    })
}

/// Knobs for [`event_as_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOptions {
    /// Append the traceback of `log_failure`.
    pub include_traceback: bool,
    /// Prefix the line with the formatted `log_time`.
    pub include_timestamp: bool,
    /// Prefix the line with the `[system]` label.
    pub include_system: bool,
    /// strftime pattern for the timestamp.
    pub time_format: Option<String>,
    /// Shown instead of a timestamp that cannot be rendered.
    pub time_default: String,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            include_traceback: true,
            include_timestamp: true,
            include_system: true,
            time_format: Some(DEFAULT_TIME_FORMAT.to_string()),
            time_default: "-".to_string(),
        }
    }
}

/// Render an event as text with optional timestamp, system label, and
/// traceback. Returns an empty string when there is nothing to show.
pub fn event_as_text(event: &Event, options: &TextOptions) -> String {
    let mut text = format_event(event);
    if options.include_traceback {
        if let Some(failure) = event.failure() {
            let traceback = failure.traceback();
            let traceback = traceback.trim_end_matches('\n');
            if text.is_empty() {
                text = traceback.to_string();
            } else {
                text = format!("{text}\n{traceback}");
            }
        }
    }
    if text.is_empty() {
        return text;
    }

    let mut out = String::new();
    if options.include_timestamp {
        out.push_str(&format_time(
            event.time(),
            options.time_format.as_deref(),
            &options.time_default,
        ));
        out.push(' ');
    }
    if options.include_system {
        out.push('[');
        out.push_str(&system_label(event));
        out.push_str("] ");
    }
    out.push_str(&text.replace('\n', "\n\t"));
    out
}
