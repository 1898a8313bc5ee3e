//! End-to-end scenarios for eventfmt-core.

use crate::*;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_dir() -> PathBuf {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir()
        .join("eventfmt_tests")
        .join(format!("{}_{}", std::process::id(), id));
    if dir.exists() {
        fs::remove_dir_all(&dir).ok();
    }
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Encode, decode, return the restored event.
fn persist(event: &mut Event) -> Event {
    event_from_json(&event_as_json(event)).unwrap()
}

struct Ephemeral;

impl LogObject for Ephemeral {
    fn type_name(&self) -> &str {
        "Ephemeral"
    }

    fn repr(&self) -> Result<String, ObjectError> {
        Ok("<Ephemeral>".to_string())
    }

    fn attribute(&self, name: &str) -> Result<Value, ObjectError> {
        match name {
            "attribute" => Ok(Value::from("value")),
            _ => Err(ObjectError::no_attribute("Ephemeral", name)),
        }
    }
}

/// Repr changes once `destroyed` is set.
struct SelfDestructing {
    destroyed: Arc<Mutex<bool>>,
}

impl LogObject for SelfDestructing {
    fn type_name(&self) -> &str {
        "unpersistable"
    }

    fn repr(&self) -> Result<String, ObjectError> {
        let destroyed = self.destroyed.lock().map(|d| *d).unwrap_or(true);
        Ok(if destroyed {
            "post-serialization garbage".to_string()
        } else {
            "un-persistable".to_string()
        })
    }
}

struct CountStr(Arc<AtomicI64>);

impl LogObject for CountStr {
    fn type_name(&self) -> &str {
        "CountStr"
    }

    fn repr(&self) -> Result<String, ObjectError> {
        Ok("<CountStr>".to_string())
    }

    fn to_text(&self) -> Result<String, ObjectError> {
        Ok(self.0.fetch_add(1, Ordering::SeqCst).to_string())
    }
}

struct Unformattable;

impl LogObject for Unformattable {
    fn type_name(&self) -> &str {
        "Unformattable"
    }

    fn repr(&self) -> Result<String, ObjectError> {
        Err(ObjectError::raised("ZeroDivisionError", "division by zero"))
    }
}

// Flatten, drop the live objects, persist, and format
#[test]
fn test_format_flat_event_after_json() {
    let counter = Arc::new(AtomicI64::new(0));
    let calls = Arc::clone(&counter);
    let mut event = Event::with_format(
        "callable: {callme()} attribute: {object.attribute} numrepr: {number!r} strrepr: {string!r}",
    )
    .with(
        "callme",
        Value::callable(move || Ok(Value::Int(calls.fetch_add(1, Ordering::SeqCst)))),
    )
    .with("object", Value::object(Ephemeral))
    .with("number", 7)
    .with("string", "hello");

    flatten_event(&mut event);
    event.remove("callme");
    event.remove("object");
    let restored = persist(&mut event);

    assert_eq!(
        format_event(&restored),
        "callable: 0 attribute: value numrepr: 7 strrepr: 'hello'"
    );
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

// A field mutated after flatten still renders its captured text
#[test]
fn test_format_flat_event_with_mutated_fields() {
    let destroyed = Arc::new(Mutex::new(false));
    let mut event = Event::with_format("unpersistable: {unpersistable}").with(
        "unpersistable",
        Value::object(SelfDestructing {
            destroyed: Arc::clone(&destroyed),
        }),
    );

    flatten_event(&mut event);
    *destroyed.lock().unwrap() = true;

    assert_eq!(format_event(&event), "unpersistable: un-persistable");
}

// The same field twice is captured twice
#[test]
fn test_format_flat_event_field_names_same() {
    let mut event = Event::with_format("{x} {x}")
        .with("x", Value::object(CountStr(Arc::new(AtomicI64::new(0)))));
    flatten_event(&mut event);
    assert_eq!(format_event(&event), "0 1");
    assert_eq!(format_event(&persist(&mut event)), "0 1");
}

// format(E) == format(decode(encode(flatten(E))))
#[test]
fn test_round_trip_preserves_text() {
    let templates = [
        "plain text",
        "{a} and {b!r} and {c:>6}",
        "{nested[0]} {nested[1]!r}",
        "{level.name} {f:.3f} {n:,}",
        "{{escaped}} {a!s:*^9}",
    ];
    for template in templates {
        let mut event = Event::with_format(template)
            .with("a", "alpha")
            .with("b", Value::bytes(vec![0xe1, b'x']))
            .with("c", 42)
            .with("nested", Value::List(vec![Value::from("x"), Value::Null]))
            .with("level", LogLevel::Warn)
            .with("f", 2.0 / 3.0)
            .with("n", 1_234_567);
        let direct = format_event(&event);
        assert!(!direct.contains("Unable to format"), "{template}: {direct}");
        flatten_event(&mut event);
        assert_eq!(format_event(&persist(&mut event)), direct, "{template}");
    }
}

// Flatten twice leaves the mapping unchanged
#[test]
fn test_flatten_is_idempotent() {
    let mut event = Event::with_format("{x!r} {y.attribute}")
        .with("x", 3)
        .with("y", Value::object(Ephemeral));
    flatten_event(&mut event);
    let once = event.clone();
    flatten_event(&mut event);
    assert_eq!(event, once);
}

// Extraction agrees before and after flattening
#[test]
fn test_extract_before_and_after_flatten() {
    let mut event = Event::with_format("{object.attribute} {n}")
        .with("object", Value::object(Ephemeral))
        .with("n", 5);
    let before = (
        extract_field("object.attribute", &event).unwrap(),
        extract_field("n!r", &event).unwrap(),
    );
    flatten_event(&mut event);
    let after = (
        extract_field("object.attribute", &event).unwrap(),
        extract_field("n!r", &event).unwrap(),
    );
    assert_eq!(before, after);
    assert_eq!(before.0, Value::from("value"));
}

/// Object with one attribute, `value`.
struct Holder;

impl LogObject for Holder {
    fn type_name(&self) -> &str {
        "Holder"
    }

    fn repr(&self) -> Result<String, ObjectError> {
        Ok("<Holder>".to_string())
    }

    fn attribute(&self, name: &str) -> Result<Value, ObjectError> {
        match name {
            "value" => Ok(Value::Int(345)),
            _ => Err(ObjectError::no_attribute("Holder", name)),
        }
    }
}

// Extraction from a loaded event answers from its captures only
#[test]
fn test_extract_after_json_round_trip() {
    let mut event = Event::with_format("{object.value}").with("object", Value::object(Holder));
    let loaded = persist(&mut event);

    assert_eq!(extract_field("object.value", &loaded).unwrap(), Value::Int(345));
    assert_eq!(
        extract_field("object.value!s", &loaded).unwrap(),
        Value::from("345")
    );
    for flattened in [&loaded, &event] {
        assert_eq!(
            extract_field("object", flattened),
            Err(FormatError::KeyNotFound("object".into()))
        );
    }
}

// A null system in a loaded event falls back to namespace#level
#[test]
fn test_classic_text_with_null_system() {
    let event =
        event_from_json(r#"{"log_format":"X","log_namespace":"n","log_system":null}"#).unwrap();
    let line = format_event_as_classic_log_text(&event, |_| "-".to_string());
    assert_eq!(line.as_deref(), Some("- [n#-] X\n"));
}

// Nothing in an event can make formatting fail
#[test]
fn test_total_formatting() {
    assert_eq!(format_event(&Event::new()), "");

    let weird = Event::with_format(Value::Map(Default::default()));
    let text = format_event(&weird);
    assert!(text.contains("Log format must be unicode or bytes"));
    assert!(text.contains(&weird.repr().unwrap()));

    let evil = Event::with_format("{evil()}").with(
        "evil",
        Value::callable(|| Err(ObjectError::raised("ZeroDivisionError", "division by zero"))),
    );
    let text = format_event(&evil);
    assert!(text.contains("Unable to format event"));
    assert!(text.contains(&evil.repr().unwrap()));

    let worse = evil.clone().with("gurk", Value::object(Unformattable));
    let text = format_event(&worse);
    assert!(text.contains("MESSAGE LOST: unformattable object logged:"));
    assert!(text.contains("Recoverable data:"));
    assert!(text.contains("Exception during formatting:"));
}

// Unpersistable values, bytes, and unknown tags through JSON
#[test]
fn test_json_placeholders() {
    let bytes: Vec<u8> = (0..255).collect();
    let mut event = Event::new()
        .with("opaque", Value::object(Ephemeral))
        .with("raw", Value::bytes(bytes.clone()));
    let restored = persist(&mut event);
    assert_eq!(restored.get("opaque"), Some(&Value::unpersistable()));
    let latin1: String = bytes.iter().map(|&b| char::from(b)).collect();
    assert_eq!(restored.get("raw"), Some(&Value::Str(latin1)));

    let future = event_from_json(r#"{"thing": {"__class_uuid__": "from-the-future"}}"#).unwrap();
    assert_eq!(future.get("thing"), Some(&Value::Null));
}

// A failure survives persistence and renders its traceback
#[test]
fn test_failure_round_trip() {
    let err = "x".parse::<i32>().unwrap_err();
    let failure = Failure::from_error(&err);
    assert_eq!(failure.type_name, "ParseIntError");
    let mut event = Event::with_format("could not parse")
        .with(LOG_FAILURE, failure.clone())
        .with(LOG_LEVEL, LogLevel::Error);
    let restored = persist(&mut event);
    assert_eq!(restored.failure(), Some(&failure));
    assert_eq!(restored.level(), Some(LogLevel::Error));

    let options = TextOptions {
        include_timestamp: false,
        ..TextOptions::default()
    };
    let text = event_as_text(&restored, &options);
    assert!(text.starts_with("[-#error] could not parse\n\tTraceback"));
    assert!(text.ends_with("ParseIntError: invalid digit found in string"));
}

// Classic lines for persisted events
#[test]
fn test_classic_text_after_json() {
    let mut event = Event::with_format("XYZZY\n{what}")
        .with("what", "Plugh")
        .with(LOG_NAMESPACE, "adventure")
        .with(LOG_LEVEL, LogLevel::Warn)
        .with(LOG_TIME, 12345);
    let restored = persist(&mut event);
    let line = format_event_as_classic_log_text(&restored, |t| {
        format_time_in(&chrono::Utc, t, Some("%H:%M:%S"), "-")
    });
    assert_eq!(line.as_deref(), Some("03:25:45 [adventure#warn] XYZZY\n\tPlugh\n"));
}

// Write a log file, discover it, read it back
#[test]
fn test_log_file_round_trip() {
    let dir = temp_dir();
    let path = dir.join("app.json");
    let mut writer = JsonLogWriter::new(fs::File::create(&path).unwrap());
    for i in 0..10 {
        let mut event = Event::with_format("request {i} took {ms:.1f}ms")
            .with("i", i)
            .with("ms", f64::from(i) * 1.5);
        writer.write_event(&mut event).unwrap();
    }
    writer.flush().unwrap();
    drop(writer);

    let files = gather_log_files(&dir).unwrap();
    assert_eq!(files, vec![path.clone()]);

    let file = std::io::BufReader::new(fs::File::open(&path).unwrap());
    let texts: Vec<_> = events_from_json_log(file, None)
        .map(|event| format_event(&event))
        .collect();
    assert_eq!(texts.len(), 10);
    assert_eq!(texts[3], "request 3 took 4.5ms");

    let data = fs::read(&path).unwrap();
    let parallel = decode_records(&split_records(&data, None), &JsonCodec::new());
    let parallel_texts: Vec<_> = parallel.iter().map(format_event).collect();
    assert_eq!(parallel_texts, texts);

    fs::remove_dir_all(&dir).ok();
}

// A crash mid-write loses only the last record
#[test]
fn test_truncated_log_file() {
    let mut writer = JsonLogWriter::new(Vec::new());
    writer.write_event(&mut Event::with_format("first")).unwrap();
    writer.write_event(&mut Event::with_format("second")).unwrap();
    let mut data = writer.into_inner();
    data.truncate(data.len() - 5);

    let events: Vec<_> = events_from_json_log(data.as_slice(), None).collect();
    assert_eq!(events.len(), 1);
    assert_eq!(format_event(&events[0]), "first");
}

// Filtering persisted events by level and text
#[test]
fn test_filter_persisted_events() {
    let events: Vec<Event> = [
        (LogLevel::Debug, "cache miss"),
        (LogLevel::Error, "disk full"),
        (LogLevel::Warn, "disk almost full"),
    ]
    .into_iter()
    .map(|(level, text)| persist(&mut Event::with_format(text).with(LOG_LEVEL, level)))
    .collect();

    let filter = EventFilter::new()
        .with_min_level(LogLevel::Warn)
        .with_pattern("disk")
        .unwrap();
    let kept: Vec<_> = events
        .iter()
        .filter(|e| filter.matches(e))
        .map(format_event)
        .collect();
    assert_eq!(kept, vec!["disk full", "disk almost full"]);
}

// Configuration drives text options
#[test]
fn test_config_loading() {
    let dir = temp_dir();
    fs::write(
        dir.join("eventfmt.toml"),
        "[time]\nformat = \"%Y\"\n\n[output]\ninclude_traceback = false\n",
    )
    .unwrap();
    let cfg = load_config(&dir).unwrap().unwrap();
    assert_eq!(cfg.time_format(), Some("%Y"));
    assert_eq!(cfg.include_traceback(), Some(false));
    assert_eq!(cfg.output_format(), "text");
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_config_not_found() {
    let dir = temp_dir();
    assert!(load_config(&dir).unwrap().is_none());
    fs::remove_dir_all(&dir).ok();
}

// Unicode survives every stage
#[test]
fn test_unicode_everywhere() {
    let mut event = Event::with_format("S\u{e1}nchez says {greeting!r} \u{1f600}")
        .with("greeting", "\u{4f60}\u{597d}");
    let direct = format_event(&event);
    assert_eq!(direct, "S\u{e1}nchez says '\u{4f60}\u{597d}' \u{1f600}");
    assert_eq!(format_event(&persist(&mut event)), direct);
}
