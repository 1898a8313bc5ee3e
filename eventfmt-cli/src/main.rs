//! eventfmt CLI - render persisted JSON event logs.
//!
//! Features:
//! - Reads JSON-lines event logs, with or without record-separator framing
//! - Directory scanning for `.json`, `.jsonl` and `.log` files
//! - Rayon-powered parallel decoding and rendering
//! - Classic text lines or normalized JSON lines on stdout
//! - Level and regex filtering
//! - `eventfmt.toml` defaults, overridden by flags

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use rayon::prelude::*;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use eventfmt_core::{
    decode_records, event_as_text, gather_log_files, init_structured_logging, load_config,
    log_file_summary, log_unreadable, split_records, Event, EventFilter, EventfmtConfig,
    IoResultExt, JsonCodec, LogLevel, TextOptions, DEFAULT_TIME_FORMAT, RECORD_SEPARATOR,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Render persisted JSON event logs as classic text")]
pub struct Cli {
    /// Log files or directories to read
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Emit normalized JSON lines instead of text
    #[arg(long)]
    json: bool,

    /// strftime pattern for timestamps
    #[arg(long, value_name = "PATTERN")]
    time_format: Option<String>,

    /// Only show events whose message matches this regex
    #[arg(long, value_name = "REGEX")]
    grep: Option<String>,

    /// Hide events below this level (debug, info, warn, error, critical)
    #[arg(long, value_name = "LEVEL")]
    min_level: Option<LogLevel>,

    /// Append failure tracebacks to text output
    #[arg(long)]
    traceback: bool,

    /// Directory holding eventfmt.toml (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    config: Option<PathBuf>,
}

/// Effective settings after merging `eventfmt.toml` with the flags.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    json: bool,
    text: TextOptions,
    /// `None` detects framing from each file's first byte.
    separator: Option<u8>,
}

impl Settings {
    fn resolve(cli: &Cli, config: Option<&EventfmtConfig>) -> Self {
        let json = cli.json || config.is_some_and(|c| c.output_format() == "json");
        let time_format = cli
            .time_format
            .clone()
            .or_else(|| config.and_then(|c| c.time_format()).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_TIME_FORMAT.to_string());
        let time_default = config
            .and_then(|c| c.time_default())
            .unwrap_or("-")
            .to_string();
        let include_traceback =
            cli.traceback || config.and_then(|c| c.include_traceback()).unwrap_or(false);
        let separator = match config.and_then(|c| c.record_separator()) {
            Some(true) => Some(RECORD_SEPARATOR),
            Some(false) => Some(b'\n'),
            None => None,
        };

        Self {
            json,
            text: TextOptions {
                include_traceback,
                include_timestamp: true,
                include_system: true,
                time_format: Some(time_format),
                time_default,
            },
            separator,
        }
    }
}

fn build_filter(cli: &Cli) -> Result<EventFilter> {
    let mut filter = EventFilter::new();
    if let Some(level) = cli.min_level {
        filter = filter.with_min_level(level);
    }
    if let Some(pattern) = &cli.grep {
        filter = filter.with_pattern(pattern)?;
    }
    Ok(filter)
}

/// Decode every record in `data`. Order is preserved.
fn decode_file(data: &[u8], settings: &Settings, codec: &JsonCodec) -> Vec<Event> {
    let records = split_records(data, settings.separator);
    decode_records(&records, codec)
}

/// Render the events the filter keeps, one output line each.
fn render_events(
    events: &[Event],
    filter: &EventFilter,
    settings: &Settings,
    codec: &JsonCodec,
) -> Result<Vec<String>> {
    events
        .par_iter()
        .filter(|event| filter.matches(event))
        .map(|event| render_event(event, settings, codec))
        .filter_map(Result::transpose)
        .collect()
}

fn render_event(event: &Event, settings: &Settings, codec: &JsonCodec) -> Result<Option<String>> {
    if settings.json {
        let line = serde_json::to_string(&codec.encode_event(event))
            .context("Failed to serialize event")?;
        return Ok(Some(line));
    }
    let text = event_as_text(event, &settings.text);
    if text.is_empty() {
        return Ok(None);
    }
    Ok(Some(text.trim_end_matches('\n').to_string()))
}

/// The hook also sees panics that the core contains and recovers from, so
/// it reports without exiting.
fn panic_report(detail: &str) -> String {
    format!("[PANIC] eventfmt internal error: {detail}")
}

fn main() -> Result<()> {
    // Global panic guard
    std::panic::set_hook(Box::new(|info| {
        eprintln!("{}", panic_report(&info.to_string()));
    }));

    // Initialize structured logging (JSON to stderr, respects RUST_LOG)
    init_structured_logging();

    let cli = Cli::parse();

    let config_dir = cli.config.clone().unwrap_or_else(|| PathBuf::from("."));
    let config = load_config(&config_dir)
        .with_context(|| format!("Failed to load config from: {}", config_dir.display()))?;
    let settings = Settings::resolve(&cli, config.as_ref());
    let filter = build_filter(&cli)?;
    let codec = JsonCodec::new();

    let mut files = Vec::new();
    for path in &cli.paths {
        let found = gather_log_files(path)
            .with_context(|| format!("Failed to scan: {}", path.display()))?;
        files.extend(found);
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut unreadable = 0usize;

    for file in &files {
        let lines = match process_file(file, &filter, &settings, &codec) {
            Ok(lines) => lines,
            Err(err) => {
                log_unreadable(file, &format!("{err:#}"));
                unreadable += 1;
                continue;
            }
        };
        for line in &lines {
            writeln!(out, "{line}").context("Failed to write output")?;
        }
    }
    out.flush().context("Failed to flush output")?;

    if unreadable > 0 {
        return Err(anyhow!("{unreadable} log file(s) could not be read"));
    }
    Ok(())
}

fn process_file(
    path: &Path,
    filter: &EventFilter,
    settings: &Settings,
    codec: &JsonCodec,
) -> Result<Vec<String>> {
    let data = fs::read(path).with_path(path)?;
    let events = decode_file(&data, settings, codec);
    let lines = render_events(&events, filter, settings, codec)?;
    log_file_summary(path, events.len(), lines.len());
    Ok(lines)
}
