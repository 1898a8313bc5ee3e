//! Configuration loading from eventfmt.toml.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

/// File name looked up in the configuration directory.
pub const CONFIG_FILE: &str = "eventfmt.toml";

/// Main configuration structure for eventfmt.toml.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EventfmtConfig {
    /// Timestamp rendering.
    pub time: Option<TimeConfig>,
    /// Output configuration.
    pub output: Option<OutputConfig>,
    /// How persisted logs are framed.
    pub input: Option<InputConfig>,
}

/// `[time]`
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TimeConfig {
    /// strftime pattern; `%f` is microseconds.
    pub format: Option<String>,
    /// Text shown when an event has no usable time.
    pub default: Option<String>,
}

/// `[output]`
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Output format: "text" or "json".
    pub format: Option<String>,
    /// Append failure tracebacks to text output.
    pub include_traceback: Option<bool>,
}

/// `[input]`
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    /// `true` for record-separator framing, `false` for plain lines,
    /// absent to detect per file.
    pub record_separator: Option<bool>,
}

impl EventfmtConfig {
    /// Output format name, `"text"` unless configured.
    pub fn output_format(&self) -> &str {
        self.output
            .as_ref()
            .and_then(|o| o.format.as_deref())
            .unwrap_or("text")
    }

    pub fn time_format(&self) -> Option<&str> {
        self.time.as_ref().and_then(|t| t.format.as_deref())
    }

    pub fn time_default(&self) -> Option<&str> {
        self.time.as_ref().and_then(|t| t.default.as_deref())
    }

    pub fn include_traceback(&self) -> Option<bool> {
        self.output.as_ref().and_then(|o| o.include_traceback)
    }

    pub fn record_separator(&self) -> Option<bool> {
        self.input.as_ref().and_then(|i| i.record_separator)
    }

    fn validate(&self) -> Result<()> {
        match self.output_format() {
            "text" | "json" => Ok(()),
            other => bail!("output.format must be \"text\" or \"json\", not {other:?}"),
        }
    }
}

/// Loads configuration from eventfmt.toml in `root` if it exists.
pub fn load_config(root: &Path) -> Result<Option<EventfmtConfig>> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let content =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let cfg: EventfmtConfig = toml::from_str(&content).context("Invalid eventfmt.toml")?;
    cfg.validate().context("Invalid eventfmt.toml")?;
    Ok(Some(cfg))
}
