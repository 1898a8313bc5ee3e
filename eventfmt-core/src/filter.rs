//! Selecting events by level and rendered text.

use regex::Regex;

use crate::error::{EventfmtError, EventfmtResult};
use crate::event::Event;
use crate::format::format_event;
use crate::level::LogLevel;

/// Predicate over events. An empty filter keeps everything.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    min_level: Option<LogLevel>,
    pattern: Option<Regex>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop events below `level`. Events without a level are kept.
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = Some(level);
        self
    }

    /// Keep only events whose rendered message matches `pattern`.
    pub fn with_pattern(mut self, pattern: &str) -> EventfmtResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| {
            EventfmtError::invalid_argument(format!("bad pattern {pattern:?}: {e}"))
        })?;
        self.pattern = Some(regex);
        Ok(self)
    }

    pub fn matches(&self, event: &Event) -> bool {
        if let (Some(min), Some(level)) = (self.min_level, event.level()) {
            if level < min {
                return false;
            }
        }
        match &self.pattern {
            Some(pattern) => pattern.is_match(&format_event(event)),
            None => true,
        }
    }
}
