//! Error-capture objects stored under `log_failure`.
//!
//! A [`Failure`] is a frozen description of an error: its type name, the
//! names it can also be checked as, the message, the formatted traceback
//! frames, and the chain of causes. It is plain data, so it survives a
//! trip through JSON and comes back as an equivalent failure.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;

/// A captured error plus traceback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Name of the error type.
    pub type_name: String,
    /// Other type names this failure counts as in [`Failure::check`].
    pub parents: Vec<String>,
    /// Human-readable message.
    pub message: String,
    /// Formatted traceback frames, outermost first.
    pub frames: Vec<String>,
    /// The error that caused this one, if any.
    pub cause: Option<Box<Failure>>,
}

impl Failure {
    /// Create a failure with no frames, parents, or cause.
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            parents: Vec::new(),
            message: message.into(),
            frames: Vec::new(),
            cause: None,
        }
    }

    /// Add type names this failure can also be checked as.
    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents.extend(parents.into_iter().map(Into::into));
        self
    }

    /// Attach formatted traceback frames.
    pub fn with_frames<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.frames = frames.into_iter().map(Into::into).collect();
        self
    }

    /// Attach the failure that caused this one.
    pub fn with_cause(mut self, cause: Failure) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Capture an error that is being handled right now.
    ///
    /// The static type of `err` names the failure; each `source()` in its
    /// chain becomes a nested cause. A backtrace is recorded when the
    /// process has backtraces enabled (`RUST_BACKTRACE`).
    pub fn from_error<E>(err: &E) -> Self
    where
        E: StdError + 'static,
    {
        let type_name = short_type_name(std::any::type_name::<E>());
        let frames = capture_frames();
        let mut failure = Self::new(type_name, err.to_string()).with_frames(frames);
        failure.cause = err.source().map(|src| Box::new(Self::from_source(src)));
        failure
    }

    /// Capture a dynamically-typed error from a `source()` chain.
    fn from_source(err: &(dyn StdError + 'static)) -> Self {
        let mut failure = Self::new("Error", err.to_string());
        failure.cause = err.source().map(|src| Box::new(Self::from_source(src)));
        failure
    }

    /// Is this failure of kind `kind` (its own type or one of its parents)?
    pub fn check(&self, kind: &str) -> bool {
        self.type_name == kind || self.parents.iter().any(|p| p == kind)
    }

    /// Render the traceback, causes first, the way a crash report reads.
    pub fn traceback(&self) -> String {
        let mut out = String::new();
        if let Some(cause) = &self.cause {
            out.push_str(&cause.traceback());
            out.push_str(
                "\nThe above exception was the direct cause of the following exception:\n\n",
            );
        }
        out.push_str("Traceback (most recent call last):\n");
        for frame in &self.frames {
            out.push_str("  ");
            out.push_str(frame);
            out.push('\n');
        }
        out.push_str(&self.to_string());
        out.push('\n');
        out
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

/// `core::num::ParseIntError` -> `ParseIntError`
fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

fn capture_frames() -> Vec<String> {
    let bt = Backtrace::capture();
    if bt.status() != BacktraceStatus::Captured {
        return Vec::new();
    }
    bt.to_string()
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}
