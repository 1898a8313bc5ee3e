//! JSON-lines log files.
//!
//! Each record is `0x1E` + one JSON event + `\n`. The leading record
//! separator lets a reader tell a complete record from one cut short by
//! a crash: a record that does not end in a newline is skipped. Plain
//! newline-delimited files (no separators) are read too.

use std::io::{self, BufRead, Write};

use rayon::prelude::*;
use tracing::warn;

use super::codec::JsonCodec;
use crate::error::RecordError;
use crate::event::Event;

/// ASCII record separator written before every record.
pub const RECORD_SEPARATOR: u8 = 0x1E;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// Records start with a separator and must end with `\n`.
    Separated(u8),
    /// One record per line.
    Lines,
}

impl Framing {
    fn from_separator(separator: u8) -> Self {
        if separator == b'\n' {
            Self::Lines
        } else {
            Self::Separated(separator)
        }
    }

    /// A leading record separator selects separator framing.
    fn detect(head: &[u8]) -> Self {
        if head.first() == Some(&RECORD_SEPARATOR) {
            Self::Separated(RECORD_SEPARATOR)
        } else {
            Self::Lines
        }
    }

    fn delimiter(self) -> u8 {
        match self {
            Self::Separated(separator) => separator,
            Self::Lines => b'\n',
        }
    }

    fn check(self, record: &[u8]) -> Result<(), RecordError> {
        match self {
            Self::Separated(_) if !record.ends_with(b"\n") => Err(RecordError::Truncated),
            _ => Ok(()),
        }
    }
}

/// Writes events as separator-framed JSON lines.
pub struct JsonLogWriter<W: Write> {
    out: W,
    codec: JsonCodec,
    separator: Option<u8>,
}

impl<W: Write> JsonLogWriter<W> {
    pub fn new(out: W) -> Self {
        Self::with_codec(out, JsonCodec::new())
    }

    pub fn with_codec(out: W, codec: JsonCodec) -> Self {
        Self {
            out,
            codec,
            separator: Some(RECORD_SEPARATOR),
        }
    }

    /// Write bare newline-delimited JSON instead.
    pub fn without_separator(mut self) -> Self {
        self.separator = None;
        self
    }

    /// Flatten and write one event.
    pub fn write_event(&mut self, event: &mut Event) -> io::Result<()> {
        let json = self.codec.event_as_json(event);
        if let Some(separator) = self.separator {
            self.out.write_all(&[separator])?;
        }
        self.out.write_all(json.as_bytes())?;
        self.out.write_all(b"\n")
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Streaming reader returned by [`events_from_json_log`].
pub struct JsonLogReader<R> {
    reader: R,
    framing: Option<Framing>,
    codec: JsonCodec,
    index: usize,
    done: bool,
}

/// Read events from a JSON-lines log.
///
/// `separator` picks the framing; `None` detects it from the first byte.
/// Unreadable records are logged and skipped. An I/O error ends the
/// iteration.
pub fn events_from_json_log<R: BufRead>(reader: R, separator: Option<u8>) -> JsonLogReader<R> {
    JsonLogReader {
        reader,
        framing: separator.map(Framing::from_separator),
        codec: JsonCodec::new(),
        index: 0,
        done: false,
    }
}

impl<R: BufRead> JsonLogReader<R> {
    /// Decode with a caller-supplied codec.
    pub fn with_codec(mut self, codec: JsonCodec) -> Self {
        self.codec = codec;
        self
    }

    fn framing(&mut self) -> io::Result<Framing> {
        if let Some(framing) = self.framing {
            return Ok(framing);
        }
        let framing = Framing::detect(self.reader.fill_buf()?);
        self.framing = Some(framing);
        Ok(framing)
    }

    /// Next raw record without its delimiter, `None` at end of input.
    fn next_record(&mut self, framing: Framing) -> io::Result<Option<Vec<u8>>> {
        let delimiter = framing.delimiter();
        let mut record = Vec::new();
        if self.reader.read_until(delimiter, &mut record)? == 0 {
            return Ok(None);
        }
        if record.last() == Some(&delimiter) {
            record.pop();
        }
        Ok(Some(record))
    }
}

impl<R: BufRead> Iterator for JsonLogReader<R> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        while !self.done {
            let step = self
                .framing()
                .and_then(|framing| Ok((framing, self.next_record(framing)?)));
            let (framing, record) = match step {
                Ok((framing, Some(record))) => (framing, record),
                Ok((_, None)) => {
                    self.done = true;
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "stopped reading JSON log");
                    self.done = true;
                    break;
                }
            };
            if record.is_empty() {
                continue;
            }
            self.index += 1;
            match framing
                .check(&record)
                .and_then(|()| decode_record(&record, &self.codec))
            {
                Ok(event) => return Some(event),
                Err(err) => warn_skipped(self.index, &record, &err),
            }
        }
        None
    }
}

fn warn_skipped(index: usize, record: &[u8], err: &RecordError) {
    warn!(
        record = index,
        data = %String::from_utf8_lossy(record),
        error = %err,
        "skipping log record"
    );
}

/// Decode one complete record.
pub fn decode_record(record: &[u8], codec: &JsonCodec) -> Result<Event, RecordError> {
    let text = std::str::from_utf8(record)?;
    Ok(codec.event_from_json(text)?)
}

/// Split a whole log into complete records, dropping empty and truncated
/// ones. Framing is detected as in [`events_from_json_log`].
pub fn split_records(data: &[u8], separator: Option<u8>) -> Vec<&[u8]> {
    let framing = separator.map_or_else(|| Framing::detect(data), Framing::from_separator);
    data.split(|&b| b == framing.delimiter())
        .filter(|record| !record.is_empty())
        .enumerate()
        .filter_map(|(i, record)| match framing.check(record) {
            Ok(()) => Some(record),
            Err(err) => {
                warn_skipped(i + 1, record, &err);
                None
            }
        })
        .collect()
}

/// Decode records in parallel, keeping their order and skipping bad ones.
pub fn decode_records(records: &[&[u8]], codec: &JsonCodec) -> Vec<Event> {
    records
        .par_iter()
        .enumerate()
        .filter_map(|(i, record)| match decode_record(record, codec) {
            Ok(event) => Some(event),
            Err(err) => {
                warn_skipped(i + 1, record, &err);
                None
            }
        })
        .collect()
}
