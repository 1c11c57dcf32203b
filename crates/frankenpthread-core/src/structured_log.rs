//! Structured JSONL logging for lifecycle and slow-path events.
//!
//! Provides:
//! - [`LogEntry`]: one JSONL record with required + optional fields.
//! - [`LogSink`]: level-filtered writer owned by the process context.
//!
//! Uncontended lock paths never build entries; callers check
//! [`LogSink::enabled`] first.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Severity level, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Canonical structured log entry.
///
/// Required fields: `timestamp`, `trace_id`, `level`, `event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,

    /// Primitive family (`mutex`, `thread`, `semaphore`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primitive: Option<String>,
    /// Operation name (`lock`, `join`, `open`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    /// Library thread id of the subject thread.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errno: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ns: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// Create a new entry with required fields only.
    #[must_use]
    pub fn new(trace_id: impl Into<String>, level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: trace_id.into(),
            level,
            event: event.into(),
            primitive: None,
            op: None,
            thread: None,
            errno: None,
            latency_ns: None,
            details: None,
        }
    }

    /// Set the primitive family and operation.
    #[must_use]
    pub fn with_op(mut self, primitive: impl Into<String>, op: impl Into<String>) -> Self {
        self.primitive = Some(primitive.into());
        self.op = Some(op.into());
        self
    }

    /// Set the subject thread id.
    #[must_use]
    pub fn with_thread(mut self, id: u64) -> Self {
        self.thread = Some(id);
        self
    }

    /// Set errno.
    #[must_use]
    pub fn with_errno(mut self, errno: i32) -> Self {
        self.errno = Some(errno);
        self
    }

    /// Set latency in nanoseconds.
    #[must_use]
    pub fn with_latency_ns(mut self, ns: u64) -> Self {
        self.latency_ns = Some(ns);
        self
    }

    /// Set free-form details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

enum Target {
    Discard,
    Stderr,
    File(Mutex<BufWriter<File>>),
    Buffer(Mutex<Vec<u8>>),
}

/// Level-filtered JSONL writer.
///
/// Write failures are swallowed: a full disk must never turn an unlock into
/// an error.
pub struct LogSink {
    min_level: Option<LogLevel>,
    target: Target,
    run_id: String,
    seq: AtomicU64,
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let target = match self.target {
            Target::Discard => "discard",
            Target::Stderr => "stderr",
            Target::File(_) => "file",
            Target::Buffer(_) => "buffer",
        };
        f.debug_struct("LogSink")
            .field("min_level", &self.min_level)
            .field("target", &target)
            .field("run_id", &self.run_id)
            .finish()
    }
}

impl LogSink {
    /// A sink that drops everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::with_target(None, Target::Discard)
    }

    /// Write entries at or above `level` to stderr.
    #[must_use]
    pub fn stderr(level: LogLevel) -> Self {
        Self::with_target(Some(level), Target::Stderr)
    }

    /// Write entries at or above `level` to `path`, truncating it.
    pub fn to_file(path: &Path, level: LogLevel) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::with_target(
            Some(level),
            Target::File(Mutex::new(BufWriter::new(file))),
        ))
    }

    /// Capture entries in memory (for tests).
    #[must_use]
    pub fn buffer(level: LogLevel) -> Self {
        Self::with_target(Some(level), Target::Buffer(Mutex::new(Vec::new())))
    }

    fn with_target(min_level: Option<LogLevel>, target: Target) -> Self {
        Self {
            min_level,
            target,
            run_id: format!("fpt-{}", std::process::id()),
            seq: AtomicU64::new(0),
        }
    }

    /// True when an entry at `level` would be written.
    #[inline]
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        match self.min_level {
            Some(min) => level >= min && !matches!(self.target, Target::Discard),
            None => false,
        }
    }

    /// Generate the next trace id.
    #[must_use]
    pub fn next_trace_id(&self) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}::{:06}", self.run_id, seq)
    }

    /// Start an entry with an auto-generated trace id.
    #[must_use]
    pub fn entry(&self, level: LogLevel, event: &str) -> LogEntry {
        LogEntry::new(self.next_trace_id(), level, event)
    }

    /// Write an entry if its level passes the filter.
    pub fn emit(&self, entry: &LogEntry) {
        if !self.enabled(entry.level) {
            return;
        }
        let Ok(line) = entry.to_jsonl() else {
            return;
        };
        match &self.target {
            Target::Discard => {}
            Target::Stderr => {
                let _ = writeln!(std::io::stderr().lock(), "{line}");
            }
            Target::File(writer) => {
                let mut writer = writer.lock();
                let _ = writeln!(writer, "{line}");
                let _ = writer.flush();
            }
            Target::Buffer(buf) => {
                let mut buf = buf.lock();
                buf.extend_from_slice(line.as_bytes());
                buf.push(b'\n');
            }
        }
    }

    /// Build and emit in one step when `level` is enabled.
    pub fn emit_with(&self, level: LogLevel, event: &str, build: impl FnOnce(LogEntry) -> LogEntry) {
        if self.enabled(level) {
            let entry = build(self.entry(level, event));
            self.emit(&entry);
        }
    }

    /// Captured lines of a buffer sink; empty for other targets.
    #[must_use]
    pub fn captured_lines(&self) -> Vec<String> {
        match &self.target {
            Target::Buffer(buf) => String::from_utf8_lossy(&buf.lock())
                .lines()
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// RFC 3339 UTC timestamp with millisecond precision.
fn now_utc() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();
    let (year, month, day) = civil_from_days((secs / 86_400) as i64);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        year,
        month,
        day,
        (secs % 86_400) / 3600,
        (secs % 3600) / 60,
        secs % 60,
        millis,
    )
}

/// Days since 1970-01-01 to (year, month, day) in the proleptic Gregorian calendar.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
