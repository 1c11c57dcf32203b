//! Runtime configuration.
//!
//! Resolved from the environment once per [`Context`](crate::Context):
//! - `FRANKENPTHREAD_SPIN`: `auto` (default), `off`, or an explicit mutex
//!   spin iteration count. `auto` spins 32 times on multiprocessor hosts and
//!   not at all on uniprocessors, where spinning only burns the holder's slice.
//! - `FRANKENPTHREAD_LOG`: `off` (default), `error`, `warn`, `info`, `debug`,
//!   `trace`.
//! - `FRANKENPTHREAD_LOG_FILE`: JSONL output path; stderr when unset.

use std::path::PathBuf;

use crate::structured_log::LogLevel;

/// Spin iterations on multiprocessor hosts when `auto` is selected.
pub const DEFAULT_MP_SPIN_COUNT: u32 = 32;

/// Upper bound accepted for an explicit spin count.
pub const MAX_SPIN_COUNT: u32 = 1 << 16;

/// How many fast-path attempts a contended mutex makes before blocking.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpinPolicy {
    /// Derive from the CPU count.
    #[default]
    Auto,
    /// Never spin; block on first contention.
    Off,
    /// Fixed iteration count.
    Fixed(u32),
}

impl SpinPolicy {
    /// Parse from string (case-insensitive). Unknown values fall back to `Auto`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "auto" | "default" | "" => Self::Auto,
            "off" | "none" | "0" | "disabled" => Self::Off,
            other => match other.parse::<u32>() {
                Ok(n) => Self::Fixed(n.min(MAX_SPIN_COUNT)),
                Err(_) => Self::Auto,
            },
        }
    }

    /// Spin iterations for a host with `cpus` logical processors.
    #[must_use]
    pub const fn resolve(self, cpus: usize) -> u32 {
        match self {
            Self::Auto => {
                if cpus > 1 {
                    DEFAULT_MP_SPIN_COUNT
                } else {
                    0
                }
            }
            Self::Off => 0,
            Self::Fixed(n) => n,
        }
    }
}

/// Parse a log level name. `None` means logging is off.
#[must_use]
pub fn parse_log_level(raw: &str) -> Option<LogLevel> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "error" => Some(LogLevel::Error),
        "warn" | "warning" => Some(LogLevel::Warn),
        "info" => Some(LogLevel::Info),
        "debug" => Some(LogLevel::Debug),
        "trace" | "all" => Some(LogLevel::Trace),
        _ => None,
    }
}

/// Library configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Mutex spin policy.
    pub spin: SpinPolicy,
    /// Minimum level written to the log sink; `None` disables logging.
    pub log_level: Option<LogLevel>,
    /// JSONL destination; stderr when `None`.
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Read configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let spin = lookup("FRANKENPTHREAD_SPIN")
            .map(|v| SpinPolicy::from_str_loose(&v))
            .unwrap_or_default();
        let log_level = lookup("FRANKENPTHREAD_LOG").and_then(|v| parse_log_level(&v));
        let log_file = lookup("FRANKENPTHREAD_LOG_FILE")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self {
            spin,
            log_level,
            log_file,
        }
    }

    /// Override the spin policy.
    #[must_use]
    pub fn with_spin(mut self, spin: SpinPolicy) -> Self {
        self.spin = spin;
        self
    }

    /// Override the log level.
    #[must_use]
    pub fn with_log_level(mut self, level: Option<LogLevel>) -> Self {
        self.log_level = level;
        self
    }

    /// Spin count for this host.
    #[must_use]
    pub fn spin_count(&self) -> u32 {
        self.spin.resolve(host_cpu_count())
    }
}

/// Logical processor count, 1 when the host cannot tell.
#[must_use]
pub fn host_cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}
