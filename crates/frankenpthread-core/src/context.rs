//! Process-lifetime library state.
//!
//! Everything that would otherwise be a hidden global (clock, configuration,
//! derived spin count, thread table, log sink) hangs off a [`Context`].
//! Primitives built with `new()` use [`Context::global`]; tests and embedders
//! inject their own with `with_context`.

use std::sync::{Arc, OnceLock};

use crate::config::Config;
use crate::pthread::thread::ThreadTable;
use crate::structured_log::{LogLevel, LogSink};
use crate::time::{Clock, SystemClock};

/// Shared library state.
#[derive(Debug)]
pub struct Context {
    config: Config,
    spin_count: u32,
    clock: Arc<dyn Clock>,
    log: LogSink,
    threads: ThreadTable,
}

static GLOBAL: OnceLock<Arc<Context>> = OnceLock::new();

impl Context {
    /// Build a context whose log sink follows `config`.
    #[must_use]
    pub fn new(config: Config, clock: Arc<dyn Clock>) -> Self {
        let log = sink_for(&config);
        Self::with_log(config, clock, log)
    }

    /// Build a context with an explicit log sink.
    #[must_use]
    pub fn with_log(config: Config, clock: Arc<dyn Clock>, log: LogSink) -> Self {
        let spin_count = config.spin_count();
        Self {
            config,
            spin_count,
            clock,
            log,
            threads: ThreadTable::new(),
        }
    }

    /// Environment configuration and the host clock.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(Config::from_env(), Arc::new(SystemClock::new()))
    }

    /// The process-wide default context, built on first use.
    pub fn global() -> &'static Arc<Self> {
        GLOBAL.get_or_init(|| Arc::new(Self::from_env()))
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutex fast-path attempts before blocking.
    #[must_use]
    pub fn spin_count(&self) -> u32 {
        self.spin_count
    }

    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    #[must_use]
    pub fn log(&self) -> &LogSink {
        &self.log
    }

    pub(crate) fn threads(&self) -> &ThreadTable {
        &self.threads
    }

    /// Threads created through this context and not yet reclaimed.
    #[must_use]
    pub fn live_threads(&self) -> usize {
        self.threads.len()
    }
}

fn sink_for(config: &Config) -> LogSink {
    let Some(level) = config.log_level else {
        return LogSink::disabled();
    };
    match &config.log_file {
        Some(path) => LogSink::to_file(path, level).unwrap_or_else(|err| {
            let sink = LogSink::stderr(level);
            sink.emit_with(LogLevel::Warn, "log_file_unavailable", |e| {
                e.with_details(serde_json::json!({
                    "path": path.display().to_string(),
                    "error": err.to_string(),
                }))
            });
            sink
        }),
        None => LogSink::stderr(level),
    }
}
