//! Engine log routing.
//!
//! The engine reports diagnostics through a single registered callback.
//! [`LogBridge`] owns the function slot behind that callback; the default
//! handler forwards messages to the `log` facade under the `liblouis`
//! target.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::engine::{Engine, FunctionHandle, LogFn};
use crate::error::Result;

/// `log` target used for messages originating in the engine.
pub const LOG_TARGET: &str = "liblouis";

/// Engine log severities, matching liblouis' `logLevels`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    All,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Off,
}

/// Host output channel a severity is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleChannel {
    /// General-purpose channel, also the fallback for unknown levels.
    Log,
    Info,
    Warn,
    Error,
}

impl ConsoleChannel {
    /// The `log` crate level this channel writes at.
    pub fn level(self) -> log::Level {
        match self {
            Self::Log => log::Level::Debug,
            Self::Info => log::Level::Info,
            Self::Warn => log::Level::Warn,
            Self::Error => log::Level::Error,
        }
    }
}

impl LogSeverity {
    pub const ALL: [LogSeverity; 7] = [
        Self::All,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::Fatal,
        Self::Off,
    ];

    /// Numeric level as the engine understands it.
    pub fn level(self) -> i32 {
        match self {
            Self::All => 0,
            Self::Debug => 10000,
            Self::Info => 20000,
            Self::Warn => 30000,
            Self::Error => 40000,
            Self::Fatal => 50000,
            Self::Off => 60000,
        }
    }

    /// Look up an engine level. Only the seven exact values are known.
    pub fn from_level(level: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.level() == level)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
            Self::Off => "OFF",
        }
    }

    /// Parse a severity name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|sev| sev.name().eq_ignore_ascii_case(s))
    }

    /// Channel for messages at this severity. `Off` has none.
    pub fn channel(self) -> Option<ConsoleChannel> {
        match self {
            Self::All | Self::Debug => Some(ConsoleChannel::Log),
            Self::Info => Some(ConsoleChannel::Info),
            Self::Warn => Some(ConsoleChannel::Warn),
            Self::Error | Self::Fatal => Some(ConsoleChannel::Error),
            Self::Off => None,
        }
    }
}

impl std::fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Format an engine message as `[SEVERITY] message`.
///
/// Unknown levels are shown numerically.
pub fn format_message(level: i32, message: &str) -> String {
    match LogSeverity::from_level(level) {
        Some(severity) => format!("[{severity}] {message}"),
        None => format!("[{level}] {message}"),
    }
}

/// Channel an engine level routes to, falling back to [`ConsoleChannel::Log`].
pub fn route(level: i32) -> ConsoleChannel {
    LogSeverity::from_level(level)
        .and_then(LogSeverity::channel)
        .unwrap_or(ConsoleChannel::Log)
}

/// Handler installed when no custom callback is supplied.
pub fn default_log_callback(level: i32, message: &str) {
    log::log!(target: LOG_TARGET, route(level).level(), "{}", format_message(level, message));
}

/// Registry of the engine's single active log callback.
///
/// The previous slot is always removed before a new one is installed, so
/// repeated registration never accumulates engine function slots.
#[derive(Debug, Default)]
pub struct LogBridge {
    active: Mutex<Option<FunctionHandle>>,
}

impl LogBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of the currently installed callback, if any.
    pub fn active(&self) -> Option<FunctionHandle> {
        *self.active.lock()
    }

    /// Install `callback`, or [`default_log_callback`] when `None`.
    pub fn register<E: Engine + ?Sized>(&self, engine: &E, callback: Option<LogFn>) -> Result<()> {
        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            engine.register_log_callback(None);
            engine.remove_function(previous)?;
        }

        let callback: LogFn = match callback {
            Some(callback) => callback,
            None => Arc::new(default_log_callback),
        };
        let handle = engine.add_function(callback)?;
        engine.register_log_callback(Some(handle));
        *active = Some(handle);
        Ok(())
    }

    /// Remove the active callback, if any.
    pub fn unregister<E: Engine + ?Sized>(&self, engine: &E) -> Result<()> {
        if let Some(previous) = self.active.lock().take() {
            engine.register_log_callback(None);
            engine.remove_function(previous)?;
        }
        Ok(())
    }
}
