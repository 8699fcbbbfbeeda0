//! Pipeline diagnostics.
//!
//! Every entry is echoed to stderr (unless silent) and emitted as a `tracing`
//! event, which [`init`] routes to a log file. Stdout is left free for data
//! output.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log level for console display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth for console output
    #[serde(default)]
    pub indent: u8,
    /// Skip the console echo; the entry still reaches the log file
    #[serde(default)]
    pub silent: bool,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
            silent: false,
        }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Console rendering of the entry.
    pub fn render(&self) -> String {
        let prefix = match self.level {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        let indent = "   ".repeat(self.indent as usize);
        format!("{}{} {}", indent, prefix, self.message)
    }
}

/// Emit an entry to the tracing subscriber and, unless silent, to stderr.
pub fn log(entry: LogEntry) {
    match entry.level {
        LogLevel::Info | LogLevel::Success => tracing::info!("{}", entry.message),
        LogLevel::Warning => tracing::warn!("{}", entry.message),
        LogLevel::Error => tracing::error!("{}", entry.message),
    }

    if !entry.silent {
        eprintln!("{}", entry.render());
    }
}

/// Convenient logging functions
pub fn log_info(msg: impl Into<String>) {
    log(LogEntry::info(msg));
}

pub fn log_success(msg: impl Into<String>) {
    log(LogEntry::success(msg));
}

pub fn log_warning(msg: impl Into<String>) {
    log(LogEntry::warning(msg));
}

pub fn log_error(msg: impl Into<String>) {
    log(LogEntry::error(msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    log(LogEntry::info(msg).with_indent(indent));
}

/// Install the global subscriber writing to `log_file`.
///
/// `RUST_LOG` overrides the default `levelgrid=info` filter. Calling this
/// twice keeps the first subscriber.
pub fn init(log_file: &Path) -> std::io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("levelgrid=info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .try_init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prefixes() {
        assert_eq!(LogEntry::info("Reading").render(), "    Reading");
        assert!(LogEntry::error("boom").render().contains("❌ boom"));
        assert!(LogEntry::success("ok").with_indent(1).render().starts_with("      ✓"));
    }

    #[test]
    fn test_silent_flag() {
        let entry = LogEntry::warning("quiet").silent();
        assert!(entry.silent);
        assert_eq!(entry.level, LogLevel::Warning);
    }

    #[test]
    fn test_init_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        init(&path).unwrap();
        assert!(path.exists());
    }
}
