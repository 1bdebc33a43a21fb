//! Structured stderr logging
//!
//! Log lines are timestamped and carry `key=value` fields. Field values are
//! filtered by key name: key material is never printed, and digests,
//! signatures and addresses are shortened to a recognizable prefix/suffix.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

/// Process-wide minimum level; entries below it are dropped
static MIN_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Warn as u8);

/// Set the minimum level that will be written
pub fn set_min_level(level: LogLevel) {
    MIN_LEVEL.store(level as u8, Ordering::SeqCst);
}

pub fn min_level() -> LogLevel {
    LogLevel::from_u8(MIN_LEVEL.load(Ordering::SeqCst))
}

/// Check whether an entry at `level` would be written
pub fn is_enabled(level: LogLevel) -> bool {
    level >= min_level()
}

/// Log levels, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// Structured log entry
#[derive(Debug)]
pub struct LogEntry {
    pub level: LogLevel,
    pub module: &'static str,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, module: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            module,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field, filtered by its key name
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let value = filter_field(key, &value.to_string());
        self.fields.push((key, value));
        self
    }

    /// Render the line without writing it
    pub fn render(&self) -> String {
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        let mut line = format!("[{}] {} [{}] {}", timestamp, self.level, self.module, self.message);
        if !self.fields.is_empty() {
            let fields = self
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            line.push_str(" | ");
            line.push_str(&fields);
        }
        line
    }

    /// Write the entry to stderr if its level is enabled
    pub fn log(self) {
        if is_enabled(self.level) {
            eprintln!("{}", self.render());
        }
    }
}

fn filter_field(key: &str, value: &str) -> String {
    let key = key.to_ascii_lowercase();

    if ["private_key", "secret", "seed", "key_hex", "signing_key"]
        .iter()
        .any(|k| key.contains(k))
    {
        return redact(value);
    }
    if ["digest", "hash", "separator", "signature", "salt"]
        .iter()
        .any(|k| key.contains(k))
    {
        return shorten(value, 10, 6);
    }
    if ["address", "signer", "contract", "wallet"].iter().any(|k| key.contains(k)) {
        return shorten(value, 8, 4);
    }
    value.to_string()
}

fn redact(value: &str) -> String {
    if value.is_empty() {
        "[EMPTY]".to_string()
    } else {
        format!("[REDACTED:{}chars]", value.len())
    }
}

/// Keep `head` leading and `tail` trailing chars; short values pass through
fn shorten(value: &str, head: usize, tail: usize) -> String {
    let trimmed = value.trim();
    if !trimmed.is_ascii() || trimmed.len() <= head + tail + 3 {
        return trimmed.to_string();
    }
    format!("{}...{}", &trimmed[..head], &trimmed[trimmed.len() - tail..])
}

/// Convenience macro for debug logging
#[macro_export]
macro_rules! log_debug {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new($crate::utils::logging::LogLevel::Debug, $module, $msg).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        if $crate::utils::logging::is_enabled($crate::utils::logging::LogLevel::Debug) {
            $crate::utils::logging::LogEntry::new($crate::utils::logging::LogLevel::Debug, $module, $msg)
                $(.field(stringify!($key), &$value))*
                .log()
        }
    };
}

/// Convenience macro for info logging
#[macro_export]
macro_rules! log_info {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new($crate::utils::logging::LogLevel::Info, $module, $msg).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        if $crate::utils::logging::is_enabled($crate::utils::logging::LogLevel::Info) {
            $crate::utils::logging::LogEntry::new($crate::utils::logging::LogLevel::Info, $module, $msg)
                $(.field(stringify!($key), &$value))*
                .log()
        }
    };
}

/// Convenience macro for warning logging
#[macro_export]
macro_rules! log_warn {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new($crate::utils::logging::LogLevel::Warn, $module, $msg).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new($crate::utils::logging::LogLevel::Warn, $module, $msg)
            $(.field(stringify!($key), &$value))*
            .log()
    };
}
