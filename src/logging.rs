//! Structured logging for the ecosystem service
//!
//! Provides context-rich logging tagged with the data source and, where it
//! applies, the backend table involved. Events go through `tracing`; the
//! subscriber installed by `init_logger` writes to stderr and optionally
//! appends to a log file for long-running `watch` sessions.

use std::fmt;
use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::{
    fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::model::BackendError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Parses a config value ("debug", "info", "warn"/"warning", "error").
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    fn directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// REST queries against the hosted backend.
    Rest,
    /// LISTEN/NOTIFY change feed.
    Realtime,
    /// Row mapping diagnostics.
    Mapper,
    System,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Rest => write!(f, "REST"),
            Source::Realtime => write!(f, "RT"),
            Source::Mapper => write!(f, "MAP"),
            Source::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

/// Severity hint for logging only. No behavior depends on it: every failure
/// is surfaced to the caller the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Indicates a configuration, credential or schema problem
    Unexpected,
    /// Cannot determine whether this will clear up on its own
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classify a backend failure for log severity.
pub fn classify_backend_failure(err: &BackendError) -> FailureType {
    match err {
        // Auth, schema and client errors need a human
        BackendError::Http { status, .. } if (400..500).contains(status) => FailureType::Unexpected,
        BackendError::Http { .. } => FailureType::Unknown,
        BackendError::Parse(_) | BackendError::Config(_) | BackendError::Fixture(_) => {
            FailureType::Unexpected
        }
        BackendError::Request(msg) | BackendError::Realtime(msg) => {
            if msg.contains("timed out") || msg.contains("connection") {
                FailureType::Unknown
            } else {
                FailureType::Unexpected
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Subscriber setup
// ---------------------------------------------------------------------------

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `min_level`. With `console_timestamps`
/// off, console lines are compact and carry no timestamp. When `log_file` is
/// set, every event is also appended there with full timestamps. Calling this
/// twice is harmless; the first subscriber stays installed.
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ecosystem_service={}", min_level.directive())));

    let console = if console_timestamps {
        tracing_fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_fmt::layer()
            .with_target(false)
            .without_time()
            .compact()
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file_layer = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                tracing_fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file))
                    .boxed(),
            ),
            Err(e) => {
                eprintln!("Failed to open log file {}: {}", path, e);
                None
            }
        }
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init();
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Log a general informational message
pub fn info(source: Source, table: Option<&str>, message: &str) {
    tracing::info!(source = %source, table = table.unwrap_or("-"), "{}", message);
}

/// Log a warning message
pub fn warn(source: Source, table: Option<&str>, message: &str) {
    tracing::warn!(source = %source, table = table.unwrap_or("-"), "{}", message);
}

/// Log an error message
pub fn error(source: Source, table: Option<&str>, message: &str) {
    tracing::error!(source = %source, table = table.unwrap_or("-"), "{}", message);
}

/// Log a debug message
pub fn debug(source: Source, table: Option<&str>, message: &str) {
    tracing::debug!(source = %source, table = table.unwrap_or("-"), "{}", message);
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a backend failure with automatic classification
pub fn log_backend_failure(source: Source, table: Option<&str>, operation: &str, err: &BackendError) {
    let failure_type = classify_backend_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Unexpected => error(source, table, &message),
        FailureType::Unknown => warn(source, table, &message),
    }
}

// ---------------------------------------------------------------------------
// Refresh Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of one fetch-and-map pass
pub fn log_refresh_summary(rows: usize, mapped: usize, conflicted: usize) {
    let message = format!(
        "Refresh complete: {} rows mapped to {} organizations, {} with conflicting relations",
        rows, mapped, conflicted
    );

    if conflicted == 0 {
        info(Source::Rest, None, &message);
    } else {
        warn(Source::Rest, None, &message);
    }
}
