//! # Logging
//!
//! Installs the global `tracing` subscriber for the wdb binaries.
//!
//! Console output goes to stderr so it never interleaves with what the CLI
//! prints about the target on stdout. Output can additionally be mirrored to
//! a daily-rolling file.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: filter directives (e.g. `RUST_LOG=debug`, `RUST_LOG=wdb::exec=info`)
//! - `WDB_LOG_FORMAT`: `pretty` (default) or `json`
//! - `WDB_LOG_FILE`: optional log file; a directory gets a dated file name
//!
//! ## Example
//!
//! ```rust,no_run
//! use wdb_utils::init_logging;
//!
//! let _guard = init_logging().expect("Failed to initialize logging");
//! tracing::info!("debugger started");
//! ```

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Local;
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Output format variable.
pub const LOG_FORMAT_ENV: &str = "WDB_LOG_FORMAT";
/// Log file variable.
pub const LOG_FILE_ENV: &str = "WDB_LOG_FILE";

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    Info,
    /// Debug level
    Debug,
    /// Trace level
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl fmt::Display for LogLevel
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let name = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(name)
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_ascii_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// What to install
///
/// An explicit `level` wins over `RUST_LOG`; with neither, `info` is used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingOptions
{
    /// Explicit maximum level, typically from a `--log-level` flag.
    pub level: Option<LogLevel>,
    /// Console and file format.
    pub format: LogFormat,
    /// Optional log file or directory.
    pub file: Option<PathBuf>,
}

impl LoggingOptions
{
    /// Options from `WDB_LOG_FORMAT` and `WDB_LOG_FILE`.
    ///
    /// ## Errors
    ///
    /// Returns [`LoggingError::InvalidFormat`] if `WDB_LOG_FORMAT` is set to
    /// something other than `pretty` or `json`.
    pub fn from_env() -> Result<Self, LoggingError>
    {
        let format = match std::env::var(LOG_FORMAT_ENV) {
            Ok(value) if !value.trim().is_empty() => value.trim().parse()?,
            _ => LogFormat::default(),
        };
        let file = std::env::var_os(LOG_FILE_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Ok(Self {
            level: None,
            format,
            file,
        })
    }

    /// Override the level.
    #[must_use]
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self
    {
        if level.is_some() {
            self.level = level;
        }
        self
    }

    /// Override the format.
    #[must_use]
    pub fn with_format(mut self, format: Option<LogFormat>) -> Self
    {
        if let Some(format) = format {
            self.format = format;
        }
        self
    }

    fn filter(&self) -> EnvFilter
    {
        let rust_log = std::env::var("RUST_LOG").ok();
        let directive = filter_directive(self.level, rust_log.as_deref());
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()))
    }
}

/// Keeps the background file writer alive. Dropping it flushes and stops
/// file output, so hold it until `main` returns.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug)]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
}

/// Install logging configured from the environment
///
/// ## Errors
///
/// Returns an error if an environment value is invalid, a subscriber is
/// already installed, or the log file location is unusable.
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    init_logging_with(LoggingOptions::from_env()?)
}

/// Install logging with explicit options
///
/// ## Example
///
/// ```rust,no_run
/// use wdb_utils::{init_logging_with, LogFormat, LogLevel, LoggingOptions};
///
/// let options = LoggingOptions {
///     level: Some(LogLevel::Debug),
///     format: LogFormat::Json,
///     file: None,
/// };
/// let _guard = init_logging_with(options).expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if a subscriber is already installed or the log file
/// location is unusable.
pub fn init_logging_with(options: LoggingOptions) -> Result<LoggingGuard, LoggingError>
{
    let console = console_layer(options.format).with_filter(options.filter());

    let (file, guard) = match &options.file {
        Some(path) => {
            let (directory, file_name, rolling) = log_file_location(path)?;
            let appender = if rolling {
                tracing_appender::rolling::daily(directory, file_name)
            } else {
                tracing_appender::rolling::never(directory, file_name)
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = file_layer(options.format, writer).with_filter(options.filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

    Ok(LoggingGuard { _file: guard })
}

fn console_layer<S>(format: LogFormat) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(io::stderr);
    match format {
        LogFormat::Pretty => layer.with_ansi(true).boxed(),
        LogFormat::Json => layer.json().with_current_span(true).with_span_list(true).boxed(),
    }
}

fn file_layer<S>(format: LogFormat, writer: tracing_appender::non_blocking::NonBlocking) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_ansi(false)
        .with_writer(writer);
    match format {
        LogFormat::Pretty => layer.boxed(),
        LogFormat::Json => layer.json().with_current_span(true).with_span_list(true).boxed(),
    }
}

/// Filter directive: explicit level, else `RUST_LOG`, else `info`.
fn filter_directive(level: Option<LogLevel>, rust_log: Option<&str>) -> String
{
    match (level, rust_log.map(str::trim).filter(|value| !value.is_empty())) {
        (Some(level), _) => level.to_string(),
        (None, Some(directives)) => directives.to_string(),
        (None, None) => LogLevel::Info.to_string(),
    }
}

/// Split a log path into (directory, file name, rolls daily).
///
/// A file path rolls daily with the date appended by the appender. A
/// directory gets a `YYYY-MM-DD-wdb.log` file that is never rotated.
fn log_file_location(path: &Path) -> Result<(PathBuf, OsString, bool), LoggingError>
{
    if path.is_dir() {
        let name = format!("{}-wdb.log", Local::now().format("%Y-%m-%d"));
        return Ok((path.to_path_buf(), OsString::from(name), false));
    }
    let file_name = path
        .file_name()
        .ok_or_else(|| LoggingError::InvalidFile(path.to_path_buf()))?
        .to_os_string();
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&directory)?;
    Ok((directory, file_name, true))
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Unknown format name
    #[error("Unknown log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// Unknown level name
    #[error("Unknown log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// Log file path has no file name
    #[error("Log file path has no file name: {}", .0.display())]
    InvalidFile(PathBuf),

    /// A global subscriber is already installed
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// Log directory could not be created
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
