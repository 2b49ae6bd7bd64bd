//! Structured logging.
//!
//! A [`Logger`] is an immutable `tracing` dispatcher built for one level and
//! output format. It is never reconfigured in place: when the resolved
//! `loglevel` becomes known, a new logger is built and swapped into the
//! [`LoggerHandle`] every command holds, so the rebuild is visible to all of
//! them at the moment they log.

use std::fmt;
use std::io::{self, IsTerminal};
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tracing::Dispatch;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;

/// Logger construction errors
#[derive(Debug, Error)]
pub enum LogError {
    #[error("unrecognized level: {0:?}")]
    InvalidLevel(String),

    #[error("unrecognized log format: {0:?} (expected \"console\" or \"json\")")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, LogError>;

/// Logging verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    /// Accepts the usual level names in any case. An empty value means
    /// `info`; `dpanic`, `panic` and `fatal` all map to `error`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "" | "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" | "dpanic" | "panic" | "fatal" => Ok(LogLevel::Error),
            _ => Err(LogError::InvalidLevel(s.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log record encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Console,
    /// One JSON object per record
    Json,
}

impl FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "console" => Ok(LogFormat::Console),
            "json" => Ok(LogFormat::Json),
            _ => Err(LogError::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Console => f.write_str("console"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// Build a logger from textual level and format names.
pub fn new_logger(level: &str, format: &str) -> Result<Logger> {
    Ok(Logger::new(level.parse()?, format.parse()?))
}

/// A structured logger writing to stderr through a background writer.
pub struct Logger {
    level: LogLevel,
    format: LogFormat,
    dispatch: Dispatch,
    guard: Option<WorkerGuard>,
}

impl Logger {
    pub fn new(level: LogLevel, format: LogFormat) -> Self {
        let ansi = io::stderr().is_terminal() && console::colors_enabled_stderr();
        let (writer, guard) = tracing_appender::non_blocking(io::stderr());
        Self::with_writer(level, format, writer, ansi, Some(guard))
    }

    pub(crate) fn with_writer<W>(
        level: LogLevel,
        format: LogFormat,
        writer: W,
        ansi: bool,
        guard: Option<WorkerGuard>,
    ) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let builder = tracing_subscriber::fmt()
            .with_max_level(level.filter())
            .with_target(false)
            .with_ansi(ansi)
            .with_writer(writer);

        let dispatch = match format {
            LogFormat::Console => Dispatch::new(builder.finish()),
            LogFormat::Json => Dispatch::new(builder.json().with_ansi(false).finish()),
        };

        Self {
            level,
            format,
            dispatch,
            guard,
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Block until buffered records are written. Records emitted after this
    /// are dropped.
    pub fn sync(&mut self) {
        drop(self.guard.take());
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("format", &self.format)
            .field("synced", &self.guard.is_none())
            .finish()
    }
}

/// Shared, replaceable reference to the current [`Logger`].
#[derive(Debug, Clone)]
pub struct LoggerHandle {
    current: Arc<RwLock<Logger>>,
}

impl LoggerHandle {
    pub fn new(logger: Logger) -> Self {
        Self {
            current: Arc::new(RwLock::new(logger)),
        }
    }

    /// Install `logger`, flushing the one it replaces.
    pub fn replace(&self, logger: Logger) {
        let mut previous = std::mem::replace(&mut *self.write(), logger);
        previous.sync();
    }

    pub fn level(&self) -> LogLevel {
        self.read().level()
    }

    pub fn format(&self) -> LogFormat {
        self.read().format()
    }

    /// Run `f` with the current logger as the thread's default dispatcher.
    ///
    /// The dispatcher is captured when `f` starts; a `replace` from inside
    /// `f` takes effect on the next call.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        let dispatch = self.read().dispatch().clone();
        tracing::dispatcher::with_default(&dispatch, f)
    }

    pub fn sync(&self) {
        self.write().sync();
    }

    fn read(&self) -> RwLockReadGuard<'_, Logger> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Logger> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory log sink.
    #[derive(Clone, Default)]
    pub(crate) struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    pub(crate) fn captured(level: LogLevel, format: LogFormat) -> (Logger, Capture) {
        let capture = Capture::default();
        let logger = Logger::with_writer(level, format, capture.clone(), false, None);
        (logger, capture)
    }

    #[test]
    fn parses_level_names_case_insensitively() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("Warn".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("".parse::<LogLevel>().unwrap(), LogLevel::Info);
    }

    #[test]
    fn panic_levels_map_to_error() {
        for name in ["dpanic", "panic", "fatal"] {
            assert_eq!(name.parse::<LogLevel>().unwrap(), LogLevel::Error);
        }
    }

    #[test]
    fn rejects_unknown_level() {
        let err = "chatty".parse::<LogLevel>().unwrap_err();
        assert!(err.to_string().contains("chatty"), "unexpected error: {err}");
    }

    #[test]
    fn new_logger_rejects_unknown_format() {
        let err = new_logger("info", "xml").unwrap_err();
        assert!(matches!(err, LogError::InvalidFormat(_)));
    }

    #[test]
    fn new_logger_builds_requested_level_and_format() {
        let logger = new_logger("error", "json").unwrap();
        assert_eq!(logger.level(), LogLevel::Error);
        assert_eq!(logger.format(), LogFormat::Json);
    }

    #[test]
    fn records_below_level_are_filtered() {
        let (logger, capture) = captured(LogLevel::Warn, LogFormat::Console);
        let handle = LoggerHandle::new(logger);

        handle.scope(|| {
            tracing::info!("hidden record");
            tracing::warn!("visible record");
        });

        let out = capture.contents();
        assert!(!out.contains("hidden record"));
        assert!(out.contains("visible record"));
    }

    #[test]
    fn console_output_without_ansi_has_no_escapes() {
        let (logger, capture) = captured(LogLevel::Info, LogFormat::Console);
        LoggerHandle::new(logger).scope(|| tracing::info!(key = "tf-dir", "resolved"));

        let out = capture.contents();
        assert!(out.contains("resolved"));
        assert!(!out.contains('\x1b'), "unexpected escapes: {out:?}");
    }

    #[test]
    fn json_format_emits_json_objects() {
        let (logger, capture) = captured(LogLevel::Info, LogFormat::Json);
        LoggerHandle::new(logger).scope(|| tracing::info!(key = "tf-dir", "resolved"));

        let line = capture.contents();
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["fields"]["message"], "resolved");
        assert_eq!(value["fields"]["key"], "tf-dir");
    }

    #[test]
    fn replacement_is_visible_through_every_clone() {
        let (bootstrap, first) = captured(LogLevel::Debug, LogFormat::Console);
        let handle = LoggerHandle::new(bootstrap);
        let held_by_command = handle.clone();

        let (resolved, second) = captured(LogLevel::Error, LogFormat::Console);
        handle.replace(resolved);

        assert_eq!(held_by_command.level(), LogLevel::Error);
        held_by_command.scope(|| tracing::debug!("after rebuild"));
        assert!(!first.contents().contains("after rebuild"));
        assert!(!second.contents().contains("after rebuild"));
    }
}
