//! Stderr logger for hostprep.
//!
//! The library reports diagnostics through the `log` facade. [`Logger`]
//! is the sink the CLI installs: it prints `LEVEL: message` lines to stderr
//! filtered by a [`LogLevel`].

use std::env;
use std::fmt;

use log::{LevelFilter, Metadata, Record, SetLoggerError};

/// Environment variable consulted when no CLI flag sets the level.
pub const LOG_MODE_ENV: &str = "HOSTPREP_LOG_MODE";

/// Logging level for controlling output verbosity.
///
/// # Examples
///
/// ```
/// use hostprep::LogLevel;
///
/// assert!(LogLevel::Quiet < LogLevel::Normal);
/// assert!(LogLevel::Normal < LogLevel::Verbose);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Print nothing.
    Quiet,
    /// Errors and warnings. Warnings include stripped reserved variables and
    /// defaulted availability.
    Normal,
    /// Everything, including the resolved document and per-secret progress.
    Verbose,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quiet => write!(f, "quiet"),
            Self::Normal => write!(f, "normal"),
            Self::Verbose => write!(f, "verbose"),
        }
    }
}

impl LogLevel {
    /// Parses a log level from a string (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not one of `quiet`, `normal` or
    /// `verbose`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hostprep::LogLevel;
    ///
    /// assert_eq!(LogLevel::parse("VERBOSE").unwrap(), LogLevel::Verbose);
    /// assert!(LogLevel::parse("chatty").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "quiet" => Ok(Self::Quiet),
            "normal" => Ok(Self::Normal),
            "verbose" => Ok(Self::Verbose),
            _ => Err(format!("invalid log level: {s}")),
        }
    }

    /// The `log` crate filter matching this level.
    #[must_use]
    pub const fn filter(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::Off,
            Self::Normal => LevelFilter::Warn,
            Self::Verbose => LevelFilter::Debug,
        }
    }
}

/// A stderr logger honoring a [`LogLevel`].
///
/// # Examples
///
/// ```
/// use hostprep::{LogLevel, Logger};
///
/// let logger = Logger::new(LogLevel::Normal);
/// assert_eq!(logger.level(), LogLevel::Normal);
/// ```
#[derive(Debug)]
pub struct Logger {
    level: LogLevel,
}

impl Logger {
    /// Creates a new logger with the specified log level.
    #[must_use]
    pub const fn new(level: LogLevel) -> Self {
        Self { level }
    }

    /// Returns the current log level.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }

    /// Register this logger as the global `log` sink.
    ///
    /// # Errors
    ///
    /// Fails if a global logger has already been installed.
    pub fn install(self) -> Result<(), SetLoggerError> {
        let filter = self.level.filter();
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(filter);
        Ok(())
    }

    fn line(record: &Record<'_>) -> String {
        let tag = match record.level() {
            log::Level::Error => "ERROR",
            log::Level::Warn => "WARN",
            log::Level::Info => "INFO",
            log::Level::Debug | log::Level::Trace => "DEBUG",
        };
        format!("{tag}: {}", record.args())
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(LogLevel::Normal)
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level.filter()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("{}", Self::line(record));
        }
    }

    fn flush(&self) {}
}

/// Picks a logger from CLI flags, then `HOSTPREP_LOG_MODE`, then Normal.
///
/// `verbose` wins when both flags are set.
///
/// # Examples
///
/// ```
/// use hostprep::{init_logger, LogLevel};
///
/// assert_eq!(init_logger(true, true).level(), LogLevel::Verbose);
/// assert_eq!(init_logger(false, true).level(), LogLevel::Quiet);
/// ```
#[must_use]
pub fn init_logger(verbose: bool, quiet: bool) -> Logger {
    if verbose {
        return Logger::new(LogLevel::Verbose);
    }
    if quiet {
        return Logger::new(LogLevel::Quiet);
    }

    env::var(LOG_MODE_ENV)
        .ok()
        .and_then(|value| LogLevel::parse(&value).ok())
        .map_or_else(Logger::default, Logger::new)
}
