use super::{GlobalConfig, dispatch::DispatchLogLevel};
use alloc::{string::ToString, sync::Arc, vec::Vec};
use core::fmt::Display;
use hashbrown::HashMap;

#[cfg(std_io)]
use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::PathBuf,
};

/// Configuration for logging, parameterized by a log level type.
///
/// Note that you can use multiple outputs at the same time.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct LoggerConfig<L: LogLevel> {
    /// Path to the log file, if file logging is enabled.
    #[serde(default)]
    #[cfg(std_io)]
    pub file: Option<PathBuf>,

    /// Whether to append to the log file (true) or overwrite it (false). Defaults to true.
    #[serde(default = "append_default")]
    pub append: bool,

    /// Whether to log to standard output.
    #[serde(default)]
    pub stdout: bool,

    /// Whether to log to standard error.
    #[serde(default)]
    pub stderr: bool,

    /// Optional crate-level logging configuration (e.g., info, debug, trace).
    #[serde(default)]
    pub log: Option<LogCrateLevel>,

    /// The log level for this logger, determining verbosity.
    #[serde(default)]
    pub level: L,
}

impl<L: LogLevel> Default for LoggerConfig<L> {
    fn default() -> Self {
        Self {
            #[cfg(std_io)]
            file: None,
            append: true,
            stdout: false,
            stderr: false,
            log: None,
            level: L::default(),
        }
    }
}

/// Log levels using the `log` crate.
#[derive(
    Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize, Hash, PartialEq, Eq,
)]
pub enum LogCrateLevel {
    /// Logs informational messages.
    #[default]
    #[serde(rename = "info")]
    Info,

    /// Logs debugging messages.
    #[serde(rename = "debug")]
    Debug,

    /// Logs trace-level messages.
    #[serde(rename = "trace")]
    Trace,
}

fn append_default() -> bool {
    true
}

/// Trait for types that can be used as log levels in `LoggerConfig`.
pub trait LogLevel:
    serde::de::DeserializeOwned + serde::Serialize + Clone + Copy + core::fmt::Debug + Default
{
}

/// Process-wide logger, created on first use.
static DISPATCH_LOGGER: spin::Mutex<Option<Logger>> = spin::Mutex::new(None);

/// Runs `func` with the process-wide logger.
pub fn with_logger<R, F: FnOnce(&mut Logger) -> R>(func: F) -> R {
    let mut state = DISPATCH_LOGGER.lock();
    let logger = state.get_or_insert_with(Logger::new);
    func(logger)
}

/// Logs the message built by `msg` when the dispatch log level is at least `level`.
///
/// The message is only formatted when it is going to be written somewhere.
pub fn log_dispatch<S: Display, F: FnOnce() -> S>(level: DispatchLogLevel, msg: F) {
    with_logger(|logger| {
        if logger.is_dispatch_enabled(level) {
            logger.log_dispatch(&msg());
        }
    })
}

/// Central logging utility, managing multiple log outputs.
#[derive(Debug)]
pub struct Logger {
    /// Collection of logger instances (file, stdout, stderr, or crate-level).
    loggers: Vec<LoggerKind>,

    /// Indices of loggers used for dispatch logging.
    dispatch_index: Vec<usize>,

    /// Global configuration for logging settings.
    pub config: Arc<GlobalConfig>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Creates a new `Logger` instance based on the global configuration.
    ///
    /// Note that creating a logger is quite expensive.
    pub fn new() -> Self {
        Self::from_config(GlobalConfig::get())
    }

    /// Creates a new `Logger` instance from an explicit configuration.
    pub fn from_config(config: Arc<GlobalConfig>) -> Self {
        let mut loggers = Vec::new();
        let mut dispatch_index = Vec::new();

        #[derive(Hash, PartialEq, Eq)]
        enum LoggerId {
            #[cfg(std_io)]
            File(PathBuf),
            Stdout,
            Stderr,
            LogCrate(LogCrateLevel),
        }

        let mut logger2index = HashMap::<LoggerId, usize>::new();
        let mut register = |id: LoggerId, create: &dyn Fn() -> Option<LoggerKind>| {
            if let Some(index) = logger2index.get(&id) {
                dispatch_index.push(*index);
            } else if let Some(logger) = create() {
                let index = loggers.len();
                logger2index.insert(id, index);
                loggers.push(logger);
                dispatch_index.push(index);
            }
        };

        let kind = &config.dispatch.logger;
        if kind.level != DispatchLogLevel::Disabled {
            #[cfg(std_io)]
            if let Some(file) = &kind.file {
                register(LoggerId::File(file.clone()), &|| {
                    FileLogger::new(file, kind.append).map(LoggerKind::File)
                });
            }

            if kind.stdout {
                register(LoggerId::Stdout, &|| Some(LoggerKind::Stdout));
            }

            if kind.stderr {
                register(LoggerId::Stderr, &|| Some(LoggerKind::Stderr));
            }

            if let Some(level) = kind.log {
                register(LoggerId::LogCrate(level), &|| Some(LoggerKind::Log(level)));
            }
        }

        Self {
            loggers,
            dispatch_index,
            config,
        }
    }

    /// Logs a message for dispatch, directing it to all configured dispatch loggers.
    pub fn log_dispatch<S: Display>(&mut self, msg: &S) {
        let length = self.dispatch_index.len();
        if length > 1 {
            let msg = msg.to_string();
            for i in 0..length {
                let index = self.dispatch_index[i];
                self.log(&msg, index)
            }
        } else if let Some(index) = self.dispatch_index.first() {
            self.log(&msg, *index)
        }
    }

    /// Returns the current dispatch log level from the global configuration.
    pub fn log_level_dispatch(&self) -> DispatchLogLevel {
        self.config.dispatch.logger.level
    }

    /// Whether messages of `level` reach at least one output.
    pub fn is_dispatch_enabled(&self, level: DispatchLogLevel) -> bool {
        let current = self.log_level_dispatch();
        let enabled = match level {
            DispatchLogLevel::Disabled => false,
            DispatchLogLevel::Basic => current != DispatchLogLevel::Disabled,
            DispatchLogLevel::Full => current == DispatchLogLevel::Full,
        };

        enabled && !self.dispatch_index.is_empty()
    }

    fn log<S: Display>(&mut self, msg: &S, index: usize) {
        let logger = &mut self.loggers[index];
        logger.log(msg);
    }
}

/// Represents different types of loggers.
#[derive(Debug)]
enum LoggerKind {
    /// Logs to a file.
    #[cfg(std_io)]
    File(FileLogger),

    /// Logs to standard output.
    Stdout,

    /// Logs to standard error.
    Stderr,

    /// Logs using the `log` crate with a specified level.
    Log(LogCrateLevel),
}

impl LoggerKind {
    fn log<S: Display>(&mut self, msg: &S) {
        match self {
            #[cfg(std_io)]
            LoggerKind::File(file_logger) => file_logger.log(msg),
            LoggerKind::Stdout => println!("{msg}"),
            LoggerKind::Stderr => eprintln!("{msg}"),
            LoggerKind::Log(level) => match level {
                LogCrateLevel::Info => log::info!("{msg}"),
                LogCrateLevel::Debug => log::debug!("{msg}"),
                LogCrateLevel::Trace => log::trace!("{msg}"),
            },
        }
    }
}

/// Logger that writes messages to a file.
#[derive(Debug)]
#[cfg(std_io)]
struct FileLogger {
    writer: BufWriter<File>,
}

#[cfg(std_io)]
impl FileLogger {
    // Opens the log file, `None` when it can't be created.
    fn new(path: &PathBuf, append: bool) -> Option<Self> {
        let file = OpenOptions::new()
            .write(true)
            .append(append)
            .truncate(!append)
            .create(true)
            .open(path);

        match file {
            Ok(file) => Some(Self {
                writer: BufWriter::new(file),
            }),
            Err(err) => {
                log::warn!("Can't open log file {}: {err}", path.display());
                None
            }
        }
    }

    // Logs a message to the file, flushing the buffer to ensure immediate write.
    fn log<S: Display>(&mut self, msg: &S) {
        let result = writeln!(self.writer, "{msg}").and_then(|_| self.writer.flush());

        if let Err(err) = result {
            log::warn!("Can't write to the dispatch log file: {err}");
        }
    }
}
