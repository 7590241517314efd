//! Logger with a stderr sink or a size-rotated file sink.
//!
//! Supervisory commands log to stderr; `start --logtofile` writes to
//! `node.log` in the log directory instead. When the file exceeds the
//! maximum size it is rotated to `node.log.1` (one backup kept).

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

const LOG_FILE_NAME: &str = "node.log";
const BACKUP_SUFFIX: &str = ".1";
const MAX_FILE_MB: u64 = 10;

/// Log severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    /// Suppresses all output.
    None,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::None => "NONE",
        }
    }

    /// Parses a level name, defaulting to `Info` for unknown input.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Self::Debug,
            "warn" => Self::Warn,
            "error" => Self::Error,
            "none" => Self::None,
            _ => Self::Info,
        }
    }
}

enum Sink {
    Stderr,
    File {
        file: File,
        path: PathBuf,
        max_bytes: u64,
        written: u64,
    },
}

struct Logger {
    sink: Sink,
    min_level: Level,
}

/// Initialises the global logger with a stderr sink. Call once per
/// command invocation, before any registry operation.
pub fn init(level: Level) {
    let _ = LOGGER.set(Mutex::new(Logger::stderr_sink(level)));
}

/// Initialises the global logger with a rotated file sink in `dir`.
///
/// Falls back to stderr if the log file cannot be opened.
pub fn init_file(level: Level, dir: &Path) {
    let _ = LOGGER.set(Mutex::new(Logger::file_sink(
        level,
        dir,
        MAX_FILE_MB * 1024 * 1024,
    )));
}

/// Writes a log line if the level is at or above the configured
/// minimum. Does nothing before `init`.
pub fn write(level: Level, args: fmt::Arguments<'_>) {
    let Some(mutex) = LOGGER.get() else {
        return;
    };
    let Ok(mut logger) = mutex.lock() else {
        return;
    };
    logger.log(level, args);
}

impl Logger {
    fn stderr_sink(min_level: Level) -> Self {
        Self {
            sink: Sink::Stderr,
            min_level,
        }
    }

    /// Opens `node.log` in `dir` for appending, rotating once it
    /// reaches `max_bytes`. Falls back to stderr on open failure.
    fn file_sink(min_level: Level, dir: &Path, max_bytes: u64) -> Self {
        let _ = fs::create_dir_all(dir);
        let path = dir.join(LOG_FILE_NAME);

        let sink = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                let written = file.metadata().map(|m| m.len()).unwrap_or(0);
                Sink::File {
                    file,
                    path,
                    max_bytes,
                    written,
                }
            }
            Err(_) => Sink::Stderr,
        };

        Self { sink, min_level }
    }

    fn log(&mut self, level: Level, args: fmt::Arguments<'_>) {
        if self.min_level == Level::None || level < self.min_level {
            return;
        }
        let now = timestamp();
        let line = format!("{now} [{lvl}] {args}\n", lvl = level.as_str());

        let mut needs_rotate = false;
        match &mut self.sink {
            Sink::Stderr => {
                let _ = std::io::stderr().write_all(line.as_bytes());
            }
            Sink::File {
                file,
                max_bytes,
                written,
                ..
            } => {
                let _ = file.write_all(line.as_bytes());
                *written += line.len() as u64;
                needs_rotate = *max_bytes > 0 && *written >= *max_bytes;
            }
        }
        if needs_rotate {
            self.rotate();
        }
    }

    fn rotate(&mut self) {
        let Sink::File {
            file,
            path,
            written,
            ..
        } = &mut self.sink
        else {
            return;
        };
        let backup = path.with_extension(format!(
            "{}{}",
            LOG_FILE_NAME.rsplit('.').next().unwrap_or("log"),
            BACKUP_SUFFIX
        ));
        let _ = fs::rename(&*path, &backup);
        if let Ok(f) = OpenOptions::new().create(true).append(true).open(&*path) {
            *file = f;
        }
        *written = 0;
    }
}

fn timestamp() -> String {
    // std::time is enough for a wall-clock-of-day stamp.
    let dur = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = dur.as_secs();
    let (h, m, s) = (secs / 3600 % 24, secs / 60 % 60, secs % 60);
    format!("{h:02}:{m:02}:{s:02}")
}

/// Logs at DEBUG level.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::log::write($crate::log::Level::Debug, format_args!($($arg)*)) };
}

/// Logs at INFO level.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::log::write($crate::log::Level::Info, format_args!($($arg)*)) };
}

/// Logs at WARN level.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::log::write($crate::log::Level::Warn, format_args!($($arg)*)) };
}

/// Logs at ERROR level.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::log::write($crate::log::Level::Error, format_args!($($arg)*)) };
}
