// Import local time formatting tools from chrono
use chrono::Local;

// Set the global log level (e.g., Debug, Info, Warn, Error)
use log::LevelFilter;

// Set up the dispatch builder for combining logger outputs
use fern::Dispatch;

// Standard I/O and filesystem operations (stdout, file creation)
use std::path::Path;
use std::{fs, io};

// Used to initialize a static value only once in a thread-safe way
use std::sync::OnceLock;

/// A simple Logger struct that wraps logging functions.
/// Clonable to allow use across multiple threads/tasks.
#[derive(Clone)]
pub struct Logger;

impl Logger {
    /// Logs a message at DEBUG level
    pub fn debug(&self, msg: &str) {
        log::debug!("{}", msg);
    }

    /// Logs a message at INFO level
    pub fn info(&self, msg: &str) {
        log::info!("{}", msg);
    }

    /// Logs a message at WARN level
    pub fn warn(&self, msg: &str) {
        log::warn!("{}", msg);
    }

    /// Logs a message at ERROR level
    pub fn error(&self, msg: &str) {
        log::error!("{}", msg);
    }
}

/// Static global LOGGER instance, initialized once
static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Initialize the global logger exactly once.
/// A console branch is always attached; when `log_dir` is given, a plain-text
/// file branch is added at `<log_dir>/<name>.log` (directory auto-created).
/// After this call, all `log::debug!/info!/warn!/error!` calls (and the
/// `Logger` methods above) go through the configured fern dispatcher.
pub fn init_logger(name: &str, log_dir: Option<&Path>) -> Logger {
    let file_path = log_dir.map(|dir| dir.join(format!("{}.log", name.replace('.', "_"))));

    LOGGER
        .get_or_init(|| {
            let console_name = name.to_string();
            let file_name = name.to_string();

            // Format used for terminal logs (ANSI colored prefix)
            let log_format_console = move |out: fern::FormatCallback,
                                           message: &std::fmt::Arguments,
                                           record: &log::Record| {
                out.finish(format_args!(
                    "\x1b[92m{}\x1b[0m - \x1b[94m{}\x1b[0m - {} - {}",
                    Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    console_name,
                    record.level(),
                    message
                ))
            };

            // Format used for file logs (plain text)
            let log_format_file = move |out: fern::FormatCallback,
                                        message: &std::fmt::Arguments,
                                        record: &log::Record| {
                out.finish(format_args!(
                    "{} - {} - {} - {}",
                    Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    file_name,
                    record.level(),
                    message
                ))
            };

            let mut base = Dispatch::new().level(LevelFilter::Debug).chain(
                Dispatch::new()
                    .format(log_format_console)
                    .chain(io::stdout()),
            );

            if let Some(path) = file_path {
                // Ensure the directory exists (no-op if already present)
                if let Some(parent) = path.parent() {
                    let _ = fs::create_dir_all(parent);
                }

                // Attempt to open the logfile, but don't panic; fall back to a sink
                let file_output: Box<dyn io::Write + Send> = match fern::log_file(&path) {
                    Ok(fh) => Box::new(fh),
                    Err(err) => {
                        eprintln!(
                            "Warning: could not open log file {}: {}",
                            path.display(),
                            err
                        );
                        Box::new(io::sink())
                    }
                };

                base = base.chain(Dispatch::new().format(log_format_file).chain(file_output));
            }

            // Apply the composed dispatcher as the global logger. A second call
            // (e.g. from tests) would fail here, so warn instead of panicking.
            if let Err(err) = base.apply() {
                eprintln!("Warning: logger already initialized: {}", err);
            }

            Logger
        })
        .clone()
}
