//! Diagnostic logging pipeline for the configurator client.
//!
//! # Architecture
//!
//! ```text
//! log::info!() / log_info!() / log_parsed!()
//!     |
//! [LogCollector] (log::Log impl, non-blocking)
//!     | (crossbeam unbounded channel)
//!     v
//! [DiskPersister thread]
//!     |
//! logs/<ts>_client.log    every record
//! logs/<ts>_session.log   `parsed` target only
//! ```
//!
//! Compile output from the server never passes through here; it goes to the
//! log sink. This file is the client's own diagnostic trail.

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{Level, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::oneshot;

/// Target used by `log_parsed!` for high-level session events.
pub const PARSED_TARGET: &str = "parsed";

const CRATE_TARGET: &str = "ffdroid_builder";

/// Internal log line or flush marker
enum LogMessage {
    Line(LogLine),
    Flush(oneshot::Sender<()>),
}

/// A log line with metadata
#[derive(Clone, Debug)]
pub struct LogLine {
    pub message: String,
    pub level: Level,
    /// Whether the line also belongs in the session log
    pub parsed: bool,
    /// `HH:MM:SS.mmm`
    pub timestamp: String,
}

impl LogLine {
    pub fn new(level: Level, message: String) -> Self {
        LogLine {
            message,
            level,
            parsed: false,
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    pub fn parsed(level: Level, message: String) -> Self {
        LogLine {
            parsed: true,
            ..LogLine::new(level, message)
        }
    }

    pub fn format(&self) -> String {
        format!("[{}] [{}] {}\n", self.timestamp, self.level, self.message)
    }
}

/// Resolve the log directory relative to the current working directory.
pub fn get_global_logs_path(log_dir: &str) -> Result<PathBuf, String> {
    let dir = Path::new(log_dir);
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Failed to get current working directory: {}", e))?;
    Ok(cwd.join(dir))
}

/// Disk-backed logger; cloning shares the same writer thread.
#[derive(Clone)]
pub struct LogCollector {
    tx: Sender<LogMessage>,
    log_path: PathBuf,
    session_path: PathBuf,
}

impl LogCollector {
    /// Create the log directory and a fresh timestamped log file, and start
    /// the writer thread.
    pub fn new(log_dir: &Path) -> Result<Self, String> {
        std::fs::create_dir_all(log_dir)
            .map_err(|e| format!("Failed to create logs directory: {}", e))?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_path = log_dir.join(format!("{}_client.log", stamp));
        let session_path = log_dir.join(format!("{}_session.log", stamp));

        let mut client_file = open_append(&log_path)?;
        let mut session_file: Option<File> = None;
        let session_path_clone = session_path.clone();

        let (tx, rx) = unbounded::<LogMessage>();

        // OS thread, not a tokio task: records from any runtime or none reach disk
        std::thread::spawn(move || {
            while let Ok(msg) = rx.recv() {
                match msg {
                    LogMessage::Line(line) => {
                        let formatted = line.format();
                        let _ = client_file.write_all(formatted.as_bytes());

                        if line.parsed {
                            if session_file.is_none() {
                                session_file = open_append(&session_path_clone).ok();
                            }
                            if let Some(file) = session_file.as_mut() {
                                let _ = file.write_all(formatted.as_bytes());
                            }
                        }
                    }
                    LogMessage::Flush(done) => {
                        let _ = client_file.flush();
                        if let Some(file) = session_file.as_mut() {
                            let _ = file.flush();
                        }
                        let _ = done.send(());
                    }
                }
            }
        });

        Ok(LogCollector {
            tx,
            log_path,
            session_path,
        })
    }

    /// Register as the global `log` backend.
    pub fn install(&self, max_level: log::LevelFilter) -> Result<(), String> {
        log::set_boxed_logger(Box::new(self.clone()))
            .map(|()| log::set_max_level(max_level))
            .map_err(|e| format!("Failed to set LogCollector as global logger: {}", e))
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    /// Send a log line (non-blocking)
    pub fn log_line(&self, line: LogLine) {
        let _ = self.tx.send(LogMessage::Line(line));
    }

    pub fn log_str(&self, message: impl Into<String>) {
        self.log_line(LogLine::new(Level::Info, message.into()));
    }

    /// Wait until every line sent before this call is written out.
    pub async fn wait_for_empty(&self) -> Result<(), String> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(LogMessage::Flush(done_tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;
        done_rx
            .await
            .map_err(|e| format!("Flush signal interrupted: {}", e))
    }
}

fn open_append(path: &Path) -> Result<File, String> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))
}

/// Wires `log::*` macros into the collector.
///
/// Third-party crates are only recorded at warn and above; the crate's own
/// targets follow the global max level.
impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        let target = metadata.target();
        let ours = target == PARSED_TARGET || target.starts_with(CRATE_TARGET);
        metadata.level() <= log::max_level() && (ours || metadata.level() <= Level::Warn)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = record.args().to_string();
        let line = if record.target() == PARSED_TARGET {
            LogLine::parsed(record.level(), message)
        } else {
            LogLine::new(record.level(), message)
        };
        self.log_line(line);
    }

    fn flush(&self) {}
}

/// Log at info level through the global logger.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        log::info!("{}", msg);
    }}
}

/// Log a high-level session event (also written to the session log).
#[macro_export]
macro_rules! log_parsed {
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        log::info!(target: "parsed", "{}", msg);
    }}
}
