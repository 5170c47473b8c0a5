// src/logging.rs
//
// Timestamped console logging with an optional log file mirror.
// Every line written through `tlog!` goes to stderr, and to the current
// log file when file logging has been started.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::BridgeError;

/// Name of the symlink that always points at the newest log file.
const CURRENT_LOG_NAME: &str = "serial-bridge.log";

/// Global log file handle. When `Some`, `tlog!` writes to both stderr and this file.
pub(crate) static LOG_FILE: Mutex<Option<std::fs::File>> = Mutex::new(None);

/// Start file logging into `log_dir`.
/// Creates a timestamped log file and a `serial-bridge.log` symlink (Unix only).
/// Returns the path of the new log file.
pub fn init_file_logging(log_dir: &Path) -> Result<PathBuf, BridgeError> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| BridgeError::Io(format!("Failed to create log dir: {}", e)))?;

    let filename = chrono::Local::now()
        .format("%Y%m%d-%H%M%S-serial-bridge.log")
        .to_string();
    let log_path = log_dir.join(&filename);

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| BridgeError::Io(format!("Failed to create log file: {}", e)))?;

    // Windows symlinks require elevated privileges
    #[cfg(unix)]
    {
        let symlink_path = log_dir.join(CURRENT_LOG_NAME);
        let _ = std::fs::remove_file(&symlink_path);
        if let Err(e) = std::os::unix::fs::symlink(&filename, &symlink_path) {
            eprintln!(
                "{} [logging] Failed to create {} symlink: {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                CURRENT_LOG_NAME,
                e
            );
        }
    }

    if let Ok(mut guard) = LOG_FILE.lock() {
        *guard = Some(file);
    }

    // eprintln directly: tlog! would lock LOG_FILE again
    eprintln!(
        "{} [logging] File logging started: {}",
        chrono::Local::now().format("%H:%M:%S%.3f"),
        log_path.display()
    );

    Ok(log_path)
}

/// Stop file logging and close the log file.
pub fn stop_file_logging() {
    if let Ok(mut guard) = LOG_FILE.lock() {
        if guard.is_some() {
            *guard = None;
            eprintln!(
                "{} [logging] File logging stopped",
                chrono::Local::now().format("%H:%M:%S%.3f")
            );
        }
    }
}

/// Timestamped logging macro.
/// Prepends `HH:MM:SS.mmm` local time to every message written to stderr.
/// Also writes to the log file when file logging is enabled.
macro_rules! tlog {
    ($($arg:tt)*) => {{
        use std::io::Write as _;
        let msg = format!("{} {}", chrono::Local::now().format("%H:%M:%S%.3f"), format_args!($($arg)*));
        eprintln!("{}", msg);
        if let Ok(mut guard) = $crate::logging::LOG_FILE.lock() {
            if let Some(ref mut f) = *guard {
                let _ = writeln!(f, "{}", msg);
            }
        }
    }};
}
