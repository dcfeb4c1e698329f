#![cfg_attr(feature = "strict", deny(warnings))]

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, Local};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

mod config;
mod constants;

pub use config::{LoggingConfig, LoggingMode};
use constants::{DEFAULT_LOG_FILE_NAME, DEFAULT_LOG_LEVEL_CONSOLE, DEFAULT_LOG_LEVEL_FILE, LOG_FILE_PREFIX};

/// The main entry point to set up logging. Only the first call in a process takes effect.
pub fn init_logging(cfg: LoggingConfig) {
    let maybe_log_file = match &cfg.logging_mode {
        LoggingMode::Directory(log_dir) => Some(log_file_in_dir(log_dir)),
        LoggingMode::File(path) => Some(path.clone()),
        LoggingMode::Console => None,
    };

    if let Some(log_file) = maybe_log_file {
        // Attempt logging to a file, but fallback to console logging on error.
        if let Err(e) = init_logging_to_file(&log_file, cfg.use_json) {
            init_logging_to_console(cfg.use_json);
            error!("Error logging to file {log_file:?} ({e}); falling back to console logging.");
        }
    } else {
        init_logging_to_console(cfg.use_json);
    }

    info!("{}, td bulk import client {}", cfg.version, env!("CARGO_PKG_VERSION"));
}

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_default()
}

fn init_logging_to_console(use_json: bool) {
    let fmt_layer_base = tracing_subscriber::fmt::layer().with_line_number(true).with_file(true).with_target(false);
    let fmt_filter = filter(DEFAULT_LOG_LEVEL_CONSOLE);

    let registry = tracing_subscriber::registry();
    let _ = if use_json {
        registry.with(fmt_layer_base.json().with_filter(fmt_filter)).try_init()
    } else {
        registry.with(fmt_layer_base.with_filter(fmt_filter)).try_init()
    };
}

fn init_logging_to_file(path: &Path, use_json: bool) -> std::io::Result<()> {
    use tracing_appender::{non_blocking, rolling};

    let (log_directory, file_name) = prepare_log_file(path)?;

    // One static file, no rotation.
    let file_appender = rolling::never(log_directory, file_name);
    let (writer, guard) = non_blocking(file_appender);

    // The worker thread flushes until the guard drops, so it lives for the process.
    static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
    let _ = FILE_GUARD.set(guard);

    let fmt_layer_base = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_file(true)
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer);
    let fmt_filter = filter(DEFAULT_LOG_LEVEL_FILE);

    let registry = tracing_subscriber::registry();
    let _ = if use_json {
        registry.with(fmt_layer_base.json().with_filter(fmt_filter)).try_init()
    } else {
        registry.with(fmt_layer_base.with_filter(fmt_filter)).try_init()
    };
    Ok(())
}

/// Splits `path` into the directory and file name the appender writes to, creating parent
/// directories and touching the file so an unwritable location fails before the subscriber is
/// installed.
fn prepare_log_file(path: &Path) -> std::io::Result<(PathBuf, OsString)> {
    let (path, file_name) = match path.file_name() {
        Some(name) => (path.to_path_buf(), name.to_os_string()),
        None => (path.join(DEFAULT_LOG_FILE_NAME), OsString::from(DEFAULT_LOG_FILE_NAME)),
    };

    let log_directory = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent)?;
            parent.to_path_buf()
        },
        None => PathBuf::from("."),
    };

    std::fs::write(&path, [])?;
    Ok((log_directory, file_name))
}

/// Build `<prefix>_<YYYYMMDD>T<HHMMSS><mmm><+/-HHMM>_<pid>.log` in `dir`.
pub fn log_file_in_dir(dir: impl AsRef<Path>) -> PathBuf {
    let now_local: DateTime<Local> = Local::now();
    let now_fixed: DateTime<FixedOffset> = now_local.with_timezone(now_local.offset());

    // filename-safe, no colons: 20250915T083210123-0700
    let ts = now_fixed.format("%Y%m%dT%H%M%S%3f%z");

    dir.as_ref().join(format!("{LOG_FILE_PREFIX}_{ts}_{}.log", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_name() {
        let path = log_file_in_dir("/tmp");
        assert_eq!(path.parent(), Some(Path::new("/tmp")));

        let name = path.file_name().unwrap().to_str().unwrap();
        let rest = name.strip_prefix("td_bulk_import_").unwrap();
        let rest = rest.strip_suffix(".log").unwrap();
        let (ts, pid) = rest.rsplit_once('_').unwrap();
        assert_eq!(pid.parse::<u32>().unwrap(), std::process::id());
        assert!(DateTime::parse_from_str(ts, "%Y%m%dT%H%M%S%3f%z").is_ok());
    }

    #[test]
    fn test_prepare_log_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/client.log");

        let (log_dir, name) = prepare_log_file(&path).unwrap();
        assert_eq!(log_dir, dir.path().join("nested/deeper"));
        assert_eq!(name, "client.log");
        assert!(path.is_file());

        // an existing log is truncated
        std::fs::write(&path, b"stale").unwrap();
        prepare_log_file(&path).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_prepare_log_file_defaults_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("logs")).unwrap();
        let path = dir.path().join("logs/..");

        let (log_dir, name) = prepare_log_file(&path).unwrap();
        assert_eq!(name, DEFAULT_LOG_FILE_NAME);
        assert_eq!(log_dir, path);
        assert!(path.join(DEFAULT_LOG_FILE_NAME).is_file());
    }

    #[test]
    fn test_prepare_log_file_rejects_unwritable_location() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"").unwrap();

        assert!(prepare_log_file(&blocker.join("client.log")).is_err());
    }
}
