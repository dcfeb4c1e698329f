use std::path::PathBuf;

utils::configurable_constants! {

    /// The log destination. By default, logs go to the console.
    ///
    /// If this path exists as a directory or the path ends with a /, then a new log file named after the
    /// current time and process id is created in that directory. Otherwise logs are written to this file.
    ///
    /// Use the environment variable `TD_BULK_IMPORT_LOG_DEST` to set this value.
    ref LOG_DEST : Option<String> = None;

    /// The format the logs are printed in. If "json", then logs are dumped as json blobs; otherwise they
    /// are treated as text. By default logging to files is done in json and console logging is done with text.
    ///
    /// Use the environment variable `TD_BULK_IMPORT_LOG_FORMAT` to set this value.
    ref LOG_FORMAT : Option<String> = None;
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoggingMode {
    Directory(PathBuf),
    File(PathBuf),
    Console,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub logging_mode: LoggingMode,
    pub use_json: bool,
    pub version: String,
}

impl LoggingConfig {
    /// Destination and format from the environment.
    pub fn new(version: impl Into<String>) -> LoggingConfig {
        Self::from_settings(version, LOG_DEST.as_deref(), LOG_FORMAT.as_deref())
    }

    pub fn from_settings(version: impl Into<String>, log_dest: Option<&str>, log_format: Option<&str>) -> LoggingConfig {
        let logging_mode = match log_dest.map(str::trim) {
            None | Some("") => LoggingMode::Console,
            Some(dest) => {
                let path = PathBuf::from(dest);
                if dest.ends_with('/') || dest.ends_with('\\') || path.is_dir() {
                    LoggingMode::Directory(path)
                } else {
                    LoggingMode::File(path)
                }
            },
        };

        let use_json = match log_format {
            Some(format) => format.trim().eq_ignore_ascii_case("json"),
            None => logging_mode != LoggingMode::Console,
        };

        Self {
            logging_mode,
            use_json,
            version: version.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_console_text() {
        let cfg = LoggingConfig::from_settings("v1", None, None);
        assert_eq!(cfg.logging_mode, LoggingMode::Console);
        assert!(!cfg.use_json);

        let cfg = LoggingConfig::from_settings("v1", Some(""), None);
        assert_eq!(cfg.logging_mode, LoggingMode::Console);
    }

    #[test]
    fn test_file_and_directory() {
        let cfg = LoggingConfig::from_settings("v1", Some("/var/log/td/"), None);
        assert_eq!(cfg.logging_mode, LoggingMode::Directory(PathBuf::from("/var/log/td/")));
        assert!(cfg.use_json);

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().to_str().unwrap();
        let cfg = LoggingConfig::from_settings("v1", Some(dest), None);
        assert_eq!(cfg.logging_mode, LoggingMode::Directory(dir.path().to_path_buf()));

        let cfg = LoggingConfig::from_settings("v1", Some("/tmp/bulk_import.log"), Some("text"));
        assert_eq!(cfg.logging_mode, LoggingMode::File(PathBuf::from("/tmp/bulk_import.log")));
        assert!(!cfg.use_json);
    }

    #[test]
    fn test_format_override() {
        let cfg = LoggingConfig::from_settings("v1", None, Some(" JSON "));
        assert!(cfg.use_json);
    }
}
