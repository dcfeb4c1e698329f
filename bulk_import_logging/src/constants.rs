/// Default log level for the library to use. Override using the `RUST_LOG` env variable.
pub(crate) const DEFAULT_LOG_LEVEL_FILE: &str = "info";
pub(crate) const DEFAULT_LOG_LEVEL_CONSOLE: &str = "warn";

/// Used when `LOG_DEST` names a directory.
pub(crate) const LOG_FILE_PREFIX: &str = "td_bulk_import";

/// Used when `LOG_DEST` names a path with no file component.
pub(crate) const DEFAULT_LOG_FILE_NAME: &str = "td_bulk_import.log";
