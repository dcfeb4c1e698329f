use std::fmt::Display;
use std::panic::Location;

use tracing::{debug, error, info, warn};

/// Logs the error of a `Result` at the caller's location and hands the `Result` back unchanged,
/// so it can sit in the middle of a `?` chain:
///
/// ```ignore
/// let body = response.bytes().await.log_error("reading list_parts body")?;
/// ```
pub trait ErrorPrinter {
    fn log_error<M: Display>(self, message: M) -> Self;

    fn warn_error<M: Display>(self, message: M) -> Self;

    fn debug_error<M: Display>(self, message: M) -> Self;

    fn info_error<M: Display>(self, message: M) -> Self;
}

impl<T, E: Display> ErrorPrinter for Result<T, E> {
    #[track_caller]
    fn log_error<M: Display>(self, message: M) -> Self {
        if let Err(e) = &self {
            let caller = Location::caller();
            error!(caller = %caller, "{message}, error: {e}");
        }
        self
    }

    #[track_caller]
    fn warn_error<M: Display>(self, message: M) -> Self {
        if let Err(e) = &self {
            let caller = Location::caller();
            warn!(caller = %caller, "{message}, error: {e}");
        }
        self
    }

    #[track_caller]
    fn debug_error<M: Display>(self, message: M) -> Self {
        if let Err(e) = &self {
            let caller = Location::caller();
            debug!(caller = %caller, "{message}, error: {e}");
        }
        self
    }

    #[track_caller]
    fn info_error<M: Display>(self, message: M) -> Self {
        if let Err(e) = &self {
            let caller = Location::caller();
            info!(caller = %caller, "{message}, error: {e}");
        }
        self
    }
}

/// Same as [`ErrorPrinter`] for `Option`s: logs when the value is `None`.
pub trait OptionPrinter {
    fn log_none<M: Display>(self, message: M) -> Self;

    fn warn_none<M: Display>(self, message: M) -> Self;

    fn debug_none<M: Display>(self, message: M) -> Self;

    fn info_none<M: Display>(self, message: M) -> Self;
}

impl<T> OptionPrinter for Option<T> {
    #[track_caller]
    fn log_none<M: Display>(self, message: M) -> Self {
        if self.is_none() {
            error!(caller = %Location::caller(), "{message}");
        }
        self
    }

    #[track_caller]
    fn warn_none<M: Display>(self, message: M) -> Self {
        if self.is_none() {
            warn!(caller = %Location::caller(), "{message}");
        }
        self
    }

    #[track_caller]
    fn debug_none<M: Display>(self, message: M) -> Self {
        if self.is_none() {
            debug!(caller = %Location::caller(), "{message}");
        }
        self
    }

    #[track_caller]
    fn info_none<M: Display>(self, message: M) -> Self {
        if self.is_none() {
            info!(caller = %Location::caller(), "{message}");
        }
        self
    }
}
