use std::str::FromStr;

use tracing::{debug, info, warn};

/// Prefix applied to every constant declared through [`configurable_constants!`](crate::configurable_constants)
/// when looking up its environment override.
pub const ENV_PREFIX: &str = "TD_BULK_IMPORT_";

/// Returns the environment variable consulted for a constant, e.g. `TD_BULK_IMPORT_READ_TIMEOUT`.
pub fn env_var_name(constant_name: &str) -> String {
    format!("{ENV_PREFIX}{constant_name}")
}

/// Controls how a config value is parsed from an environment string.
pub trait ParsableConfigValue: std::fmt::Debug + Sized {
    fn parse_user_value(value: &str) -> Option<Self>;

    /// Parse the value, returning the default if it is absent or can't be parsed.
    /// An unparsable value is reported with a warning rather than failing.
    fn parse(variable_name: &str, value: Option<String>, default: Self) -> Self {
        match value {
            Some(v) => match Self::parse_user_value(&v) {
                Some(v) => {
                    info!("Config: {variable_name} = {v:?} (user set)");
                    v
                },
                None => {
                    warn!(
                        "Configuration value {v} for {variable_name} cannot be parsed into correct type; reverting to default."
                    );
                    info!("Config: {variable_name} = {default:?} (default due to parse error)");
                    default
                },
            },
            None => {
                debug!("Config: {variable_name} = {default:?} (default)");
                default
            },
        }
    }
}

/// Types whose `FromStr` implementation is the whole story.
pub trait FromStrParseable: FromStr + std::fmt::Debug {}

impl<T: FromStrParseable> ParsableConfigValue for T {
    fn parse_user_value(value: &str) -> Option<Self> {
        value.parse::<T>().ok()
    }
}

impl FromStrParseable for usize {}
impl FromStrParseable for u16 {}
impl FromStrParseable for u32 {}
impl FromStrParseable for u64 {}
impl FromStrParseable for i64 {}
impl FromStrParseable for String {}

/// - true: "1","true","yes","y","on"
/// - false: "0","false","no","n","off"
fn parse_bool_value(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "0" | "false" | "no" | "n" | "off" => Some(false),
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        _ => None,
    }
}

impl ParsableConfigValue for bool {
    fn parse_user_value(value: &str) -> Option<Self> {
        parse_bool_value(value)
    }
}

/// `None` when nothing is set; `Some(value)` when the user specifies one.
impl<T: ParsableConfigValue> ParsableConfigValue for Option<T> {
    fn parse_user_value(value: &str) -> Option<Self> {
        T::parse_user_value(value).map(Some)
    }
}

/// Durations accept the suffixes understood by `duration_str` ("30s", "5m", "1h", "250ms", ...).
impl ParsableConfigValue for std::time::Duration {
    fn parse_user_value(value: &str) -> Option<Self> {
        duration_str::parse(value).ok()
    }
}

// Reexported so that the macro expands without callers depending on lazy_static.
pub use lazy_static::lazy_static;

/// Declares lazily initialized constants that may be overridden through the environment.
///
/// Each `ref NAME: Type = default;` entry becomes a `pub static ref NAME: Type` whose value is read
/// once from `TD_BULK_IMPORT_NAME` on first access, falling back to `default`.
///
/// # Example
/// ```rust
/// use std::time::Duration;
///
/// utils::configurable_constants! {
///     /// How long to wait for a connection.
///     ref CONNECT_TIMEOUT: Duration = Duration::from_secs(60);
/// }
///
/// assert!(*CONNECT_TIMEOUT > Duration::ZERO);
/// ```
#[macro_export]
macro_rules! configurable_constants {
    ($(
        $(#[$meta:meta])*
        ref $name:ident : $type:ty = $value:expr;
    )+) => {
        $(
            $crate::configuration_utils::lazy_static! {
                $(#[$meta])*
                pub static ref $name: $type = {
                    let default_value: $type = $value;
                    let maybe_env_value = std::env::var($crate::configuration_utils::env_var_name(stringify!($name))).ok();
                    <$type as $crate::configuration_utils::ParsableConfigValue>::parse(
                        stringify!($name),
                        maybe_env_value,
                        default_value,
                    )
                };
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_bool_words() {
        for v in ["1", "true", "YES", " on ", "y"] {
            assert_eq!(bool::parse_user_value(v), Some(true), "{v}");
        }
        for v in ["0", "False", "no", "off", "n"] {
            assert_eq!(bool::parse_user_value(v), Some(false), "{v}");
        }
        assert_eq!(bool::parse_user_value("maybe"), None);
    }

    #[test]
    fn test_parse_falls_back_to_default() {
        assert_eq!(u64::parse("X", Some("abc".to_owned()), 7), 7);
        assert_eq!(u64::parse("X", Some("42".to_owned()), 7), 42);
        assert_eq!(u64::parse("X", None, 7), 7);
    }

    #[test]
    fn test_option_values() {
        let v: Option<String> = ParsableConfigValue::parse("DEST", Some(String::new()), None);
        assert_eq!(v, Some(String::new()));

        let v: Option<String> = ParsableConfigValue::parse("DEST", None, None);
        assert_eq!(v, None);
    }

    #[test]
    fn test_durations() {
        assert_eq!(Duration::parse_user_value("30s"), Some(Duration::from_secs(30)));
        assert_eq!(Duration::parse_user_value("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(Duration::parse("T", Some("soon".to_owned()), Duration::from_secs(1)), Duration::from_secs(1));
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name("API_ENDPOINT"), "TD_BULK_IMPORT_API_ENDPOINT");
    }
}
