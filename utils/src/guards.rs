use std::env;
use std::ffi::OsStr;

/// Sets or removes an environment variable for the lifetime of the guard, restoring
/// whatever was there before when dropped.
///
/// Environment mutation is process-wide; tests using this should be marked `#[serial]`.
///
/// ```no_run
/// use utils::EnvVarGuard;
///
/// let _guard = EnvVarGuard::set("TD_API_KEY", "1/abcdef");
/// // TD_API_KEY is restored (or removed again) when `_guard` goes out of scope.
/// ```
pub struct EnvVarGuard {
    key: &'static str,
    prev: Option<String>,
}

impl EnvVarGuard {
    pub fn set(key: &'static str, value: impl AsRef<OsStr>) -> Self {
        let prev = env::var(key).ok();
        unsafe {
            env::set_var(key, value);
        }
        Self { key, prev }
    }

    pub fn unset(key: &'static str) -> Self {
        let prev = env::var(key).ok();
        unsafe {
            env::remove_var(key);
        }
        Self { key, prev }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match &self.prev {
            Some(v) => unsafe { env::set_var(self.key, v) },
            None => unsafe { env::remove_var(self.key) },
        }
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial(default_config_env)]
    fn test_set_restores_previous_value() {
        let key = "TD_BULK_IMPORT_GUARD_TEST";
        let _outer = EnvVarGuard::set(key, "initial");
        {
            let _guard = EnvVarGuard::set(key, "temporary");
            assert_eq!(env::var(key).unwrap(), "temporary");
        }
        assert_eq!(env::var(key).unwrap(), "initial");
    }

    #[test]
    #[serial(default_config_env)]
    fn test_unset_then_restore() {
        let key = "TD_BULK_IMPORT_GUARD_TEST_UNSET";
        let _outer = EnvVarGuard::set(key, "present");
        {
            let _guard = EnvVarGuard::unset(key);
            assert!(env::var(key).is_err());
        }
        assert_eq!(env::var(key).unwrap(), "present");
    }
}
