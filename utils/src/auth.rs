use std::fmt::{Debug, Formatter};

use parking_lot::RwLock;

use crate::errors::AuthError;

/// Environment variable read by [`EnvCredentialProvider::default`].
pub const DEFAULT_API_KEY_ENV_VAR: &str = "TD_API_KEY";

/// An opaque API token attached to every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_empty(&self) -> bool {
        self.token.trim().is_empty()
    }
}

// Tokens must never end up in logs.
impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("token", &"<redacted>").finish()
    }
}

/// Source of the credentials used for a request.
///
/// Providers are asked again on every call, so a rotated token is picked up by the next request
/// without rebuilding the client.
pub trait CredentialProvider: Debug + Send + Sync {
    fn current_credentials(&self) -> Result<Credentials, AuthError>;
}

/// Always hands out the same token.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    credentials: Credentials,
}

impl StaticCredentialProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(token),
        }
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn current_credentials(&self) -> Result<Credentials, AuthError> {
        if self.credentials.is_empty() {
            return Err(AuthError::missing("static token is empty"));
        }
        Ok(self.credentials.clone())
    }
}

/// Reads the token from an environment variable each time it is asked.
#[derive(Debug, Clone)]
pub struct EnvCredentialProvider {
    variable: String,
}

impl EnvCredentialProvider {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }
}

impl Default for EnvCredentialProvider {
    fn default() -> Self {
        Self::new(DEFAULT_API_KEY_ENV_VAR)
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn current_credentials(&self) -> Result<Credentials, AuthError> {
        match std::env::var(&self.variable) {
            Ok(token) if !token.trim().is_empty() => Ok(Credentials::new(token.trim())),
            Ok(_) => Err(AuthError::missing(format!("{} is empty", self.variable))),
            Err(std::env::VarError::NotPresent) => Err(AuthError::missing(format!("{} is not set", self.variable))),
            Err(e) => Err(AuthError::ProviderFailure(format!("{}: {e}", self.variable))),
        }
    }
}

/// Holds a token that can be replaced at runtime, e.g. by a background refresher.
#[derive(Debug, Default)]
pub struct RotatingCredentialProvider {
    current: RwLock<Option<Credentials>>,
}

impl RotatingCredentialProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            current: RwLock::new(Some(Credentials::new(token))),
        }
    }

    pub fn rotate(&self, token: impl Into<String>) {
        *self.current.write() = Some(Credentials::new(token));
    }

    pub fn revoke(&self) {
        *self.current.write() = None;
    }
}

impl CredentialProvider for RotatingCredentialProvider {
    fn current_credentials(&self) -> Result<Credentials, AuthError> {
        match self.current.read().as_ref() {
            Some(c) if !c.is_empty() => Ok(c.clone()),
            Some(_) => Err(AuthError::missing("rotating token is empty")),
            None => Err(AuthError::missing("rotating token was revoked")),
        }
    }
}
