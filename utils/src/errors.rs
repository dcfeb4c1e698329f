use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("No credentials available: {0}")]
    MissingCredentials(String),

    #[error("Credential provider failure: {0}")]
    ProviderFailure(String),
}

impl AuthError {
    pub fn missing(source: impl Into<String>) -> Self {
        AuthError::MissingCredentials(source.into())
    }
}
