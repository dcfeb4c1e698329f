use std::sync::Arc;
use std::time::Duration;

use utils::{CredentialProvider, EnvCredentialProvider};

utils::configurable_constants! {

    /// Base URL of the bulk import API.
    ///
    /// Use the environment variable `TD_BULK_IMPORT_API_ENDPOINT` to set this value.
    ref API_ENDPOINT: String = "https://api.treasuredata.com".to_owned();

    /// Maximum time allowed to establish a TCP connection to the server.
    ///
    /// Use the environment variable `TD_BULK_IMPORT_CONNECT_TIMEOUT` to set this value.
    ref CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Maximum time allowed between received packets. Uploads of large parts and error record
    /// downloads can legitimately run long, so this bounds stalls rather than whole transfers.
    ///
    /// Use the environment variable `TD_BULK_IMPORT_READ_TIMEOUT` to set this value.
    ref READ_TIMEOUT: Duration = Duration::from_secs(600);

    /// User-Agent header sent with every request.
    ///
    /// Use the environment variable `TD_BULK_IMPORT_USER_AGENT` to set this value.
    ref USER_AGENT: String = format!("td-bulk-import-rust/{}", env!("CARGO_PKG_VERSION"));
}

/// Settings for a [`BulkImportClient`](crate::BulkImportClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub credentials: Arc<dyn CredentialProvider>,
}

impl Default for ClientConfig {
    /// Endpoint and timeouts from the environment; credentials from `TD_API_KEY`.
    fn default() -> Self {
        Self {
            endpoint: API_ENDPOINT.clone(),
            user_agent: USER_AGENT.clone(),
            connect_timeout: *CONNECT_TIMEOUT,
            read_timeout: *READ_TIMEOUT,
            credentials: Arc::new(EnvCredentialProvider::default()),
        }
    }
}

impl ClientConfig {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            credentials,
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Endpoint without trailing slashes, ready to have an absolute path appended.
    pub(crate) fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }
}
