use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const CF_API_URL: &str = "https://api.cloudflare.com/client/v4";
pub const CF_CREDENTIALS_FILENAME: &str = "cf-credentials.json";
pub const CF_KEYFILENAME_ENV_NAME: &str = "CF_KEYFILENAME";
pub const CF_EMAIL_ENV_NAME: &str = "CF_EMAIL";
pub const CF_ID_ENV_NAME: &str = "CF_ID";
pub const CF_KEY_ENV_NAME: &str = "CF_KEY";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Account credentials, as stored in a JSON key file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account identifier.
    pub id: String,
    pub email: String,
    /// API key sent as `X-Auth-Key`.
    pub key: String,
}

/// Where the caller wants credentials to come from.
#[derive(Debug, Clone, Default)]
pub enum CredentialSource {
    Inline(Credentials),
    KeyFile(PathBuf),
    /// Fall through to the environment, then the default key file.
    #[default]
    Discover,
}

/// The environment variables that take part in credential resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    pub keyfilename: Option<String>,
    pub email: Option<String>,
    pub id: Option<String>,
    pub key: Option<String>,
}

impl EnvSnapshot {
    pub fn from_process() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            keyfilename: read(CF_KEYFILENAME_ENV_NAME),
            email: read(CF_EMAIL_ENV_NAME),
            id: read(CF_ID_ENV_NAME),
            key: read(CF_KEY_ENV_NAME),
        }
    }
}

/// How multi-entry writes and deletes reach the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BulkMode {
    /// One request against the `/bulk` endpoint.
    #[default]
    Batched,
    /// One request per entry, issued concurrently.
    PerEntry,
}

/// Everything the HTTP transport needs to talk to one account.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub credentials: Credentials,
    pub bulk_mode: BulkMode,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            base_url: CF_API_URL.to_string(),
            credentials,
            bulk_mode: BulkMode::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_bulk_mode(mut self, bulk_mode: BulkMode) -> Self {
        self.bulk_mode = bulk_mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `{base_url}/accounts/{id}`; every endpoint path is relative to this.
    pub fn account_url(&self) -> String {
        format!("{}/accounts/{}", self.base_url, self.credentials.id)
    }

    pub fn auth_headers(&self) -> [(&'static str, &str); 2] {
        [
            ("X-Auth-Email", self.credentials.email.as_str()),
            ("X-Auth-Key", self.credentials.key.as_str()),
        ]
    }
}
