use confluence_mcp_core::policy::PolicyError;

/// Errors surfaced by the Confluence gateway and the tool layer
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Rate limited by Confluence. Retry after {retry_after} seconds.")]
    RateLimited { retry_after: u64 },

    #[error("Confluence API error [{status}]: {message}")]
    RemoteApi { status: u16, message: String },

    #[error("Cannot reach Confluence at {0}. Check ATLASSIAN_BASE_URL and your network connection.")]
    HostUnreachable(String),

    #[error("Page \"{title}\" not found in space {space_key}")]
    NotFound { title: String, space_key: String },

    #[error("Version conflict on page {page_id}: version {expected} is no longer current. Re-read the page and retry.")]
    VersionConflict { page_id: String, expected: u64 },

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Failed to parse Confluence response: {0}")]
    Serialization(String),
}

impl Error {
    /// Only rate limiting is worth retrying without changing the request
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
