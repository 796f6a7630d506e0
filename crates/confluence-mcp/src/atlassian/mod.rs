use crate::prelude::*;
use confluence_mcp_core::policy::WritePolicy;

pub mod confluence;

/// Confluence configuration from environment variables
#[derive(Debug, Clone)]
pub struct ConfluenceConfig {
    /// Instance URL without trailing slash (e.g. `https://acme.atlassian.net`)
    pub base_url: String,
    pub email: String,
    pub api_token: String,
    pub write_policy: WritePolicy,
}

impl ConfluenceConfig {
    pub fn new(base_url: &str, email: &str, api_token: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            email: email.to_string(),
            api_token: api_token.to_string(),
            write_policy: WritePolicy::default(),
        }
    }

    pub fn with_write_policy(mut self, write_policy: WritePolicy) -> Self {
        self.write_policy = write_policy;
        self
    }

    /// Load configuration from environment variables
    ///
    /// Uses ATLASSIAN_BASE_URL, ATLASSIAN_EMAIL and ATLASSIAN_API_TOKEN for access.
    /// Writes stay disabled unless CONFLUENCE_ENABLE_WRITES is truthy; CONFLUENCE_ALLOWED_SPACES
    /// optionally restricts them to a comma separated list of space keys.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("ATLASSIAN_BASE_URL")
            .map_err(|_| eyre!("ATLASSIAN_BASE_URL environment variable not set"))?;
        let email = std::env::var("ATLASSIAN_EMAIL")
            .map_err(|_| eyre!("ATLASSIAN_EMAIL environment variable not set"))?;
        let api_token = std::env::var("ATLASSIAN_API_TOKEN")
            .map_err(|_| eyre!("ATLASSIAN_API_TOKEN environment variable not set"))?;

        let enabled = std::env::var("CONFLUENCE_ENABLE_WRITES")
            .map(|value| parse_flag(&value))
            .unwrap_or(false);
        let allowed_spaces = std::env::var("CONFLUENCE_ALLOWED_SPACES")
            .map(|value| WritePolicy::parse_allowed_spaces(&value))
            .unwrap_or_default();

        Ok(Self::new(&base_url, &email, &api_token)
            .with_write_policy(WritePolicy::new(enabled, allowed_spaces)))
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Create an authenticated HTTP client with Basic Auth headers
pub fn create_authenticated_client(config: &ConfluenceConfig) -> Result<reqwest::Client, Error> {
    use base64::Engine;
    use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

    let auth_string = format!("{}:{}", config.email, config.api_token);
    let auth_encoded = base64::engine::general_purpose::STANDARD.encode(&auth_string);

    let mut headers = HeaderMap::new();
    let mut auth_value = HeaderValue::from_str(&format!("Basic {auth_encoded}"))
        .map_err(|e| Error::Config(format!("Invalid header value: {e}")))?;
    auth_value.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth_value);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))
}
