//! Configuration for the GitHub sync client.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::{GithubSyncError, SyncResult};

/// Default GitHub GraphQL v4 endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com/graphql";

/// Credentials for the GitHub API.
#[derive(Debug, Clone)]
pub struct GithubCredentials {
    /// Bearer token (personal access token or app installation token).
    pub token: SecretString,
}

impl GithubCredentials {
    /// Creates credentials from a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into().into(),
        }
    }
}

/// Configuration for [`GithubClient`](crate::client::GithubClient).
#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// GraphQL API endpoint.
    pub api_url: String,
    /// Login name of the target organization.
    pub organization: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Maximum retries for transient HTTP failures.
    pub max_retries: u32,
}

impl GithubConfig {
    /// Start building a configuration for the given organization.
    #[must_use]
    pub fn builder(organization: impl Into<String>) -> GithubConfigBuilder {
        GithubConfigBuilder {
            api_url: DEFAULT_API_URL.to_string(),
            organization: organization.into(),
            request_timeout: Duration::from_secs(30),
            max_retries: 5,
        }
    }
}

/// Builder for [`GithubConfig`].
#[derive(Debug, Clone)]
pub struct GithubConfigBuilder {
    api_url: String,
    organization: String,
    request_timeout: Duration,
    max_retries: u32,
}

impl GithubConfigBuilder {
    /// Override the API endpoint (e.g. a GitHub Enterprise Server URL).
    #[must_use]
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Override the per-request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override the transient-failure retry budget.
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GithubSyncError::Config`] if the organization is empty or
    /// the endpoint is not a valid URL.
    pub fn build(self) -> SyncResult<GithubConfig> {
        if self.organization.trim().is_empty() {
            return Err(GithubSyncError::Config(
                "organization login must not be empty".to_string(),
            ));
        }
        url::Url::parse(&self.api_url)
            .map_err(|e| GithubSyncError::Config(format!("invalid api_url: {e}")))?;

        Ok(GithubConfig {
            api_url: self.api_url,
            organization: self.organization,
            request_timeout: self.request_timeout,
            max_retries: self.max_retries,
        })
    }
}
