//! GitHub GraphQL v4 client with cursor pagination and retry handling.

use std::time::Duration;

use secrecy::ExposeSecret;
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::config::{GithubConfig, GithubCredentials};
use crate::error::{GithubSyncError, SyncResult};
use crate::model::{MemberEdge, OrgDescriptor, OwnerEdge};
use crate::source::UserSource;

/// Paginated query for users directly affiliated with the organization.
///
/// See <https://docs.github.com/en/graphql/reference/objects#organizationmemberedge>.
const ORG_MEMBERS_QUERY: &str = r"
    query($login: String!, $cursor: String) {
        organization(login: $login) {
            url
            login
            membersWithRole(first: 100, after: $cursor) {
                edges {
                    hasTwoFactorEnabled
                    node {
                        url
                        login
                        name
                        isSiteAdmin
                        email
                        company
                    }
                    role
                }
                pageInfo {
                    endCursor
                    hasNextPage
                }
            }
        }
    }
";

/// Paginated query for enterprise owners of the organization.
///
/// See <https://docs.github.com/en/graphql/reference/objects#organizationenterpriseowneredge>.
const ENTERPRISE_OWNERS_QUERY: &str = r"
    query($login: String!, $cursor: String) {
        organization(login: $login) {
            url
            login
            enterpriseOwners(first: 100, after: $cursor) {
                edges {
                    node {
                        url
                        login
                        name
                        isSiteAdmin
                        email
                        company
                    }
                    organizationRole
                }
                pageInfo {
                    endCursor
                    hasNextPage
                }
            }
        }
    }
";

/// GitHub GraphQL API client.
///
/// Drains pagination fully before returning; callers see each query as a
/// single atomic read of the accumulated edge list plus the organization
/// descriptor it was scoped to.
#[derive(Debug)]
pub struct GithubClient {
    http_client: reqwest::Client,
    api_url: String,
    organization: String,
    credentials: GithubCredentials,
    max_retries: u32,
}

impl GithubClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: GithubConfig, credentials: GithubCredentials) -> SyncResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("github-graph-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GithubSyncError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            api_url: config.api_url,
            organization: config.organization,
            credentials,
            max_retries: config.max_retries,
        })
    }

    /// The login name of the target organization.
    #[must_use]
    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// Executes one GraphQL request with retry for transient failures.
    async fn post_query(
        &self,
        query: &str,
        cursor: Option<&str>,
    ) -> SyncResult<serde_json::Value> {
        let body = json!({
            "query": query,
            "variables": { "login": self.organization, "cursor": cursor },
        });

        let mut retries = 0;
        let mut rate_limit_attempts = 0u32;
        let mut delay = Duration::from_secs(1);

        loop {
            let response = self
                .http_client
                .post(&self.api_url)
                .bearer_auth(self.credentials.token.expose_secret())
                .json(&body)
                .send()
                .await?;
            let status = response.status();

            // Secondary rate limits surface as 429 with a Retry-After hint.
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if rate_limit_attempts >= self.max_retries {
                    return Err(GithubSyncError::RateLimited {
                        attempts: rate_limit_attempts,
                    });
                }
                let wait = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map_or(delay, Duration::from_secs);
                rate_limit_attempts += 1;
                warn!(
                    "Rate limited, attempt {}/{}, waiting {:?}",
                    rate_limit_attempts, self.max_retries, wait
                );
                tokio::time::sleep(wait).await;
                delay *= 2;
                continue;
            }

            if matches!(
                status,
                reqwest::StatusCode::BAD_GATEWAY
                    | reqwest::StatusCode::SERVICE_UNAVAILABLE
                    | reqwest::StatusCode::GATEWAY_TIMEOUT
            ) && retries < self.max_retries
            {
                retries += 1;
                warn!(
                    "Transient error {}, retry {}/{} after {:?}",
                    status, retries, self.max_retries, delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(GithubSyncError::GraphQl {
                    message: format!("{status}: {body}"),
                });
            }

            let payload: serde_json::Value = response.json().await?;

            // GraphQL errors come back with HTTP 200.
            if let Some(errors) = payload.get("errors").and_then(|v| v.as_array()) {
                if !errors.is_empty() {
                    let message = errors
                        .iter()
                        .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
                        .collect::<Vec<_>>()
                        .join("; ");
                    return Err(GithubSyncError::GraphQl { message });
                }
            }

            return Ok(payload);
        }
    }

    /// Fetches every page of one organization connection, accumulating raw
    /// edges in encounter order.
    ///
    /// `resource` names the connection inside the `organization` object
    /// (`membersWithRole` or `enterpriseOwners`).
    #[instrument(skip(self, query), fields(organization = %self.organization))]
    async fn fetch_connection(
        &self,
        query: &str,
        resource: &'static str,
    ) -> SyncResult<(Vec<serde_json::Value>, OrgDescriptor)> {
        let mut edges = Vec::new();
        let mut cursor: Option<String> = None;
        let mut org: Option<OrgDescriptor> = None;

        loop {
            let payload = self.post_query(query, cursor.as_deref()).await?;
            let organization = payload
                .get("data")
                .and_then(|d| d.get("organization"))
                .filter(|o| !o.is_null())
                .ok_or(GithubSyncError::MissingField {
                    field: "organization",
                    context: "query response",
                })?;

            if org.is_none() {
                org = Some(OrgDescriptor::from_json(organization)?);
            }

            let connection =
                organization
                    .get(resource)
                    .ok_or(GithubSyncError::MissingField {
                        field: "connection",
                        context: "organization object",
                    })?;
            let page = connection
                .get("edges")
                .and_then(|e| e.as_array())
                .ok_or(GithubSyncError::MissingField {
                    field: "edges",
                    context: "connection",
                })?;
            debug!("Fetched page with {} {} edges", page.len(), resource);
            edges.extend(page.iter().cloned());

            let page_info =
                connection
                    .get("pageInfo")
                    .ok_or(GithubSyncError::MissingField {
                        field: "pageInfo",
                        context: "connection",
                    })?;
            let has_next = page_info
                .get("hasNextPage")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if !has_next {
                break;
            }
            // A truthful hasNextPage must come with a cursor; restarting
            // from a null cursor would re-fetch page one indefinitely.
            cursor = Some(
                page_info
                    .get("endCursor")
                    .and_then(|v| v.as_str())
                    .map(String::from)
                    .ok_or(GithubSyncError::MissingField {
                        field: "endCursor",
                        context: "pageInfo",
                    })?,
            );
        }

        // org is always Some here: the loop body runs at least once.
        let org = org.ok_or(GithubSyncError::MissingField {
            field: "organization",
            context: "query response",
        })?;
        Ok((edges, org))
    }
}

#[async_trait::async_trait]
impl UserSource for GithubClient {
    #[instrument(skip(self), fields(organization = %self.organization))]
    async fn fetch_members(&self) -> SyncResult<(Vec<MemberEdge>, OrgDescriptor)> {
        let (raw, org) = self
            .fetch_connection(ORG_MEMBERS_QUERY, "membersWithRole")
            .await?;
        let members = raw
            .iter()
            .map(MemberEdge::from_json)
            .collect::<SyncResult<Vec<_>>>()?;
        debug!("Fetched {} member edges", members.len());
        Ok((members, org))
    }

    #[instrument(skip(self), fields(organization = %self.organization))]
    async fn fetch_owners(&self) -> SyncResult<(Vec<OwnerEdge>, OrgDescriptor)> {
        let (raw, org) = self
            .fetch_connection(ENTERPRISE_OWNERS_QUERY, "enterpriseOwners")
            .await?;
        let owners = raw
            .iter()
            .map(OwnerEdge::from_json)
            .collect::<SyncResult<Vec<_>>>()?;
        debug!("Fetched {} owner edges", owners.len());
        Ok((owners, org))
    }
}
