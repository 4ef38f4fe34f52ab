//! The paginated-fetch contract consumed by the sync orchestrator.

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::model::{MemberEdge, OrgDescriptor, OwnerEdge};

/// A source of fully materialized user edge lists for one organization.
///
/// Implementations are expected to drain pagination completely before
/// returning; no partial pages surface to the sync engine. Each call is
/// treated as a single atomic read and is independently retryable by the
/// implementation.
///
/// [`GithubClient`](crate::client::GithubClient) implements this against
/// the GraphQL API; tests substitute canned data.
#[async_trait]
pub trait UserSource: Send + Sync {
    /// Fetch all direct-member edges plus the descriptor of the
    /// organization the query was scoped to.
    async fn fetch_members(&self) -> SyncResult<(Vec<MemberEdge>, OrgDescriptor)>;

    /// Fetch all enterprise-owner edges plus the descriptor of the
    /// organization the query was scoped to.
    async fn fetch_owners(&self) -> SyncResult<(Vec<OwnerEdge>, OrgDescriptor)>;
}
