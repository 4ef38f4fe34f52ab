//! Graph write interface: batches, payload types, and the store trait.
//!
//! The same `GitHubUser` node label is written with two property subsets,
//! depending on whether the batch came from the affiliated or the
//! unaffiliated side of reconciliation. The split is modeled as one base
//! record plus an optional org-scoped extension rather than two full field
//! lists, so the non-clobber contract lives in a single place: a write
//! with `org_scoped: None` must leave previously stored role and
//! two-factor attributes untouched.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;
use crate::model::{OrgDescriptor, OrgRole, UpdateTag};

/// Cleanup job descriptor invoked after every successful run.
///
/// Users have no owning-tenant relationship, so no tenant-scoped deletion
/// applies; the job identifier is fixed.
pub const USERS_CLEANUP_JOB: &str = "github_users_cleanup.json";

/// Relationship kind between a user and the target organization.
///
/// Mutually exclusive per (user, organization) pair within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrgRelation {
    /// Direct membership in the organization.
    MemberOf,
    /// Enterprise owner without direct membership.
    Unaffiliated,
}

impl OrgRelation {
    /// Get the edge label used in the graph.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgRelation::MemberOf => "MEMBER_OF",
            OrgRelation::Unaffiliated => "UNAFFILIATED",
        }
    }
}

impl fmt::Display for OrgRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Properties that exist only for users affiliated with the target
/// organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgScoped {
    /// Role in the organization.
    pub role: OrgRole,
    /// Two-factor flag as reported for direct members.
    pub has_two_factor_enabled: Option<bool>,
}

/// One user upsert payload, keyed by the immutable node URL.
///
/// Base properties are overwritten unconditionally on every write. The
/// org-scoped extension is overwritten when present and omitted from the
/// write entirely when `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserWrite {
    /// User node URL (external id).
    pub url: String,
    /// Login handle; indexed secondarily in the graph.
    pub username: String,
    /// Display name.
    pub fullname: Option<String>,
    /// Site administrator flag.
    pub is_site_admin: Option<bool>,
    /// Enterprise-owner flag (derived for members, forced true for
    /// unaffiliated owners).
    pub is_enterprise_owner: bool,
    /// Primary email address.
    pub email: Option<String>,
    /// Free-form company field.
    pub company: Option<String>,
    /// Affiliated-only property subset; `None` for unaffiliated writes.
    pub org_scoped: Option<OrgScoped>,
}

/// A full upsert batch for one write phase.
#[derive(Debug, Clone)]
pub struct UserBatch {
    /// The validated organization every user in the batch relates to.
    pub org: OrgDescriptor,
    /// Edge kind created between each user and the organization.
    pub relation: OrgRelation,
    /// Upsert payloads.
    pub users: Vec<UserWrite>,
}

/// Parameters handed to post-sync collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParameters {
    /// The run's update tag.
    pub update_tag: UpdateTag,
    /// URL of the organization the run was scoped to.
    pub org_url: String,
}

/// Sync-completion metadata recorded after a fully successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMetadata {
    /// Grouping node type.
    pub group_type: String,
    /// Id of the validated organization.
    pub group_id: String,
    /// The node type that was synced.
    pub synced_type: String,
    /// The run's update tag.
    pub update_tag: UpdateTag,
}

impl SyncMetadata {
    /// Completion metadata for a GitHub organization user sync.
    #[must_use]
    pub fn for_org(org: &OrgDescriptor, update_tag: UpdateTag) -> Self {
        Self {
            group_type: "GitHubOrganization".to_string(),
            group_id: org.url.clone(),
            synced_type: "GitHubOrganization".to_string(),
            update_tag,
        }
    }
}

/// A property graph store accepting idempotent, batched upserts.
///
/// Node upserts are keyed by external URL, edge upserts by
/// (source URL, target URL, relation). Implementations must apply each
/// [`load_users`](GraphStore::load_users) batch atomically: either every
/// record in the batch is applied or none is. Creation stamps
/// (`firstseen`) are set exactly once; update stamps (`lastupdated`) are
/// refreshed on every touched node and edge.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Upsert one batch of users, the organization they relate to, and
    /// one edge per user, all stamped with `update_tag`.
    async fn load_users(&self, batch: UserBatch, update_tag: UpdateTag) -> SyncResult<()>;

    /// Invoke a cleanup job by its fixed descriptor.
    async fn run_cleanup_job(&self, job_name: &str, params: &JobParameters) -> SyncResult<()>;

    /// Record sync-completion metadata. Called only after both write
    /// phases succeeded.
    async fn merge_sync_metadata(&self, metadata: SyncMetadata) -> SyncResult<()>;
}
