//! In-memory graph store with full upsert semantics.
//!
//! Reference implementation of [`GraphStore`] used by tests and dry runs.
//! It honors the same contract a real graph driver would: merge-by-id
//! nodes and edges, `firstseen` stamped once at creation, `lastupdated`
//! refreshed on every touch, and org-scoped properties left untouched
//! when a write omits them.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::SyncResult;
use crate::model::{OrgRole, UpdateTag};
use crate::store::{GraphStore, JobParameters, OrgRelation, SyncMetadata, UserBatch, UserWrite};

/// A stored `GitHubUser` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub url: String,
    pub username: String,
    pub fullname: Option<String>,
    pub is_site_admin: Option<bool>,
    pub is_enterprise_owner: bool,
    pub email: Option<String>,
    pub company: Option<String>,
    /// Role in an organization; present only if some affiliated write set it.
    pub role: Option<OrgRole>,
    /// Two-factor flag; present only if some affiliated write set it.
    pub has_two_factor_enabled: Option<bool>,
    pub firstseen: DateTime<Utc>,
    pub lastupdated: UpdateTag,
}

/// A stored `GitHubOrganization` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredOrg {
    pub url: String,
    pub login: String,
    pub firstseen: DateTime<Utc>,
    pub lastupdated: UpdateTag,
}

/// A stored user→organization edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredEdge {
    pub firstseen: DateTime<Utc>,
    pub lastupdated: UpdateTag,
}

#[derive(Debug, Default)]
struct GraphState {
    users: HashMap<String, StoredUser>,
    orgs: HashMap<String, StoredOrg>,
    edges: HashMap<(String, String, OrgRelation), StoredEdge>,
    /// Secondary index: login → node URL.
    logins: HashMap<String, String>,
    cleanup_runs: Vec<(String, JobParameters)>,
    /// Completion metadata keyed by group id.
    metadata: HashMap<String, SyncMetadata>,
}

impl GraphState {
    fn upsert_org(&mut self, url: &str, login: &str, update_tag: UpdateTag) {
        self.orgs
            .entry(url.to_string())
            .and_modify(|org| {
                org.login = login.to_string();
                org.lastupdated = update_tag;
            })
            .or_insert_with(|| StoredOrg {
                url: url.to_string(),
                login: login.to_string(),
                firstseen: Utc::now(),
                lastupdated: update_tag,
            });
    }

    fn upsert_user(&mut self, write: &UserWrite, update_tag: UpdateTag) {
        let user = self
            .users
            .entry(write.url.clone())
            .or_insert_with(|| StoredUser {
                url: write.url.clone(),
                username: write.username.clone(),
                fullname: None,
                is_site_admin: None,
                is_enterprise_owner: false,
                email: None,
                company: None,
                role: None,
                has_two_factor_enabled: None,
                firstseen: Utc::now(),
                lastupdated: update_tag,
            });

        // Logins can change between runs; drop the stale index entry so
        // the old login no longer resolves to this node.
        if user.username != write.username {
            self.logins.remove(&user.username);
        }

        // Base properties are overwritten unconditionally.
        user.username = write.username.clone();
        user.fullname = write.fullname.clone();
        user.is_site_admin = write.is_site_admin;
        user.is_enterprise_owner = write.is_enterprise_owner;
        user.email = write.email.clone();
        user.company = write.company.clone();
        user.lastupdated = update_tag;

        // Org-scoped properties only when the write carries them; an
        // unaffiliated write must not blank out values set by an
        // affiliated write for another organization.
        if let Some(scoped) = &write.org_scoped {
            user.role = Some(scoped.role);
            user.has_two_factor_enabled = scoped.has_two_factor_enabled;
        }

        self.logins
            .insert(write.username.clone(), write.url.clone());
    }

    fn upsert_edge(
        &mut self,
        user_url: &str,
        org_url: &str,
        relation: OrgRelation,
        update_tag: UpdateTag,
    ) {
        self.edges
            .entry((user_url.to_string(), org_url.to_string(), relation))
            .and_modify(|edge| edge.lastupdated = update_tag)
            .or_insert_with(|| StoredEdge {
                firstseen: Utc::now(),
                lastupdated: update_tag,
            });
    }
}

/// In-memory [`GraphStore`] implementation.
///
/// Each batch is applied under a single write lock, so readers observe a
/// batch all-or-nothing.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    state: RwLock<GraphState>,
}

impl MemoryGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a user node by URL.
    pub async fn user(&self, url: &str) -> Option<StoredUser> {
        self.state.read().await.users.get(url).cloned()
    }

    /// Look up a user node URL by login, via the secondary index.
    pub async fn user_url_by_login(&self, login: &str) -> Option<String> {
        self.state.read().await.logins.get(login).cloned()
    }

    /// Look up an organization node by URL.
    pub async fn organization(&self, url: &str) -> Option<StoredOrg> {
        self.state.read().await.orgs.get(url).cloned()
    }

    /// Look up a user→organization edge.
    pub async fn edge(
        &self,
        user_url: &str,
        org_url: &str,
        relation: OrgRelation,
    ) -> Option<StoredEdge> {
        self.state
            .read()
            .await
            .edges
            .get(&(user_url.to_string(), org_url.to_string(), relation))
            .copied()
    }

    /// All stored user nodes.
    pub async fn users(&self) -> Vec<StoredUser> {
        self.state.read().await.users.values().cloned().collect()
    }

    /// Number of stored user nodes.
    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }

    /// Number of stored edges.
    pub async fn edge_count(&self) -> usize {
        self.state.read().await.edges.len()
    }

    /// Cleanup jobs invoked so far, in order.
    pub async fn cleanup_runs(&self) -> Vec<(String, JobParameters)> {
        self.state.read().await.cleanup_runs.clone()
    }

    /// Completion metadata for a group id, if recorded.
    pub async fn metadata(&self, group_id: &str) -> Option<SyncMetadata> {
        self.state.read().await.metadata.get(group_id).cloned()
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn load_users(&self, batch: UserBatch, update_tag: UpdateTag) -> SyncResult<()> {
        info!(
            users = batch.users.len(),
            relation = %batch.relation,
            org = %batch.org.login,
            "Loading user batch into the graph"
        );

        let mut state = self.state.write().await;
        state.upsert_org(&batch.org.url, &batch.org.login, update_tag);
        for write in &batch.users {
            state.upsert_user(write, update_tag);
            state.upsert_edge(&write.url, &batch.org.url, batch.relation, update_tag);
        }
        Ok(())
    }

    async fn run_cleanup_job(&self, job_name: &str, params: &JobParameters) -> SyncResult<()> {
        let mut state = self.state.write().await;
        state
            .cleanup_runs
            .push((job_name.to_string(), params.clone()));
        Ok(())
    }

    async fn merge_sync_metadata(&self, metadata: SyncMetadata) -> SyncResult<()> {
        let mut state = self.state.write().await;
        state.metadata.insert(metadata.group_id.clone(), metadata);
        Ok(())
    }
}
