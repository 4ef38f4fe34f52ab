//! Sync orchestration: fetch, validate, reconcile, write, finalize.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{GithubSyncError, SyncResult};
use crate::loader::UserLoader;
use crate::model::{OrgDescriptor, UpdateTag};
use crate::reconcile::{reconcile, validate_org};
use crate::source::UserSource;
use crate::store::{GraphStore, JobParameters, SyncMetadata, USERS_CLEANUP_JOB};

/// Stage of a sync run.
///
/// Runs progress linearly through the non-terminal stages; `Failed` is
/// reachable from any of them. No stage is re-entrant within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    /// Fetching member and owner edges (concurrently).
    Fetching,
    /// Validating that both fetches describe the same organization.
    Validating,
    /// Partitioning owners and decorating members.
    Reconciling,
    /// Phase 1: writing affiliated members.
    WritingAffiliated,
    /// Phase 2: writing unaffiliated owners.
    WritingUnaffiliated,
    /// Cleanup invocation and metadata recording.
    Finalizing,
    /// Run completed successfully.
    Done,
    /// Run aborted on unrecoverable error.
    Failed,
}

impl SyncStage {
    /// Get the string representation used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStage::Fetching => "fetching",
            SyncStage::Validating => "validating",
            SyncStage::Reconciling => "reconciling",
            SyncStage::WritingAffiliated => "writing_affiliated",
            SyncStage::WritingUnaffiliated => "writing_unaffiliated",
            SyncStage::Finalizing => "finalizing",
            SyncStage::Done => "done",
            SyncStage::Failed => "failed",
        }
    }

    /// Check if the stage is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStage::Done | SyncStage::Failed)
    }

    /// The stage that follows this one on success.
    #[must_use]
    pub fn next(&self) -> SyncStage {
        match self {
            SyncStage::Fetching => SyncStage::Validating,
            SyncStage::Validating => SyncStage::Reconciling,
            SyncStage::Reconciling => SyncStage::WritingAffiliated,
            SyncStage::WritingAffiliated => SyncStage::WritingUnaffiliated,
            SyncStage::WritingUnaffiliated => SyncStage::Finalizing,
            SyncStage::Finalizing | SyncStage::Done => SyncStage::Done,
            SyncStage::Failed => SyncStage::Failed,
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Summary of one completed sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// Run identifier, for log correlation.
    pub run_id: Uuid,
    /// The validated organization the run was scoped to.
    pub org: OrgDescriptor,
    /// The tag stamped on every node and edge this run touched.
    pub update_tag: UpdateTag,
    /// Number of affiliated members written in Phase 1.
    pub affiliated: usize,
    /// Number of unaffiliated owners written in Phase 2.
    pub unaffiliated: usize,
}

/// Sequences one full sync run against a source and a store.
///
/// The update tag is chosen once per run and shared read-only by both
/// write phases; completion metadata is recorded only when every step
/// succeeded.
pub struct SyncOrchestrator<'a> {
    source: &'a dyn UserSource,
    store: &'a dyn GraphStore,
}

impl<'a> SyncOrchestrator<'a> {
    /// Creates an orchestrator over the given collaborators.
    #[must_use]
    pub fn new(source: &'a dyn UserSource, store: &'a dyn GraphStore) -> Self {
        Self { source, store }
    }

    /// Runs one sync with a fresh update tag.
    pub async fn run(&self) -> SyncResult<SyncReport> {
        self.run_with_tag(UpdateTag::now()).await
    }

    /// Runs one sync with an explicit update tag.
    ///
    /// Any fatal error aborts the remaining sequence; the returned error
    /// names the stage it occurred in.
    #[instrument(skip(self), fields(run_id = tracing::field::Empty))]
    pub async fn run_with_tag(&self, update_tag: UpdateTag) -> SyncResult<SyncReport> {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        info!(%update_tag, "Syncing GitHub users");

        // The two fetches have no ordering dependency; join before
        // reconciliation begins.
        let (members_result, owners_result) =
            tokio::join!(self.source.fetch_members(), self.source.fetch_owners());
        let (members, members_org) =
            members_result.map_err(|e| GithubSyncError::at_stage(SyncStage::Fetching, e))?;
        let (owners, owners_org) =
            owners_result.map_err(|e| GithubSyncError::at_stage(SyncStage::Fetching, e))?;

        let org = validate_org(&members_org, &owners_org)
            .map_err(|e| GithubSyncError::at_stage(SyncStage::Validating, e))?;

        let reconciled = reconcile(members, owners);
        let affiliated = reconciled.affiliated.len();
        let unaffiliated = reconciled.unaffiliated.len();

        let loader = UserLoader::new(self.store);
        loader
            .load_affiliated(&reconciled.affiliated, &org, update_tag)
            .await
            .map_err(|e| GithubSyncError::at_stage(SyncStage::WritingAffiliated, e))?;
        loader
            .load_unaffiliated(&reconciled.unaffiliated, &org, update_tag)
            .await
            .map_err(|e| GithubSyncError::at_stage(SyncStage::WritingUnaffiliated, e))?;

        // Users have no owning-tenant relationship, so the cleanup job is
        // fixed rather than derived from the org.
        let params = JobParameters {
            update_tag,
            org_url: org.url.clone(),
        };
        self.store
            .run_cleanup_job(USERS_CLEANUP_JOB, &params)
            .await
            .map_err(|e| GithubSyncError::at_stage(SyncStage::Finalizing, e))?;
        self.store
            .merge_sync_metadata(SyncMetadata::for_org(&org, update_tag))
            .await
            .map_err(|e| GithubSyncError::at_stage(SyncStage::Finalizing, e))?;

        info!(
            org = %org.login,
            affiliated,
            unaffiliated,
            "GitHub user sync completed"
        );

        Ok(SyncReport {
            run_id,
            org,
            update_tag,
            affiliated,
            unaffiliated,
        })
    }
}
