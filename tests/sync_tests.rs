//! End-to-end sync tests against the in-memory graph store.

mod common;

use async_trait::async_trait;
use common::*;

use github_graph_sync::{
    GithubSyncError, GraphStore, JobParameters, MemoryGraph, OrgDescriptor, OrgRelation, OrgRole,
    SyncMetadata, SyncOrchestrator, SyncResult, SyncStage, UpdateTag, UserBatch,
    USERS_CLEANUP_JOB,
};

const TEST_UPDATE_TAG: UpdateTag = UpdateTag(123_456_789);

fn user_url(login: &str) -> String {
    format!("https://example.com/{login}")
}

/// The canonical scenario: Homer and Marge are members, Kyle is an
/// unaffiliated enterprise owner, Bart and Lisa are affiliated owners who
/// only flip flags and never become separate records.
#[tokio::test]
async fn test_sync_loads_expected_population() {
    let source = StubSource::canonical();
    let graph = MemoryGraph::new();

    let report = SyncOrchestrator::new(&source, &graph)
        .run_with_tag(TEST_UPDATE_TAG)
        .await
        .unwrap();

    assert_eq!(report.affiliated, 2);
    assert_eq!(report.unaffiliated, 1);
    assert_eq!(report.org, org_descriptor());
    assert_eq!(report.update_tag, TEST_UPDATE_TAG);

    // Exactly the three expected user nodes; affiliated owners that are
    // not members never materialize.
    assert_eq!(graph.user_count().await, 3);
    assert!(graph.user(&user_url("bjsimpson")).await.is_none());
    assert!(graph.user(&user_url("lmsimpson")).await.is_none());

    let homer = graph.user(&user_url("hjsimpson")).await.unwrap();
    assert_eq!(homer.role, Some(OrgRole::Member));
    assert!(!homer.is_enterprise_owner);
    assert_eq!(homer.has_two_factor_enabled, None);
    assert_eq!(homer.lastupdated, TEST_UPDATE_TAG);

    let marge = graph.user(&user_url("mbsimpson")).await.unwrap();
    assert_eq!(marge.role, Some(OrgRole::Admin));
    assert_eq!(marge.has_two_factor_enabled, Some(true));
    assert!(!marge.is_enterprise_owner);

    let kyle = graph.user(&user_url("kbroflovski")).await.unwrap();
    assert!(kyle.is_enterprise_owner);
    assert_eq!(kyle.role, None);
    assert_eq!(kyle.has_two_factor_enabled, None);

    // Edges connect the expected users with the expected labels.
    for login in ["hjsimpson", "mbsimpson"] {
        assert!(graph
            .edge(&user_url(login), ORG_URL, OrgRelation::MemberOf)
            .await
            .is_some());
    }
    let kyle_edge = graph
        .edge(&user_url("kbroflovski"), ORG_URL, OrgRelation::Unaffiliated)
        .await
        .unwrap();
    assert_eq!(kyle_edge.lastupdated, TEST_UPDATE_TAG);

    // Organization node refreshed with the run's tag.
    let org = graph.organization(ORG_URL).await.unwrap();
    assert_eq!(org.login, ORG_LOGIN);
    assert_eq!(org.lastupdated, TEST_UPDATE_TAG);
}

#[tokio::test]
async fn test_sync_records_cleanup_and_metadata_on_success() {
    let source = StubSource::canonical();
    let graph = MemoryGraph::new();

    SyncOrchestrator::new(&source, &graph)
        .run_with_tag(TEST_UPDATE_TAG)
        .await
        .unwrap();

    let runs = graph.cleanup_runs().await;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].0, USERS_CLEANUP_JOB);
    assert_eq!(runs[0].1.update_tag, TEST_UPDATE_TAG);
    assert_eq!(runs[0].1.org_url, ORG_URL);

    let meta = graph.metadata(ORG_URL).await.unwrap();
    assert_eq!(meta.group_type, "GitHubOrganization");
    assert_eq!(meta.synced_type, "GitHubOrganization");
    assert_eq!(meta.update_tag, TEST_UPDATE_TAG);
}

/// A member who is also an affiliated enterprise owner gets the derived
/// flag on their member record.
#[tokio::test]
async fn test_member_who_is_enterprise_owner_is_flagged() {
    let mut source = StubSource::canonical();
    source.members.push(
        github_graph_sync::MemberEdge::from_json(&member_edge(
            "lmsimpson",
            "Lisa Simpson",
            "MEMBER",
            None,
        ))
        .unwrap(),
    );
    let graph = MemoryGraph::new();

    SyncOrchestrator::new(&source, &graph)
        .run_with_tag(TEST_UPDATE_TAG)
        .await
        .unwrap();

    let lisa = graph.user(&user_url("lmsimpson")).await.unwrap();
    assert!(lisa.is_enterprise_owner);
    assert_eq!(lisa.role, Some(OrgRole::Member));
    assert!(graph
        .edge(&user_url("lmsimpson"), ORG_URL, OrgRelation::MemberOf)
        .await
        .is_some());
    // Still only one edge for Lisa; affiliated owners get no UNAFFILIATED edge.
    assert!(graph
        .edge(&user_url("lmsimpson"), ORG_URL, OrgRelation::Unaffiliated)
        .await
        .is_none());
}

/// Re-running with identical input produces no duplicates and only moves
/// the update stamps.
#[tokio::test]
async fn test_sync_is_idempotent() {
    let source = StubSource::canonical();
    let graph = MemoryGraph::new();
    let orchestrator = SyncOrchestrator::new(&source, &graph);

    orchestrator.run_with_tag(UpdateTag(1)).await.unwrap();
    let homer_before = graph.user(&user_url("hjsimpson")).await.unwrap();
    let users_before = graph.user_count().await;
    let edges_before = graph.edge_count().await;

    orchestrator.run_with_tag(UpdateTag(2)).await.unwrap();
    let homer_after = graph.user(&user_url("hjsimpson")).await.unwrap();

    assert_eq!(graph.user_count().await, users_before);
    assert_eq!(graph.edge_count().await, edges_before);
    assert_eq!(homer_after.firstseen, homer_before.firstseen);
    assert_eq!(homer_after.lastupdated, UpdateTag(2));
    assert_eq!(homer_after.role, homer_before.role);
    assert_eq!(homer_after.email, homer_before.email);
}

/// A later run against a different organization that lists an existing
/// member as an unaffiliated owner must not erase role or 2FA values
/// written by the earlier affiliated run.
#[tokio::test]
async fn test_overlapping_rerun_preserves_affiliated_attributes() {
    let graph = MemoryGraph::new();

    let first = StubSource::canonical();
    SyncOrchestrator::new(&first, &graph)
        .run_with_tag(UpdateTag(1))
        .await
        .unwrap();

    let other_org = OrgDescriptor {
        url: "https://example.com/other_org".to_string(),
        login: "other_org".to_string(),
    };
    let second = StubSource {
        members: vec![],
        members_org: other_org.clone(),
        owners: vec![github_graph_sync::OwnerEdge::from_json(&owner_edge(
            "mbsimpson",
            "Marge Simpson",
            "UNAFFILIATED",
        ))
        .unwrap()],
        owners_org: other_org.clone(),
    };
    SyncOrchestrator::new(&second, &graph)
        .run_with_tag(UpdateTag(2))
        .await
        .unwrap();

    let marge = graph.user(&user_url("mbsimpson")).await.unwrap();
    assert_eq!(marge.role, Some(OrgRole::Admin));
    assert_eq!(marge.has_two_factor_enabled, Some(true));
    assert!(marge.is_enterprise_owner);
    assert_eq!(marge.lastupdated, UpdateTag(2));

    // Exclusivity is per (user, org) pair: both edges coexist.
    assert!(graph
        .edge(&user_url("mbsimpson"), ORG_URL, OrgRelation::MemberOf)
        .await
        .is_some());
    assert!(graph
        .edge(&user_url("mbsimpson"), &other_org.url, OrgRelation::Unaffiliated)
        .await
        .is_some());
}

/// The two source queries disagreeing on the organization aborts the run
/// before anything is written.
#[tokio::test]
async fn test_org_mismatch_aborts_before_any_write() {
    let mut source = StubSource::canonical();
    source.owners_org = OrgDescriptor {
        url: "https://example.com/someone_elses_org".to_string(),
        login: "someone_elses_org".to_string(),
    };
    let graph = MemoryGraph::new();

    let err = SyncOrchestrator::new(&source, &graph)
        .run_with_tag(TEST_UPDATE_TAG)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(SyncStage::Validating));
    assert_eq!(graph.user_count().await, 0);
    assert_eq!(graph.edge_count().await, 0);
    assert!(graph.cleanup_runs().await.is_empty());
    assert!(graph.metadata(ORG_URL).await.is_none());
}

#[tokio::test]
async fn test_fetch_failure_aborts_run() {
    let graph = MemoryGraph::new();
    let err = SyncOrchestrator::new(&FailingOwnerSource, &graph)
        .run_with_tag(TEST_UPDATE_TAG)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(SyncStage::Fetching));
    assert_eq!(graph.user_count().await, 0);
}

/// Store that fails the unaffiliated batch, simulating a Phase 2 write
/// failure after a successful Phase 1.
struct Phase2FailingStore {
    inner: MemoryGraph,
}

#[async_trait]
impl GraphStore for Phase2FailingStore {
    async fn load_users(&self, batch: UserBatch, update_tag: UpdateTag) -> SyncResult<()> {
        if batch.relation == OrgRelation::Unaffiliated {
            return Err(GithubSyncError::Store(
                "transaction rolled back".to_string(),
            ));
        }
        self.inner.load_users(batch, update_tag).await
    }

    async fn run_cleanup_job(&self, job_name: &str, params: &JobParameters) -> SyncResult<()> {
        self.inner.run_cleanup_job(job_name, params).await
    }

    async fn merge_sync_metadata(&self, metadata: SyncMetadata) -> SyncResult<()> {
        self.inner.merge_sync_metadata(metadata).await
    }
}

/// Phase 2 failure leaves Phase 1 data in place (the next run reconciles
/// it) but records no completion metadata and runs no cleanup.
#[tokio::test]
async fn test_phase2_failure_skips_finalization() {
    let source = StubSource::canonical();
    let store = Phase2FailingStore {
        inner: MemoryGraph::new(),
    };

    let err = SyncOrchestrator::new(&source, &store)
        .run_with_tag(TEST_UPDATE_TAG)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(SyncStage::WritingUnaffiliated));
    // Affiliated batch landed.
    assert_eq!(store.inner.user_count().await, 2);
    assert!(store.inner.user(&user_url("kbroflovski")).await.is_none());
    // No post-sync bookkeeping.
    assert!(store.inner.cleanup_runs().await.is_empty());
    assert!(store.inner.metadata(ORG_URL).await.is_none());
}
