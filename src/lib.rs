//! GitHub organization user sync for a property graph.
//!
//! This crate ingests identity data for a GitHub organization's direct
//! members and its enterprise-level owners from two independently
//! paginated GraphQL queries, reconciles them into a single canonical
//! user population, and writes that population into a property graph
//! using non-destructive, idempotent upserts.
//!
//! # Features
//!
//! - Cursor-paginated GraphQL fetch with transient-failure retry
//! - Tenant-identity validation across the two source queries
//! - Owner partitioning and enterprise-owner flag derivation
//! - Two-phase differential upsert: full property set for affiliated
//!   members, reduced set for unaffiliated owners, with role/2FA values
//!   never clobbered by the reduced write
//! - Create-once `firstseen` / refresh-always `lastupdated` stamps driven
//!   by one logical update tag per run
//!
//! # Example
//!
//! ```no_run
//! use github_graph_sync::{
//!     GithubClient, GithubConfig, GithubCredentials, MemoryGraph, SyncOrchestrator,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GithubConfig::builder("my_org").build()?;
//! let client = GithubClient::new(config, GithubCredentials::new("ghp_token"))?;
//! let graph = MemoryGraph::new();
//!
//! let report = SyncOrchestrator::new(&client, &graph).run().await?;
//! println!(
//!     "synced {} members and {} unaffiliated owners",
//!     report.affiliated, report.unaffiliated
//! );
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod loader;
mod memory;
mod model;
mod reconcile;
mod source;
mod store;
mod sync;

// Re-exports
pub use client::GithubClient;
pub use config::{GithubConfig, GithubConfigBuilder, GithubCredentials, DEFAULT_API_URL};
pub use error::{GithubSyncError, SyncResult};
pub use loader::UserLoader;
pub use memory::{MemoryGraph, StoredEdge, StoredOrg, StoredUser};
pub use model::{
    EnterpriseRole, MemberEdge, OrgDescriptor, OrgRole, OwnerEdge, UpdateTag, UserProfile,
};
pub use reconcile::{reconcile, validate_org, AffiliatedUser, ReconciledUsers, UnaffiliatedOwner};
pub use source::UserSource;
pub use store::{
    GraphStore, JobParameters, OrgRelation, OrgScoped, SyncMetadata, UserBatch, UserWrite,
    USERS_CLEANUP_JOB,
};
pub use sync::{SyncOrchestrator, SyncReport, SyncStage};
