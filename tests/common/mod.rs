//! Common test utilities for github-graph-sync integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};

use github_graph_sync::{
    GithubSyncError, MemberEdge, OrgDescriptor, OwnerEdge, SyncResult, UserSource,
};

pub const ORG_URL: &str = "https://example.com/my_org";
pub const ORG_LOGIN: &str = "my_org";

/// Test data factory for a member edge.
pub fn member_edge(login: &str, name: &str, role: &str, two_factor: Option<bool>) -> Value {
    json!({
        "hasTwoFactorEnabled": two_factor,
        "node": {
            "url": format!("https://example.com/{login}"),
            "login": login,
            "name": name,
            "isSiteAdmin": false,
            "email": format!("{login}@example.com"),
            "company": "Springfield Nuclear Power Plant"
        },
        "role": role
    })
}

/// Test data factory for an owner edge.
pub fn owner_edge(login: &str, name: &str, organization_role: &str) -> Value {
    json!({
        "node": {
            "url": format!("https://example.com/{login}"),
            "login": login,
            "name": name,
            "isSiteAdmin": false,
            "email": format!("{login}@example.com"),
            "company": "South Park Elementary"
        },
        "organizationRole": organization_role
    })
}

/// The canonical member fixture: Homer (member) and Marge (admin, 2FA on).
pub fn simpson_members() -> Vec<MemberEdge> {
    vec![
        MemberEdge::from_json(&member_edge("hjsimpson", "Homer Simpson", "MEMBER", None)).unwrap(),
        MemberEdge::from_json(&member_edge("mbsimpson", "Marge Simpson", "ADMIN", Some(true)))
            .unwrap(),
    ]
}

/// The canonical owner fixture: Kyle (unaffiliated), Bart (direct member),
/// Lisa (owner).
pub fn enterprise_owners() -> Vec<OwnerEdge> {
    vec![
        OwnerEdge::from_json(&owner_edge("kbroflovski", "Kyle Broflovski", "UNAFFILIATED"))
            .unwrap(),
        OwnerEdge::from_json(&owner_edge("bjsimpson", "Bartholomew Simpson", "DIRECT_MEMBER"))
            .unwrap(),
        OwnerEdge::from_json(&owner_edge("lmsimpson", "Lisa Simpson", "OWNER")).unwrap(),
    ]
}

pub fn org_descriptor() -> OrgDescriptor {
    OrgDescriptor {
        url: ORG_URL.to_string(),
        login: ORG_LOGIN.to_string(),
    }
}

/// Canned [`UserSource`] returning fully materialized edge lists.
pub struct StubSource {
    pub members: Vec<MemberEdge>,
    pub members_org: OrgDescriptor,
    pub owners: Vec<OwnerEdge>,
    pub owners_org: OrgDescriptor,
}

impl StubSource {
    /// Source returning the canonical fixtures for one organization.
    pub fn canonical() -> Self {
        Self {
            members: simpson_members(),
            members_org: org_descriptor(),
            owners: enterprise_owners(),
            owners_org: org_descriptor(),
        }
    }
}

#[async_trait]
impl UserSource for StubSource {
    async fn fetch_members(&self) -> SyncResult<(Vec<MemberEdge>, OrgDescriptor)> {
        Ok((self.members.clone(), self.members_org.clone()))
    }

    async fn fetch_owners(&self) -> SyncResult<(Vec<OwnerEdge>, OrgDescriptor)> {
        Ok((self.owners.clone(), self.owners_org.clone()))
    }
}

/// [`UserSource`] whose owner fetch fails, for abort-path tests.
pub struct FailingOwnerSource;

#[async_trait]
impl UserSource for FailingOwnerSource {
    async fn fetch_members(&self) -> SyncResult<(Vec<MemberEdge>, OrgDescriptor)> {
        Ok((simpson_members(), org_descriptor()))
    }

    async fn fetch_owners(&self) -> SyncResult<(Vec<OwnerEdge>, OrgDescriptor)> {
        Err(GithubSyncError::GraphQl {
            message: "upstream unavailable".to_string(),
        })
    }
}
