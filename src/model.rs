//! Data model for GitHub organization users and their relationships.
//!
//! Typed records for the two edge shapes returned by the GraphQL API,
//! parsed and validated at the fetch boundary rather than carried around
//! as loosely shaped JSON.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{GithubSyncError, SyncResult};

/// A user's role within the target organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrgRole {
    /// Regular organization member.
    Member,
    /// Organization administrator.
    Admin,
}

impl OrgRole {
    /// Get the wire representation used by the GitHub API and the graph.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgRole::Member => "MEMBER",
            OrgRole::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for OrgRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrgRole {
    type Err = GithubSyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MEMBER" => Ok(OrgRole::Member),
            "ADMIN" => Ok(OrgRole::Admin),
            other => Err(GithubSyncError::InvalidValue {
                field: "role",
                value: other.to_string(),
            }),
        }
    }
}

/// A user's role at the enterprise level, relative to the target organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnterpriseRole {
    /// Enterprise owner who is also an organization owner.
    Owner,
    /// Enterprise owner who is a direct member of the organization.
    DirectMember,
    /// Enterprise owner with no direct membership in the organization.
    Unaffiliated,
}

impl EnterpriseRole {
    /// Get the wire representation used by the GitHub API.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EnterpriseRole::Owner => "OWNER",
            EnterpriseRole::DirectMember => "DIRECT_MEMBER",
            EnterpriseRole::Unaffiliated => "UNAFFILIATED",
        }
    }

    /// Whether this role implies direct membership in the target organization.
    #[must_use]
    pub fn is_affiliated(&self) -> bool {
        !matches!(self, EnterpriseRole::Unaffiliated)
    }
}

impl fmt::Display for EnterpriseRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EnterpriseRole {
    type Err = GithubSyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OWNER" => Ok(EnterpriseRole::Owner),
            "DIRECT_MEMBER" => Ok(EnterpriseRole::DirectMember),
            "UNAFFILIATED" => Ok(EnterpriseRole::Unaffiliated),
            other => Err(GithubSyncError::InvalidValue {
                field: "organizationRole",
                value: other.to_string(),
            }),
        }
    }
}

/// Identity of the organization a fetch call was scoped to.
///
/// The `url` is the immutable external id; both fields must match across
/// the two queries feeding one sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgDescriptor {
    /// Organization node URL (external id).
    pub url: String,
    /// Organization login name.
    pub login: String,
}

impl OrgDescriptor {
    /// Parses the descriptor from the `organization` object of a response.
    pub fn from_json(value: &serde_json::Value) -> SyncResult<Self> {
        Ok(Self {
            url: required_str(value, "url", "organization")?,
            login: required_str(value, "login", "organization")?,
        })
    }
}

/// Core identity record for a GitHub user, shared by both edge shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User node URL (immutable external id).
    pub url: String,
    /// Login handle.
    pub login: String,
    /// Display name.
    pub name: Option<String>,
    /// Site administrator flag; absent means unknown.
    pub is_site_admin: Option<bool>,
    /// Primary email address.
    pub email: Option<String>,
    /// Free-form company field.
    pub company: Option<String>,
}

impl UserProfile {
    /// Parses a user node from an edge's `node` object.
    ///
    /// `url` and `login` are required; everything else is tolerated as
    /// absent or null.
    pub fn from_json(value: &serde_json::Value) -> SyncResult<Self> {
        Ok(Self {
            url: required_str(value, "url", "user node")?,
            login: required_str(value, "login", "user node")?,
            name: optional_str(value, "name"),
            is_site_admin: value.get("isSiteAdmin").and_then(|v| v.as_bool()),
            email: optional_str(value, "email"),
            company: optional_str(value, "company"),
        })
    }
}

/// One row of the `membersWithRole` query result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberEdge {
    /// Two-factor flag; only reported for direct members, may be null.
    pub has_two_factor_enabled: Option<bool>,
    /// Role in the target organization.
    pub role: OrgRole,
    /// The user this edge wraps.
    pub node: UserProfile,
}

impl MemberEdge {
    /// Parses a member edge from the GraphQL response.
    pub fn from_json(value: &serde_json::Value) -> SyncResult<Self> {
        let node = value.get("node").ok_or(GithubSyncError::MissingField {
            field: "node",
            context: "member edge",
        })?;
        let role = value
            .get("role")
            .and_then(|v| v.as_str())
            .ok_or(GithubSyncError::MissingField {
                field: "role",
                context: "member edge",
            })?
            .parse::<OrgRole>()?;

        Ok(Self {
            has_two_factor_enabled: value.get("hasTwoFactorEnabled").and_then(|v| v.as_bool()),
            role,
            node: UserProfile::from_json(node)?,
        })
    }
}

/// One row of the `enterpriseOwners` query result.
///
/// Note the differences from [`MemberEdge`]: no two-factor flag (the API
/// does not return it for owners) and an `organizationRole` instead of a
/// `role`, since membership in the queried organization is not assumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerEdge {
    /// Enterprise-level role relative to the target organization.
    pub organization_role: EnterpriseRole,
    /// The user this edge wraps.
    pub node: UserProfile,
}

impl OwnerEdge {
    /// Parses an owner edge from the GraphQL response.
    pub fn from_json(value: &serde_json::Value) -> SyncResult<Self> {
        let node = value.get("node").ok_or(GithubSyncError::MissingField {
            field: "node",
            context: "owner edge",
        })?;
        let organization_role = value
            .get("organizationRole")
            .and_then(|v| v.as_str())
            .ok_or(GithubSyncError::MissingField {
                field: "organizationRole",
                context: "owner edge",
            })?
            .parse::<EnterpriseRole>()?;

        Ok(Self {
            organization_role,
            node: UserProfile::from_json(node)?,
        })
    }
}

/// Logical timestamp applied uniformly to every node and edge touched in
/// one sync run; used by downstream staleness detection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UpdateTag(pub i64);

impl UpdateTag {
    /// A tag for the current instant (epoch seconds).
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    /// The raw tag value.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UpdateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn required_str(
    value: &serde_json::Value,
    field: &'static str,
    context: &'static str,
) -> SyncResult<String> {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or(GithubSyncError::MissingField { field, context })
}

fn optional_str(value: &serde_json::Value, field: &str) -> Option<String> {
    value.get(field).and_then(|v| v.as_str()).map(String::from)
}
