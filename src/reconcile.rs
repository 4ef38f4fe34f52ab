//! Reconciliation of member and owner result sets into one user population.
//!
//! Pure, synchronous computation over fully materialized inputs: owner
//! records are partitioned by affiliation and membership, members are
//! decorated with the derived enterprise-owner flag, and the outputs are
//! disjoint by user URL.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GithubSyncError, SyncResult};
use crate::model::{MemberEdge, OrgDescriptor, OrgRole, OwnerEdge, UserProfile};

/// A direct member decorated with the derived enterprise-owner flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffiliatedUser {
    /// Core identity record.
    pub profile: UserProfile,
    /// Role in the target organization.
    pub role: OrgRole,
    /// Two-factor flag as reported for direct members.
    pub has_two_factor_enabled: Option<bool>,
    /// True iff this member also appears in the enterprise owner list.
    pub is_enterprise_owner: bool,
}

/// An enterprise owner with no direct membership in the target organization.
///
/// Carries no role or two-factor attributes; the API does not return them
/// for these users, and the write path must leave any previously stored
/// values untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnaffiliatedOwner {
    /// Core identity record.
    pub profile: UserProfile,
}

/// Output of [`reconcile`]: two disjoint user sets for one sync run.
#[derive(Debug, Clone, Default)]
pub struct ReconciledUsers {
    /// Decorated direct members; same cardinality as the member input.
    pub affiliated: Vec<AffiliatedUser>,
    /// Enterprise owners not directly in the organization.
    pub unaffiliated: Vec<UnaffiliatedOwner>,
}

/// Validates that the two fetches describe the same organization.
///
/// The member and owner queries are logically independent calls against
/// what should be the same tenant; a caller error between them would
/// silently merge two organizations' user graphs.
///
/// # Errors
///
/// Returns [`GithubSyncError::OrgMismatch`] naming the differing field and
/// both values if either `url` or `login` disagree.
pub fn validate_org(
    members_org: &OrgDescriptor,
    owners_org: &OrgDescriptor,
) -> SyncResult<OrgDescriptor> {
    if members_org.url != owners_org.url {
        return Err(GithubSyncError::OrgMismatch {
            field: "url",
            members: members_org.url.clone(),
            owners: owners_org.url.clone(),
        });
    }
    if members_org.login != owners_org.login {
        return Err(GithubSyncError::OrgMismatch {
            field: "login",
            members: members_org.login.clone(),
            owners: owners_org.login.clone(),
        });
    }
    Ok(members_org.clone())
}

/// Reconciles member and owner edges into disjoint affiliated and
/// unaffiliated user sets.
///
/// Membership wins: an owner who also appears in the member list is never
/// emitted as a separate record, whatever their organization role; their
/// only effect is flipping the matching member's enterprise-owner flag.
/// Only owners with role `UNAFFILIATED` and no member record land in the
/// unaffiliated output. Duplicate URLs in the source pass through
/// unchanged and collapse at the store by merge-on-id.
///
/// Runs in O(members + owners); the result does not depend on input order.
#[must_use]
pub fn reconcile(members: Vec<MemberEdge>, owners: Vec<OwnerEdge>) -> ReconciledUsers {
    let member_urls: HashSet<String> =
        members.iter().map(|m| m.node.url.clone()).collect();

    let mut owner_urls: HashSet<String> = HashSet::new();
    let mut unaffiliated: Vec<UnaffiliatedOwner> = Vec::new();
    for owner in owners {
        if !owner.organization_role.is_affiliated() && !member_urls.contains(&owner.node.url) {
            owner_urls.insert(owner.node.url.clone());
            unaffiliated.push(UnaffiliatedOwner {
                profile: owner.node,
            });
        } else {
            owner_urls.insert(owner.node.url);
        }
    }

    let affiliated: Vec<AffiliatedUser> = members
        .into_iter()
        .map(|m| AffiliatedUser {
            is_enterprise_owner: owner_urls.contains(&m.node.url),
            profile: m.node,
            role: m.role,
            has_two_factor_enabled: m.has_two_factor_enabled,
        })
        .collect();

    debug!(
        affiliated = affiliated.len(),
        unaffiliated = unaffiliated.len(),
        enterprise_owners = owner_urls.len(),
        "Reconciled user population"
    );

    ReconciledUsers {
        affiliated,
        unaffiliated,
    }
}
