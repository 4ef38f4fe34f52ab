//! Differential upsert coordination: two write phases per sync run.
//!
//! Phase 1 loads affiliated members with the full property set and a
//! `MEMBER_OF` edge; Phase 2 loads unaffiliated enterprise owners with
//! the reduced property set and an `UNAFFILIATED` edge. Both phases share
//! one update tag and each is one atomic batch against the store.

use tracing::{info, instrument};

use crate::error::SyncResult;
use crate::model::{OrgDescriptor, UpdateTag};
use crate::reconcile::{AffiliatedUser, UnaffiliatedOwner};
use crate::store::{GraphStore, OrgRelation, OrgScoped, UserBatch, UserWrite};

/// Coordinates the two upsert phases against a graph store.
pub struct UserLoader<'a> {
    store: &'a dyn GraphStore,
}

impl<'a> UserLoader<'a> {
    /// Creates a loader writing to the given store.
    #[must_use]
    pub fn new(store: &'a dyn GraphStore) -> Self {
        Self { store }
    }

    /// Phase 1: upsert affiliated members with the full property set.
    #[instrument(skip(self, users), fields(org = %org.login, count = users.len()))]
    pub async fn load_affiliated(
        &self,
        users: &[AffiliatedUser],
        org: &OrgDescriptor,
        update_tag: UpdateTag,
    ) -> SyncResult<()> {
        info!("Loading {} affiliated GitHub users", users.len());
        let batch = UserBatch {
            org: org.clone(),
            relation: OrgRelation::MemberOf,
            users: users.iter().map(affiliated_write).collect(),
        };
        self.store.load_users(batch, update_tag).await
    }

    /// Phase 2: upsert unaffiliated owners with the reduced property set.
    ///
    /// Role and two-factor attributes are omitted from these writes so
    /// that values stored by an affiliated write (possibly for a different
    /// organization) survive.
    #[instrument(skip(self, owners), fields(org = %org.login, count = owners.len()))]
    pub async fn load_unaffiliated(
        &self,
        owners: &[UnaffiliatedOwner],
        org: &OrgDescriptor,
        update_tag: UpdateTag,
    ) -> SyncResult<()> {
        info!("Loading {} unaffiliated GitHub users", owners.len());
        let batch = UserBatch {
            org: org.clone(),
            relation: OrgRelation::Unaffiliated,
            users: owners.iter().map(unaffiliated_write).collect(),
        };
        self.store.load_users(batch, update_tag).await
    }
}

fn affiliated_write(user: &AffiliatedUser) -> UserWrite {
    UserWrite {
        url: user.profile.url.clone(),
        username: user.profile.login.clone(),
        fullname: user.profile.name.clone(),
        is_site_admin: user.profile.is_site_admin,
        is_enterprise_owner: user.is_enterprise_owner,
        email: user.profile.email.clone(),
        company: user.profile.company.clone(),
        org_scoped: Some(OrgScoped {
            role: user.role,
            has_two_factor_enabled: user.has_two_factor_enabled,
        }),
    }
}

fn unaffiliated_write(owner: &UnaffiliatedOwner) -> UserWrite {
    UserWrite {
        url: owner.profile.url.clone(),
        username: owner.profile.login.clone(),
        fullname: owner.profile.name.clone(),
        is_site_admin: owner.profile.is_site_admin,
        // Owner records only exist for enterprise owners.
        is_enterprise_owner: true,
        email: owner.profile.email.clone(),
        company: owner.profile.company.clone(),
        org_scoped: None,
    }
}
