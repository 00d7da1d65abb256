//! Capability-based directory store contract.
//!
//! Every store answers point lookups and filtered enumeration. Relational
//! projection (joins and existence sub-queries) and server-side offset paging
//! are optional capabilities that a store advertises through
//! [`DirectoryStore::capabilities`]; callers probe before use and fail fast
//! with [`DomainError::UnsupportedStoreCapability`] instead of degrading.
//!
//! Reads never take write intent: implementations return owned snapshots
//! and hold no locks across calls.

use std::sync::Arc;

use async_trait::async_trait;

use domainid_core::{
    ApplicationId, DomainError, DomainResult, OrganizationId, RoleId, UserId,
};

use crate::models::{Application, Organization, Role, User, UserClaim};
use crate::query::{RoleProjection, RowWindow, UserFilter, UserProjection};

/// An optional store feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Joins and existence sub-queries across entity sets.
    RelationalProjection,
    /// Row-offset pagination evaluated by the store itself.
    OffsetPaging,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::RelationalProjection => "relational_projection",
            Capability::OffsetPaging => "offset_paging",
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of capabilities a store advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreCapabilities {
    relational_projection: bool,
    offset_paging: bool,
}

impl StoreCapabilities {
    pub const NONE: Self = Self {
        relational_projection: false,
        offset_paging: false,
    };

    pub const ALL: Self = Self {
        relational_projection: true,
        offset_paging: true,
    };

    pub fn with(mut self, capability: Capability) -> Self {
        match capability {
            Capability::RelationalProjection => self.relational_projection = true,
            Capability::OffsetPaging => self.offset_paging = true,
        }
        self
    }

    pub fn without(mut self, capability: Capability) -> Self {
        match capability {
            Capability::RelationalProjection => self.relational_projection = false,
            Capability::OffsetPaging => self.offset_paging = false,
        }
        self
    }

    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::RelationalProjection => self.relational_projection,
            Capability::OffsetPaging => self.offset_paging,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        [Capability::RelationalProjection, Capability::OffsetPaging]
            .into_iter()
            .filter(|c| self.supports(*c))
    }

    /// Fail with `UnsupportedStoreCapability` unless every capability in
    /// `required` is supported.
    pub fn require(&self, operation: &'static str, required: StoreCapabilities) -> DomainResult<()> {
        match required.iter().find(|c| !self.supports(*c)) {
            None => Ok(()),
            Some(missing) => {
                tracing::warn!(operation, capability = %missing, "store capability missing");
                Err(DomainError::unsupported(operation, missing.as_str()))
            }
        }
    }
}

/// Persisted directory entity sets.
///
/// Lookups and enumerations see only live versions (open validity window,
/// not deleted). Enumerations are returned in primary-key order.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    fn capabilities(&self) -> StoreCapabilities;

    async fn find_user(&self, id: UserId) -> DomainResult<Option<User>>;

    async fn find_user_by_name(&self, normalized_user_name: &str) -> DomainResult<Option<User>>;

    async fn find_role(&self, id: RoleId) -> DomainResult<Option<Role>>;

    async fn find_organization(&self, id: OrganizationId) -> DomainResult<Option<Organization>>;

    async fn find_organization_by_name(
        &self,
        normalized_name: &str,
    ) -> DomainResult<Option<Organization>>;

    async fn find_application(&self, id: ApplicationId) -> DomainResult<Option<Application>>;

    async fn find_application_by_name(
        &self,
        normalized_name: &str,
    ) -> DomainResult<Option<Application>>;

    /// Live claims attached to a user.
    async fn user_claims(&self, user_id: UserId) -> DomainResult<Vec<UserClaim>>;

    /// Filtered enumeration with skip/take (`None` returns every match).
    async fn scan_users(
        &self,
        filter: &UserFilter,
        window: Option<RowWindow>,
    ) -> DomainResult<Vec<User>>;

    /// Requires [`Capability::RelationalProjection`].
    async fn project_roles(&self, _query: &RoleProjection) -> DomainResult<Vec<Role>> {
        Err(DomainError::unsupported(
            "project_roles",
            Capability::RelationalProjection.as_str(),
        ))
    }

    /// Requires [`Capability::RelationalProjection`], plus
    /// [`Capability::OffsetPaging`] when the projection is windowed.
    ///
    /// Rows must already be distinct by user id before the window is applied;
    /// a user qualified by several rows still counts once toward a page.
    async fn project_users(&self, _query: &UserProjection) -> DomainResult<Vec<User>> {
        Err(DomainError::unsupported(
            "project_users",
            Capability::RelationalProjection.as_str(),
        ))
    }
}

#[async_trait]
impl<S> DirectoryStore for Arc<S>
where
    S: DirectoryStore + ?Sized,
{
    fn capabilities(&self) -> StoreCapabilities {
        (**self).capabilities()
    }

    async fn find_user(&self, id: UserId) -> DomainResult<Option<User>> {
        (**self).find_user(id).await
    }

    async fn find_user_by_name(&self, normalized_user_name: &str) -> DomainResult<Option<User>> {
        (**self).find_user_by_name(normalized_user_name).await
    }

    async fn find_role(&self, id: RoleId) -> DomainResult<Option<Role>> {
        (**self).find_role(id).await
    }

    async fn find_organization(&self, id: OrganizationId) -> DomainResult<Option<Organization>> {
        (**self).find_organization(id).await
    }

    async fn find_organization_by_name(
        &self,
        normalized_name: &str,
    ) -> DomainResult<Option<Organization>> {
        (**self).find_organization_by_name(normalized_name).await
    }

    async fn find_application(&self, id: ApplicationId) -> DomainResult<Option<Application>> {
        (**self).find_application(id).await
    }

    async fn find_application_by_name(
        &self,
        normalized_name: &str,
    ) -> DomainResult<Option<Application>> {
        (**self).find_application_by_name(normalized_name).await
    }

    async fn user_claims(&self, user_id: UserId) -> DomainResult<Vec<UserClaim>> {
        (**self).user_claims(user_id).await
    }

    async fn scan_users(
        &self,
        filter: &UserFilter,
        window: Option<RowWindow>,
    ) -> DomainResult<Vec<User>> {
        (**self).scan_users(filter, window).await
    }

    async fn project_roles(&self, query: &RoleProjection) -> DomainResult<Vec<Role>> {
        (**self).project_roles(query).await
    }

    async fn project_users(&self, query: &UserProjection) -> DomainResult<Vec<User>> {
        (**self).project_users(query).await
    }
}
