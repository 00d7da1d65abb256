use tokio_util::sync::CancellationToken;

use domainid_core::DomainResult;

use crate::models::{Role, User};
use crate::query::{ApplicationFilter, RoleProjection};
use crate::store::{Capability, DirectoryStore, StoreCapabilities};

use super::cancellable;

/// Resolves the roles a user holds within named applications.
pub struct RoleResolver<S> {
    store: S,
}

impl<S> RoleResolver<S>
where
    S: DirectoryStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Roles scoped to `application_name` and granted to `user` by a live
    /// `UserRole`. An unknown application yields an empty list. Order is
    /// store-defined.
    #[tracing::instrument(skip(self, user, cancel), fields(user_id = %user.id))]
    pub async fn get_roles(
        &self,
        user: &User,
        application_name: &str,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<Role>> {
        self.resolve("get_roles", user, ApplicationFilter::named(application_name), cancel)
            .await
    }

    /// Like [`get_roles`](Self::get_roles) across several applications
    /// (`IN`-list). Duplicate names are passed through as given.
    #[tracing::instrument(skip(self, user, application_names, cancel), fields(user_id = %user.id))]
    pub async fn get_roles_in<N>(
        &self,
        user: &User,
        application_names: &[N],
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<Role>>
    where
        N: AsRef<str> + Sync,
    {
        self.resolve("get_roles_in", user, ApplicationFilter::any_of(application_names), cancel)
            .await
    }

    async fn resolve(
        &self,
        operation: &'static str,
        user: &User,
        applications: ApplicationFilter,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<Role>> {
        self.store.capabilities().require(
            operation,
            StoreCapabilities::NONE.with(Capability::RelationalProjection),
        )?;

        if applications.is_empty() {
            return Ok(Vec::new());
        }

        let projection = RoleProjection::for_user(user.id, applications);
        let roles = cancellable(cancel, self.store.project_roles(&projection)).await?;
        tracing::debug!(operation, count = roles.len(), "resolved roles");
        Ok(roles)
    }
}
