use std::collections::HashSet;

use tokio_util::sync::CancellationToken;

use domainid_core::DomainResult;

use crate::models::User;
use crate::pagination::{Page, Paging};
use crate::query::{
    ApplicationFilter, ApplicationRef, OrganizationFilter, OrganizationRef, UserFilter,
    UserPredicate, UserProjection,
};
use crate::store::DirectoryStore;

use super::cancellable;

/// Resolves the users belonging to an organization or an application.
pub struct MembershipResolver<S> {
    store: S,
}

impl<S> MembershipResolver<S>
where
    S: DirectoryStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Users owned by an organization.
    ///
    /// By id this is a plain filtered enumeration any store can answer. By
    /// name it needs relational projection, and server-side offset paging
    /// when `paging` asks for a page.
    #[tracing::instrument(skip(self, organization, cancel), fields(organization = ?organization))]
    pub async fn users_for_organization(
        &self,
        organization: impl Into<OrganizationRef> + core::fmt::Debug,
        paging: Paging,
        cancel: &CancellationToken,
    ) -> DomainResult<Page<User>> {
        let organization = organization.into();
        let users = match organization {
            OrganizationRef::Id(id) => {
                let filter = UserFilter::in_organization(id);
                cancellable(cancel, self.store.scan_users(&filter, paging.window())).await?
            }
            OrganizationRef::Name(name) => {
                let predicate = UserPredicate::InOrganization(OrganizationFilter::named(&name));
                self.project("users_for_organization", predicate, paging, cancel)
                    .await?
            }
        };

        tracing::debug!(count = users.len(), "resolved organization members");
        Ok(page(users, paging))
    }

    /// Distinct users holding at least one role scoped to an application.
    ///
    /// Always an existence join (`UserRole ⋈ Role`), so relational projection
    /// is required for both the id and the name form; paging additionally
    /// needs offset paging.
    #[tracing::instrument(skip(self, application, cancel), fields(application = ?application))]
    pub async fn users_for_application(
        &self,
        application: impl Into<ApplicationRef> + core::fmt::Debug,
        paging: Paging,
        cancel: &CancellationToken,
    ) -> DomainResult<Page<User>> {
        let filter = ApplicationFilter::from(application.into());
        let users = self
            .project("users_for_application", UserPredicate::HoldsRoleIn(filter), paging, cancel)
            .await?;

        tracing::debug!(count = users.len(), "resolved application members");
        Ok(page(users, paging))
    }

    async fn project(
        &self,
        operation: &'static str,
        predicate: UserPredicate,
        paging: Paging,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<User>> {
        let projection = UserProjection::matching(predicate).windowed(paging.window());
        self.store
            .capabilities()
            .require(operation, projection.required_capabilities())?;

        let users = cancellable(cancel, self.store.project_users(&projection)).await?;
        Ok(distinct(operation, users))
    }
}

/// Existence semantics: a user appears once however many rows qualified it.
///
/// Stores return distinct rows already. Duplicates here mean the window was
/// applied to a non-distinct result, so the page may be short.
fn distinct(operation: &'static str, users: Vec<User>) -> Vec<User> {
    let total = users.len();
    let mut seen = HashSet::with_capacity(total);
    let users: Vec<User> = users.into_iter().filter(|u| seen.insert(u.id)).collect();
    if users.len() != total {
        tracing::warn!(
            operation,
            duplicates = total - users.len(),
            "store returned duplicate users for an existence query; page may be short"
        );
    }
    users
}

fn page(items: Vec<User>, paging: Paging) -> Page<User> {
    Page {
        items,
        request: match paging {
            Paging::All => None,
            Paging::Page(request) => Some(request),
        },
    }
}
