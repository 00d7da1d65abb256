//! Store-agnostic query builder.
//!
//! Resolvers describe *what* they need (filters, joins, existence
//! sub-queries, row windows); each [`DirectoryStore`](crate::DirectoryStore)
//! decides *how* to evaluate it. All joined rows are restricted to current,
//! non-deleted versions.

use serde::{Deserialize, Serialize};

use domainid_core::{ApplicationId, OrganizationId, Temporal, UserId};

use crate::models::{Application, Organization, Role, User, normalize};
use crate::store::{Capability, StoreCapabilities};

/// An application addressed by id or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationRef {
    Id(ApplicationId),
    Name(String),
}

impl From<ApplicationId> for ApplicationRef {
    fn from(value: ApplicationId) -> Self {
        ApplicationRef::Id(value)
    }
}

impl From<&str> for ApplicationRef {
    fn from(value: &str) -> Self {
        ApplicationRef::Name(value.to_string())
    }
}

impl From<String> for ApplicationRef {
    fn from(value: String) -> Self {
        ApplicationRef::Name(value)
    }
}

/// An organization addressed by id or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizationRef {
    Id(OrganizationId),
    Name(String),
}

impl From<OrganizationId> for OrganizationRef {
    fn from(value: OrganizationId) -> Self {
        OrganizationRef::Id(value)
    }
}

impl From<&str> for OrganizationRef {
    fn from(value: &str) -> Self {
        OrganizationRef::Name(value.to_string())
    }
}

impl From<String> for OrganizationRef {
    fn from(value: String) -> Self {
        OrganizationRef::Name(value)
    }
}

/// Server-side row window (`OFFSET .. LIMIT ..`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowWindow {
    pub offset: u64,
    pub limit: u64,
}

impl RowWindow {
    /// Apply the window to rows already in primary-key order.
    pub fn slice<T>(&self, rows: impl IntoIterator<Item = T>) -> Vec<T> {
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        rows.into_iter().skip(offset).take(limit).collect()
    }
}

/// Applications a role must belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationFilter {
    /// `role.application_id = id`; the application row itself is not consulted.
    Id(ApplicationId),
    /// `application.name IN (..)`, compared on normalized names. Duplicates
    /// are kept as given.
    Names(Vec<String>),
}

impl ApplicationFilter {
    pub fn named(name: &str) -> Self {
        ApplicationFilter::Names(vec![normalize(name)])
    }

    pub fn any_of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ApplicationFilter::Names(names.into_iter().map(|n| normalize(n.as_ref())).collect())
    }

    /// Whether `role` is scoped to a selected application. `application` is
    /// the row referenced by `role.application_id`, if one exists.
    pub fn matches_role(&self, role: &Role, application: Option<&Application>) -> bool {
        match self {
            ApplicationFilter::Id(id) => role.application_id == Some(*id),
            ApplicationFilter::Names(names) => application.is_some_and(|app| {
                app.temporal().is_live()
                    && role.application_id == Some(app.id)
                    && names.contains(&app.normalized_name())
            }),
        }
    }

    /// True when no application can ever match (empty IN-list).
    pub fn is_empty(&self) -> bool {
        matches!(self, ApplicationFilter::Names(names) if names.is_empty())
    }
}

impl From<ApplicationRef> for ApplicationFilter {
    fn from(value: ApplicationRef) -> Self {
        match value {
            ApplicationRef::Id(id) => ApplicationFilter::Id(id),
            ApplicationRef::Name(name) => ApplicationFilter::named(&name),
        }
    }
}

/// Organization a user must belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizationFilter {
    Id(OrganizationId),
    /// Normalized organization name, joined through the organization row.
    Name(String),
}

impl OrganizationFilter {
    pub fn named(name: &str) -> Self {
        OrganizationFilter::Name(normalize(name))
    }

    pub fn matches_user(&self, user: &User, organization: Option<&Organization>) -> bool {
        match self {
            OrganizationFilter::Id(id) => user.organization_id == *id,
            OrganizationFilter::Name(name) => organization.is_some_and(|org| {
                org.temporal().is_live()
                    && user.organization_id == org.id
                    && org.normalized_name() == *name
            }),
        }
    }
}

impl From<OrganizationRef> for OrganizationFilter {
    fn from(value: OrganizationRef) -> Self {
        match value {
            OrganizationRef::Id(id) => OrganizationFilter::Id(id),
            OrganizationRef::Name(name) => OrganizationFilter::named(&name),
        }
    }
}

/// Plain equality filter usable by any store's enumeration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub organization_id: Option<OrganizationId>,
}

impl UserFilter {
    pub fn in_organization(organization_id: OrganizationId) -> Self {
        Self {
            organization_id: Some(organization_id),
        }
    }

    pub fn matches(&self, user: &User) -> bool {
        self.organization_id
            .is_none_or(|organization_id| user.organization_id == organization_id)
    }
}

/// Roles linked to a user through live `UserRole` rows
/// (`UserRole ⋈ Role ⋈ Application`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleProjection {
    pub user_id: UserId,
    pub applications: ApplicationFilter,
}

impl RoleProjection {
    pub fn for_user(user_id: UserId, applications: ApplicationFilter) -> Self {
        Self {
            user_id,
            applications,
        }
    }
}

/// Predicate selecting users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserPredicate {
    /// `User ⋈ Organization`.
    InOrganization(OrganizationFilter),
    /// `EXISTS (UserRole ⋈ Role [⋈ Application])`: each user appears once no
    /// matter how many qualifying roles they hold.
    HoldsRoleIn(ApplicationFilter),
}

/// Users selected by a predicate, optionally windowed server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProjection {
    pub predicate: UserPredicate,
    pub window: Option<RowWindow>,
}

impl UserProjection {
    pub fn matching(predicate: UserPredicate) -> Self {
        Self {
            predicate,
            window: None,
        }
    }

    pub fn windowed(mut self, window: Option<RowWindow>) -> Self {
        self.window = window;
        self
    }

    /// Capabilities a store needs to answer this projection.
    pub fn required_capabilities(&self) -> StoreCapabilities {
        let required = StoreCapabilities::NONE.with(Capability::RelationalProjection);
        if self.window.is_some() {
            required.with(Capability::OffsetPaging)
        } else {
            required
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use domainid_core::SysStatus;

    use super::*;

    #[test]
    fn name_filter_requires_a_live_matching_application() {
        let now = Utc::now();
        let app = Application::new("Color App", "seed", now);
        let role = Role::new("admin", Some(app.id), "seed", now);

        let filter = ApplicationFilter::named("color app");
        assert!(filter.matches_role(&role, Some(&app)));
        assert!(!filter.matches_role(&role, None));

        let mut deleted = app.clone();
        deleted.temporal.sys_status = SysStatus::Deleted;
        assert!(!filter.matches_role(&role, Some(&deleted)));
    }

    #[test]
    fn id_filter_ignores_the_application_row() {
        let app_id = ApplicationId::new();
        let role = Role::new("reader", Some(app_id), "seed", Utc::now());
        assert!(ApplicationFilter::Id(app_id).matches_role(&role, None));
        assert!(!ApplicationFilter::Id(ApplicationId::new()).matches_role(&role, None));
    }

    #[test]
    fn global_roles_never_match_an_application() {
        let now = Utc::now();
        let app = Application::new("Hr", "seed", now);
        let role = Role::new("auditor", None, "seed", now);
        assert!(!ApplicationFilter::named("Hr").matches_role(&role, Some(&app)));
    }

    #[test]
    fn windowed_projection_needs_offset_paging() {
        let projection =
            UserProjection::matching(UserPredicate::HoldsRoleIn(ApplicationFilter::named("a")));
        assert!(!projection.required_capabilities().supports(Capability::OffsetPaging));

        let paged = projection.windowed(Some(RowWindow { offset: 0, limit: 10 }));
        let required = paged.required_capabilities();
        assert!(required.supports(Capability::OffsetPaging));
        assert!(required.supports(Capability::RelationalProjection));
    }

    #[test]
    fn window_slices_in_order() {
        let window = RowWindow { offset: 2, limit: 2 };
        assert_eq!(window.slice(1..=5), vec![3, 4]);
        assert!(RowWindow { offset: 9, limit: 2 }.slice(1..=5).is_empty());
    }
}
