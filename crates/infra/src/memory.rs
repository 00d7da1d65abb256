//! In-memory directory store for tests and development.
//!
//! Every entity set is a [`TemporalTable`]; reads only ever see live rows.
//! Relational projections are evaluated in process with the same existence
//! semantics as the SQL store, and the advertised capabilities are
//! configurable so callers can be exercised against weaker backends.
//!
//! Organizations, applications and roles are created through the checked
//! `create_*` paths, which keep live names unique.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use domainid_core::{
    ApplicationId, DomainError, DomainResult, ExpectedStamp, OrganizationId, RoleId, SysStatus,
    TemporalRecord, UserId,
};
use domainid_directory::{
    Application, ApplicationFilter, Capability, DirectoryStore, Organization, Role,
    RoleClaim, RoleProjection, RowWindow, StoreCapabilities, User, UserClaim, UserFilter,
    UserLogin, UserPredicate, UserProjection, UserRole, UserToken, normalize,
};

use crate::temporal_table::TemporalTable;

#[derive(Debug)]
pub struct InMemoryDirectoryStore {
    capabilities: StoreCapabilities,
    users: TemporalTable<User>,
    roles: TemporalTable<Role>,
    organizations: TemporalTable<Organization>,
    applications: TemporalTable<Application>,
    user_roles: TemporalTable<UserRole>,
    user_claims: TemporalTable<UserClaim>,
    role_claims: TemporalTable<RoleClaim>,
    user_logins: TemporalTable<UserLogin>,
    user_tokens: TemporalTable<UserToken>,
    next_claim_id: AtomicI64,
    /// Serializes name checks with the inserts they guard.
    catalog: Mutex<()>,
}

impl Default for InMemoryDirectoryStore {
    fn default() -> Self {
        Self {
            capabilities: StoreCapabilities::ALL,
            users: TemporalTable::new(),
            roles: TemporalTable::new(),
            organizations: TemporalTable::new(),
            applications: TemporalTable::new(),
            user_roles: TemporalTable::new(),
            user_claims: TemporalTable::new(),
            role_claims: TemporalTable::new(),
            user_logins: TemporalTable::new(),
            user_tokens: TemporalTable::new(),
            next_claim_id: AtomicI64::new(1),
            catalog: Mutex::new(()),
        }
    }
}

impl InMemoryDirectoryStore {
    /// A store advertising every capability.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(mut self, capabilities: StoreCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn users(&self) -> &TemporalTable<User> {
        &self.users
    }

    pub fn roles(&self) -> &TemporalTable<Role> {
        &self.roles
    }

    pub fn organizations(&self) -> &TemporalTable<Organization> {
        &self.organizations
    }

    pub fn applications(&self) -> &TemporalTable<Application> {
        &self.applications
    }

    pub fn user_roles(&self) -> &TemporalTable<UserRole> {
        &self.user_roles
    }

    pub fn user_claim_table(&self) -> &TemporalTable<UserClaim> {
        &self.user_claims
    }

    pub fn role_claims(&self) -> &TemporalTable<RoleClaim> {
        &self.role_claims
    }

    pub fn user_logins(&self) -> &TemporalTable<UserLogin> {
        &self.user_logins
    }

    pub fn user_tokens(&self) -> &TemporalTable<UserToken> {
        &self.user_tokens
    }

    fn catalog(&self) -> DomainResult<MutexGuard<'_, ()>> {
        self.catalog
            .lock()
            .map_err(|_| DomainError::store("catalog lock poisoned"))
    }

    /// Store a new organization. Fails with `InvariantViolation` when another
    /// live organization has the same normalized name.
    pub fn create_organization(
        &self,
        organization: Organization,
        actor: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<Organization> {
        let _catalog = self.catalog()?;
        let wanted = organization.normalized_name();
        let taken = self
            .organizations
            .live()?
            .iter()
            .any(|org| org.id != organization.id && org.normalized_name() == wanted);
        if taken {
            tracing::warn!(name = %organization.name, "duplicate organization name");
            return Err(DomainError::invariant(format!(
                "organization name '{}' is already in use",
                organization.name
            )));
        }
        self.organizations.insert(organization, actor, at)
    }

    /// Store a new application under a live-unique normalized name.
    pub fn create_application(
        &self,
        application: Application,
        actor: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<Application> {
        let _catalog = self.catalog()?;
        let wanted = application.normalized_name();
        let taken = self
            .applications
            .live()?
            .iter()
            .any(|app| app.id != application.id && app.normalized_name() == wanted);
        if taken {
            tracing::warn!(name = %application.name, "duplicate application name");
            return Err(DomainError::invariant(format!(
                "application name '{}' is already in use",
                application.name
            )));
        }
        self.applications.insert(application, actor, at)
    }

    /// Store a new role. Its normalized name must be unused among live roles
    /// of every application, which also keeps `(application, name)` unique.
    pub fn create_role(&self, mut role: Role, actor: &str, at: DateTime<Utc>) -> DomainResult<Role> {
        let _catalog = self.catalog()?;
        role.normalized_name = normalize(&role.name);
        let existing = self
            .roles
            .live()?
            .into_iter()
            .find(|r| r.id != role.id && r.normalized_name == role.normalized_name);
        if let Some(existing) = existing {
            let scope = if existing.application_id == role.application_id {
                "in its application"
            } else {
                "by another application"
            };
            tracing::warn!(name = %role.name, scope, "duplicate role name");
            return Err(DomainError::invariant(format!(
                "role name '{}' is already in use {scope}",
                role.name
            )));
        }
        self.roles.insert(role, actor, at)
    }

    /// Grant `role_id` to `user_id` as an open `UserRole` row.
    pub fn grant_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        actor: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<UserRole> {
        self.user_roles
            .insert(UserRole::new(user_id, role_id, actor, at), actor, at)
    }

    /// Revoke a grant by moving it to `Deleted`; its history is kept.
    pub fn revoke_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        actor: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<UserRole> {
        self.user_roles.transition(
            &(user_id, role_id),
            SysStatus::Deleted,
            &ExpectedStamp::Any,
            actor,
            at,
        )
    }

    /// Attach a claim to a user under the next claim id.
    pub fn add_user_claim(
        &self,
        user_id: UserId,
        claim_type: impl Into<String>,
        claim_value: impl Into<String>,
        actor: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<UserClaim> {
        let claim = UserClaim {
            id: self.next_claim_id.fetch_add(1, Ordering::Relaxed),
            user_id,
            claim_type: claim_type.into(),
            claim_value: claim_value.into(),
            temporal: TemporalRecord::opened(actor, at),
        };
        self.user_claims.insert(claim, actor, at)
    }

    fn live_application(&self, id: Option<ApplicationId>) -> DomainResult<Option<Application>> {
        match id {
            Some(id) => self.applications.find_live(&id),
            None => Ok(None),
        }
    }

    /// Live roles passing `filter`, keyed by id.
    fn roles_matching(&self, filter: &ApplicationFilter) -> DomainResult<HashSet<RoleId>> {
        let mut matching = HashSet::new();
        for role in self.roles.live()? {
            let application = self.live_application(role.application_id)?;
            if filter.matches_role(&role, application.as_ref()) {
                matching.insert(role.id);
            }
        }
        Ok(matching)
    }

    fn sorted_users(&self) -> DomainResult<Vec<User>> {
        let mut users = self.users.live()?;
        users.sort_by_key(|u| u.id);
        Ok(users)
    }
}

fn windowed<T>(rows: Vec<T>, window: Option<RowWindow>) -> Vec<T> {
    match window {
        Some(window) => window.slice(rows),
        None => rows,
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectoryStore {
    fn capabilities(&self) -> StoreCapabilities {
        self.capabilities
    }

    async fn find_user(&self, id: UserId) -> DomainResult<Option<User>> {
        self.users.find_live(&id)
    }

    async fn find_user_by_name(&self, normalized_user_name: &str) -> DomainResult<Option<User>> {
        let wanted = normalize(normalized_user_name);
        Ok(self.sorted_users()?.into_iter().find(|u| {
            u.normalized_user_name == wanted || u.normalized_email == wanted
        }))
    }

    async fn find_role(&self, id: RoleId) -> DomainResult<Option<Role>> {
        self.roles.find_live(&id)
    }

    async fn find_organization(&self, id: OrganizationId) -> DomainResult<Option<Organization>> {
        self.organizations.find_live(&id)
    }

    async fn find_organization_by_name(
        &self,
        normalized_name: &str,
    ) -> DomainResult<Option<Organization>> {
        let wanted = normalize(normalized_name);
        Ok(self
            .organizations
            .live()?
            .into_iter()
            .filter(|org| org.normalized_name() == wanted)
            .min_by_key(|org| org.id))
    }

    async fn find_application(&self, id: ApplicationId) -> DomainResult<Option<Application>> {
        self.applications.find_live(&id)
    }

    async fn find_application_by_name(
        &self,
        normalized_name: &str,
    ) -> DomainResult<Option<Application>> {
        let wanted = normalize(normalized_name);
        Ok(self
            .applications
            .live()?
            .into_iter()
            .filter(|app| app.normalized_name() == wanted)
            .min_by_key(|app| app.id))
    }

    async fn user_claims(&self, user_id: UserId) -> DomainResult<Vec<UserClaim>> {
        let mut claims: Vec<UserClaim> = self
            .user_claims
            .live()?
            .into_iter()
            .filter(|c| c.user_id == user_id)
            .collect();
        claims.sort_by_key(|c| c.id);
        Ok(claims)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn scan_users(
        &self,
        filter: &UserFilter,
        window: Option<RowWindow>,
    ) -> DomainResult<Vec<User>> {
        let users: Vec<User> = self
            .sorted_users()?
            .into_iter()
            .filter(|u| filter.matches(u))
            .collect();
        Ok(windowed(users, window))
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn project_roles(&self, query: &RoleProjection) -> DomainResult<Vec<Role>> {
        self.capabilities.require(
            "project_roles",
            StoreCapabilities::NONE.with(Capability::RelationalProjection),
        )?;

        let granted: HashSet<RoleId> = self
            .user_roles
            .live()?
            .into_iter()
            .filter(|ur| ur.user_id == query.user_id)
            .map(|ur| ur.role_id)
            .collect();

        let mut roles = Vec::new();
        for role_id in granted {
            let Some(role) = self.roles.find_live(&role_id)? else {
                continue;
            };
            let application = self.live_application(role.application_id)?;
            if query.applications.matches_role(&role, application.as_ref()) {
                roles.push(role);
            }
        }
        roles.sort_by_key(|r| r.id);
        Ok(roles)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn project_users(&self, query: &UserProjection) -> DomainResult<Vec<User>> {
        self.capabilities
            .require("project_users", query.required_capabilities())?;

        let users = self.sorted_users()?;
        let selected: Vec<User> = match &query.predicate {
            UserPredicate::InOrganization(filter) => {
                let mut selected = Vec::new();
                for user in users {
                    let organization = self.organizations.find_live(&user.organization_id)?;
                    if filter.matches_user(&user, organization.as_ref()) {
                        selected.push(user);
                    }
                }
                selected
            }
            UserPredicate::HoldsRoleIn(filter) => {
                let roles = self.roles_matching(filter)?;
                let holders: HashSet<UserId> = self
                    .user_roles
                    .live()?
                    .into_iter()
                    .filter(|ur| roles.contains(&ur.role_id))
                    .map(|ur| ur.user_id)
                    .collect();
                users.into_iter().filter(|u| holders.contains(&u.id)).collect()
            }
        };

        Ok(windowed(selected, query.window))
    }
}
