//! Seeding an in-memory directory from test-user definitions.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use domainid_directory::{Application, ClaimSet, Organization, Role, User, normalize};

use crate::config::DirectoryConfig;
use crate::memory::InMemoryDirectoryStore;

/// A user to seed. Passwords are not part of the definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestUser {
    pub email: String,
    /// Falls back to the configured organization.
    pub organization_name: Option<String>,
    /// Role names under the configured application.
    pub roles: Vec<String>,
    pub claims: BTreeMap<String, Vec<String>>,
}

pub fn parse_test_users(json: &str) -> anyhow::Result<Vec<TestUser>> {
    let users: Vec<TestUser> = serde_json::from_str(json).context("invalid test-user JSON")?;
    for (index, user) in users.iter().enumerate() {
        anyhow::ensure!(!user.email.trim().is_empty(), "test user {index} has no email");
    }
    Ok(users)
}

pub fn load_test_users(path: impl AsRef<Path>) -> anyhow::Result<Vec<TestUser>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    parse_test_users(&json).with_context(|| format!("in seed file {}", path.display()))
}

/// Write `users` into `store` as open temporal rows.
///
/// Organizations, the configured application and its roles are created on
/// first use and reused afterwards. Returns the stored users in input order.
#[tracing::instrument(skip(store, config, users), fields(count = users.len(), application = %config.application))]
pub fn seed_test_users(
    store: &InMemoryDirectoryStore,
    config: &DirectoryConfig,
    users: &[TestUser],
    actor: &str,
    at: DateTime<Utc>,
) -> anyhow::Result<Vec<User>> {
    let application = ensure_application(store, &config.application, actor, at)?;

    let mut seeded = Vec::with_capacity(users.len());
    for test_user in users {
        let organization_name = test_user
            .organization_name
            .as_deref()
            .unwrap_or(&config.organization);
        let organization = ensure_organization(store, organization_name, actor, at)?;

        let wanted = normalize(&test_user.email);
        let duplicate = store
            .users()
            .live()?
            .into_iter()
            .any(|u| u.normalized_user_name == wanted);
        anyhow::ensure!(!duplicate, "user {} is already seeded", test_user.email);

        let user = store
            .users()
            .insert(User::new(&test_user.email, organization.id, actor, at), actor, at)
            .with_context(|| format!("failed to seed user {}", test_user.email))?;

        for role_name in &test_user.roles {
            let role = ensure_role(store, &application, role_name, actor, at)?;
            store
                .grant_role(user.id, role.id, actor, at)
                .with_context(|| format!("failed to grant {role_name} to {}", test_user.email))?;
        }

        for claim in ClaimSet::from(&test_user.claims).flatten() {
            store.add_user_claim(user.id, claim.claim_type, claim.value, actor, at)?;
        }

        tracing::debug!(user_id = %user.id, email = %user.email, "seeded test user");
        seeded.push(user);
    }

    tracing::info!(count = seeded.len(), "seeded directory");
    Ok(seeded)
}

fn ensure_application(
    store: &InMemoryDirectoryStore,
    name: &str,
    actor: &str,
    at: DateTime<Utc>,
) -> anyhow::Result<Application> {
    let wanted = normalize(name);
    if let Some(existing) = store
        .applications()
        .live()?
        .into_iter()
        .find(|app| app.normalized_name() == wanted)
    {
        return Ok(existing);
    }
    Ok(store.create_application(Application::new(name, actor, at), actor, at)?)
}

fn ensure_organization(
    store: &InMemoryDirectoryStore,
    name: &str,
    actor: &str,
    at: DateTime<Utc>,
) -> anyhow::Result<Organization> {
    let wanted = normalize(name);
    if let Some(existing) = store
        .organizations()
        .live()?
        .into_iter()
        .find(|org| org.normalized_name() == wanted)
    {
        return Ok(existing);
    }
    Ok(store.create_organization(Organization::new(name, actor, at), actor, at)?)
}

fn ensure_role(
    store: &InMemoryDirectoryStore,
    application: &Application,
    name: &str,
    actor: &str,
    at: DateTime<Utc>,
) -> anyhow::Result<Role> {
    let wanted = normalize(name);
    if let Some(existing) = store
        .roles()
        .live()?
        .into_iter()
        .find(|role| role.application_id == Some(application.id) && role.normalized_name == wanted)
    {
        return Ok(existing);
    }
    Ok(store.create_role(Role::new(name, Some(application.id), actor, at), actor, at)?)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio_util::sync::CancellationToken;

    use domainid_directory::{DirectoryStore, MembershipResolver, Paging, RoleResolver};

    use super::*;

    const USERS: &str = r#"[
        {"email": "maria@acme.test", "organization_name": "Acme", "roles": ["admin", "user"],
         "claims": {"name": ["Maria"], "super_admin": ["true"]}},
        {"email": "darius@acme.test", "organization_name": "ACME", "roles": ["user"]},
        {"email": "pat@other.test"}
    ]"#;

    #[tokio::test]
    async fn seeded_users_resolve_through_the_directory() {
        let store = Arc::new(InMemoryDirectoryStore::new());
        let config = DirectoryConfig {
            application: "ColorApi".into(),
            organization: "Fallback".into(),
            ..DirectoryConfig::default()
        };
        let users = seed_test_users(&store, &config, &parse_test_users(USERS).unwrap(), "seed", Utc::now())
            .unwrap();
        assert_eq!(users.len(), 3);

        // "Acme" and "ACME" are one organization.
        assert_eq!(store.organizations().live().unwrap().len(), 2);
        assert_eq!(store.roles().live().unwrap().len(), 2);

        let cancel = CancellationToken::new();
        let roles = RoleResolver::new(store.clone()).get_roles(&users[0], "colorapi", &cancel).await;
        let mut names: Vec<String> = roles.unwrap().into_iter().map(|r| r.name).collect();
        names.sort();
        assert_eq!(names, ["admin", "user"]);

        let members = MembershipResolver::new(store.clone())
            .users_for_organization("acme", Paging::All, &cancel)
            .await
            .unwrap();
        assert_eq!(members.len(), 2);

        let fallback = store.find_organization_by_name("fallback").await.unwrap().unwrap();
        assert_eq!(users[2].organization_id, fallback.id);

        let claims = store.user_claims(users[0].id).await.unwrap();
        assert_eq!(claims.len(), 2);
    }

    #[test]
    fn seeding_the_same_email_twice_fails() {
        let store = InMemoryDirectoryStore::new();
        let config = DirectoryConfig::default();
        let users = vec![TestUser {
            email: "a@b.c".into(),
            ..TestUser::default()
        }];
        seed_test_users(&store, &config, &users, "seed", Utc::now()).unwrap();
        assert!(seed_test_users(&store, &config, &users, "seed", Utc::now()).is_err());
    }

    #[test]
    fn users_without_email_are_rejected() {
        assert!(parse_test_users(r#"[{"roles": ["admin"]}]"#).is_err());
        assert!(parse_test_users("not json").is_err());
    }
}
