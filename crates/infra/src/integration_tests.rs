//! End-to-end tests for the directory resolvers over the in-memory store.
//!
//! Verifies:
//! - Role resolution sees exactly the live grants within the named applications
//! - Membership pages tile the full member set without duplicates
//! - Existence semantics for application membership
//! - Capability, argument and cancellation failures happen before any read
//! - Stale concurrency stamps are rejected

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

use domainid_core::{DomainError, ExpectedStamp, SysStatus, UserId};
use domainid_directory::{
    Application, Capability, ClaimsBuilder, MembershipResolver, Organization, PageRequest,
    Paging, Patch, PatchOptions, Role, RoleResolver, StoreCapabilities, User, UserToken,
};

use crate::memory::InMemoryDirectoryStore;

const ACTOR: &str = "test";

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

/// Two applications, two organizations and a handful of roles.
struct Directory {
    store: Arc<InMemoryDirectoryStore>,
    color: Application,
    hr: Application,
    acme: Organization,
    globex: Organization,
    color_admin: Role,
    color_user: Role,
    color_viewer: Role,
    hr_clerk: Role,
    auditor: Role,
}

impl Directory {
    fn new() -> Self {
        Self::with_store(InMemoryDirectoryStore::new())
    }

    fn with_store(store: InMemoryDirectoryStore) -> Self {
        let store = Arc::new(store);
        let color = store
            .create_application(Application::new("ColorApi", ACTOR, t0()), ACTOR, t0())
            .unwrap();
        let hr = store
            .create_application(Application::new("Hr", ACTOR, t0()), ACTOR, t0())
            .unwrap();
        let acme = store
            .create_organization(Organization::new("Acme", ACTOR, t0()), ACTOR, t0())
            .unwrap();
        let globex = store
            .create_organization(Organization::new("Globex", ACTOR, t0()), ACTOR, t0())
            .unwrap();

        let role = |name: &str, app: Option<&Application>| {
            store
                .create_role(Role::new(name, app.map(|a| a.id), ACTOR, t0()), ACTOR, t0())
                .unwrap()
        };
        let color_admin = role("admin", Some(&color));
        let color_user = role("user", Some(&color));
        let color_viewer = role("viewer", Some(&color));
        let hr_clerk = role("clerk", Some(&hr));
        let auditor = role("auditor", None);

        Self {
            store,
            color,
            hr,
            acme,
            globex,
            color_admin,
            color_user,
            color_viewer,
            hr_clerk,
            auditor,
        }
    }

    fn user(&self, email: &str, organization: &Organization) -> User {
        self.store
            .users()
            .insert(User::new(email, organization.id, ACTOR, t0()), ACTOR, t0())
            .unwrap()
    }

    fn grant(&self, user: &User, role: &Role) {
        self.store.grant_role(user.id, role.id, ACTOR, t0()).unwrap();
    }

    fn roles(&self) -> RoleResolver<Arc<InMemoryDirectoryStore>> {
        RoleResolver::new(self.store.clone())
    }

    fn members(&self) -> MembershipResolver<Arc<InMemoryDirectoryStore>> {
        MembershipResolver::new(self.store.clone())
    }
}

fn names(roles: Vec<Role>) -> Vec<String> {
    let mut names: Vec<String> = roles.into_iter().map(|r| r.name).collect();
    names.sort();
    names
}

fn ids(users: &[User]) -> Vec<UserId> {
    users.iter().map(|u| u.id).collect()
}

fn page(number: i64, size: i64) -> Paging {
    Paging::Page(PageRequest::new(number, size).unwrap())
}

// Role resolution

#[tokio::test]
async fn get_roles_returns_granted_roles_of_the_application() {
    let dir = Directory::new();
    let maria = dir.user("maria@acme.test", &dir.acme);
    dir.grant(&maria, &dir.color_admin);
    dir.grant(&maria, &dir.color_user);
    let cancel = CancellationToken::new();

    let before = dir.roles().get_roles(&maria, "ColorApi", &cancel).await.unwrap();
    assert_eq!(names(before), ["admin", "user"]);

    // A grant in another application does not leak in.
    dir.grant(&maria, &dir.hr_clerk);
    dir.grant(&maria, &dir.auditor);
    let after = dir.roles().get_roles(&maria, "colorapi", &cancel).await.unwrap();
    assert_eq!(names(after), ["admin", "user"]);
}

#[tokio::test]
async fn get_roles_in_spans_several_applications() {
    let dir = Directory::new();
    let maria = dir.user("maria@acme.test", &dir.acme);
    dir.grant(&maria, &dir.color_viewer);
    dir.grant(&maria, &dir.hr_clerk);
    let cancel = CancellationToken::new();

    let roles = dir
        .roles()
        .get_roles_in(&maria, &["ColorApi", "Hr", "ColorApi"], &cancel)
        .await
        .unwrap();
    assert_eq!(names(roles), ["clerk", "viewer"]);

    let none: [&str; 0] = [];
    assert!(dir.roles().get_roles_in(&maria, &none, &cancel).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_application_yields_no_roles() {
    let dir = Directory::new();
    let maria = dir.user("maria@acme.test", &dir.acme);
    dir.grant(&maria, &dir.color_admin);

    let roles = dir
        .roles()
        .get_roles(&maria, "NoSuchApp", &CancellationToken::new())
        .await
        .unwrap();
    assert!(roles.is_empty());
}

#[tokio::test]
async fn revoked_and_deleted_rows_are_not_joined() {
    let dir = Directory::new();
    let maria = dir.user("maria@acme.test", &dir.acme);
    dir.grant(&maria, &dir.color_admin);
    dir.grant(&maria, &dir.color_user);
    dir.grant(&maria, &dir.hr_clerk);
    let later = t0() + Duration::seconds(1);
    let cancel = CancellationToken::new();

    dir.store.revoke_role(maria.id, dir.color_admin.id, ACTOR, later).unwrap();
    dir.store
        .roles()
        .transition(&dir.color_user.id, SysStatus::Deleted, &ExpectedStamp::Any, ACTOR, later)
        .unwrap();
    dir.store
        .applications()
        .transition(&dir.hr.id, SysStatus::Deleted, &ExpectedStamp::Any, ACTOR, later)
        .unwrap();

    assert!(dir.roles().get_roles(&maria, "ColorApi", &cancel).await.unwrap().is_empty());
    assert!(dir.roles().get_roles(&maria, "Hr", &cancel).await.unwrap().is_empty());

    // The grant history survives the revocation.
    let history = dir.store.user_roles().history(&(maria.id, dir.color_admin.id)).unwrap();
    assert_eq!(history.len(), 2);
}

// Organization membership

#[tokio::test]
async fn organization_members_by_id_and_by_name_agree() {
    let dir = Directory::new();
    let a = dir.user("a@acme.test", &dir.acme);
    let b = dir.user("b@acme.test", &dir.acme);
    dir.user("c@globex.test", &dir.globex);
    let cancel = CancellationToken::new();

    let mut expected = vec![a.id, b.id];
    expected.sort();

    let by_id = dir
        .members()
        .users_for_organization(dir.acme.id, Paging::default(), &cancel)
        .await
        .unwrap();
    let by_name = dir
        .members()
        .users_for_organization("ACME", Paging::All, &cancel)
        .await
        .unwrap();

    assert_eq!(ids(&by_id.items), expected);
    assert_eq!(ids(&by_name.items), expected);
    assert!(by_id.is_last());
    assert_eq!(by_name.request, None);
}

#[tokio::test]
async fn deleted_users_and_organizations_drop_out_of_membership() {
    let dir = Directory::new();
    let kept = dir.user("kept@acme.test", &dir.acme);
    let gone = dir.user("gone@acme.test", &dir.acme);
    let later = t0() + Duration::seconds(1);
    let cancel = CancellationToken::new();

    dir.store
        .users()
        .transition(&gone.id, SysStatus::Deleted, &ExpectedStamp::Any, ACTOR, later)
        .unwrap();
    let members = dir
        .members()
        .users_for_organization(dir.acme.id, Paging::All, &cancel)
        .await
        .unwrap();
    assert_eq!(ids(&members.items), [kept.id]);

    dir.store
        .organizations()
        .transition(&dir.acme.id, SysStatus::Deleted, &ExpectedStamp::Any, ACTOR, later)
        .unwrap();
    let by_name = dir
        .members()
        .users_for_organization("Acme", Paging::All, &cancel)
        .await
        .unwrap();
    assert!(by_name.is_empty());
}

fn run<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(fut)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn organization_pages_tile_the_member_set(members in 0usize..40, others in 0usize..5, size in 1i64..12, by_name in any::<bool>()) {
        let dir = Directory::new();
        let mut expected: Vec<UserId> = (0..members)
            .map(|i| dir.user(&format!("m{i}@acme.test"), &dir.acme).id)
            .collect();
        for i in 0..others {
            dir.user(&format!("o{i}@globex.test"), &dir.globex);
        }
        expected.sort();

        let pages = members.div_ceil(size as usize).max(1);
        let collected = run(async {
            let cancel = CancellationToken::new();
            let mut collected = Vec::new();
            for number in 1..=pages as i64 {
                let result = if by_name {
                    dir.members().users_for_organization("acme", page(number, size), &cancel).await
                } else {
                    dir.members().users_for_organization(dir.acme.id, page(number, size), &cancel).await
                };
                collected.extend(ids(&result.unwrap().items));
            }
            collected
        });

        let distinct: HashSet<UserId> = collected.iter().copied().collect();
        prop_assert_eq!(distinct.len(), collected.len());
        prop_assert_eq!(collected, expected);
    }
}

// Application membership

#[tokio::test]
async fn application_members_are_distinct() {
    let dir = Directory::new();
    let maria = dir.user("maria@acme.test", &dir.acme);
    let darius = dir.user("darius@globex.test", &dir.globex);
    let outsider = dir.user("pat@acme.test", &dir.acme);
    for role in [&dir.color_admin, &dir.color_user, &dir.color_viewer] {
        dir.grant(&maria, role);
    }
    dir.grant(&darius, &dir.color_user);
    dir.grant(&outsider, &dir.hr_clerk);
    let cancel = CancellationToken::new();

    let mut expected = vec![maria.id, darius.id];
    expected.sort();

    let by_name = dir
        .members()
        .users_for_application("ColorApi", Paging::All, &cancel)
        .await
        .unwrap();
    let by_id = dir
        .members()
        .users_for_application(dir.color.id, page(1, 100), &cancel)
        .await
        .unwrap();

    assert_eq!(ids(&by_name.items), expected);
    assert_eq!(ids(&by_id.items), expected);
}

#[tokio::test]
async fn application_pages_count_users_not_grants() {
    let dir = Directory::new();
    let mut expected = Vec::new();
    for i in 0..5 {
        let user = dir.user(&format!("u{i}@acme.test"), &dir.acme);
        dir.grant(&user, &dir.color_admin);
        dir.grant(&user, &dir.color_user);
        dir.grant(&user, &dir.color_viewer);
        expected.push(user.id);
    }
    expected.sort();
    let cancel = CancellationToken::new();

    let first = dir
        .members()
        .users_for_application("ColorApi", page(1, 2), &cancel)
        .await
        .unwrap();
    let second = dir
        .members()
        .users_for_application("ColorApi", page(2, 2), &cancel)
        .await
        .unwrap();
    let third = dir
        .members()
        .users_for_application("ColorApi", page(3, 2), &cancel)
        .await
        .unwrap();

    assert_eq!(ids(&first.items), expected[0..2]);
    assert_eq!(ids(&second.items), expected[2..4]);
    assert_eq!(ids(&third.items), expected[4..5]);
    assert!(!first.is_last());
    assert!(third.is_last());
}

#[tokio::test]
async fn unknown_application_has_no_members() {
    let dir = Directory::new();
    let maria = dir.user("maria@acme.test", &dir.acme);
    dir.grant(&maria, &dir.color_admin);

    let members = dir
        .members()
        .users_for_application("NoSuchApp", Paging::All, &CancellationToken::new())
        .await
        .unwrap();
    assert!(members.is_empty());
}

// Failures

#[tokio::test]
async fn stores_without_projection_are_rejected() {
    let dir = Directory::with_store(
        InMemoryDirectoryStore::new().with_capabilities(StoreCapabilities::NONE),
    );
    let maria = dir.user("maria@acme.test", &dir.acme);
    let cancel = CancellationToken::new();

    let err = dir.roles().get_roles(&maria, "ColorApi", &cancel).await.unwrap_err();
    assert_eq!(err, DomainError::unsupported("get_roles", "relational_projection"));

    let err = dir
        .members()
        .users_for_application(dir.color.id, Paging::All, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::UnsupportedStoreCapability { capability: "relational_projection", .. }));

    // The by-id organization form is a plain scan.
    let members = dir
        .members()
        .users_for_organization(dir.acme.id, page(1, 10), &cancel)
        .await
        .unwrap();
    assert_eq!(ids(&members.items), [maria.id]);
}

#[tokio::test]
async fn paged_projection_needs_offset_paging() {
    let dir = Directory::with_store(
        InMemoryDirectoryStore::new()
            .with_capabilities(StoreCapabilities::NONE.with(Capability::RelationalProjection)),
    );
    let maria = dir.user("maria@acme.test", &dir.acme);
    dir.grant(&maria, &dir.color_admin);
    let cancel = CancellationToken::new();

    let err = dir
        .members()
        .users_for_organization("Acme", page(1, 10), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::unsupported("users_for_organization", "offset_paging"));

    let err = dir
        .members()
        .users_for_application("ColorApi", page(1, 10), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::unsupported("users_for_application", "offset_paging"));

    // Unpaged projections only need relational projection.
    let all = dir
        .members()
        .users_for_organization("Acme", Paging::All, &cancel)
        .await
        .unwrap();
    assert_eq!(ids(&all.items), [maria.id]);
    assert_eq!(
        names(dir.roles().get_roles(&maria, "ColorApi", &cancel).await.unwrap()),
        ["admin"]
    );
}

#[test]
fn malformed_paging_is_an_invalid_argument() {
    for (number, size) in [(0, 10), (-1, 10), (1, 0), (1, -5)] {
        let err = PageRequest::new(number, size).unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)), "{number}/{size}");
    }
}

#[tokio::test]
async fn cancelled_calls_return_cancelled() {
    let dir = Directory::new();
    let maria = dir.user("maria@acme.test", &dir.acme);
    dir.grant(&maria, &dir.color_admin);
    let cancel = CancellationToken::new();
    cancel.cancel();

    assert_eq!(
        dir.roles().get_roles(&maria, "ColorApi", &cancel).await,
        Err(DomainError::Cancelled)
    );
    assert_eq!(
        dir.members()
            .users_for_organization(dir.acme.id, Paging::All, &cancel)
            .await,
        Err(DomainError::Cancelled)
    );
    assert_eq!(
        dir.members()
            .users_for_application("ColorApi", Paging::All, &cancel)
            .await,
        Err(DomainError::Cancelled)
    );
}

#[tokio::test]
async fn concurrent_writers_conflict_on_stale_stamps() {
    let dir = Directory::new();
    let maria = dir.user("maria@acme.test", &dir.acme);
    let stamp = ExpectedStamp::Exact(maria.concurrency_stamp.clone());

    let mut first = maria.clone();
    first.phone_number = Some("555-0100".into());
    let mut second = maria.clone();
    second.phone_number = Some("555-0199".into());

    dir.store
        .users()
        .revise(first, &stamp, ACTOR, t0() + Duration::seconds(1))
        .unwrap();
    let err = dir
        .store
        .users()
        .revise(second, &stamp, ACTOR, t0() + Duration::seconds(2))
        .unwrap_err();
    assert!(matches!(err, DomainError::ConcurrencyConflict(_)));

    let current = dir.store.users().current(&maria.id).unwrap().unwrap();
    assert_eq!(current.phone_number.as_deref(), Some("555-0100"));
}

// Claims and patches over stored rows

#[tokio::test]
async fn claims_reflect_resolved_roles_and_stored_claims() {
    let dir = Directory::new();
    let maria = dir.user("maria@acme.test", &dir.acme);
    dir.grant(&maria, &dir.color_admin);
    dir.store
        .add_user_claim(maria.id, "organization_admin_for", "Acme", ACTOR, t0())
        .unwrap();
    let cancel = CancellationToken::new();

    let roles = dir.roles().get_roles(&maria, "ColorApi", &cancel).await.unwrap();
    let stored = domainid_directory::DirectoryStore::user_claims(&dir.store, maria.id)
        .await
        .unwrap();
    let claims = ClaimsBuilder::for_user(&maria, Utc::now())
        .organization(&dir.acme)
        .application_roles(&dir.color.name, &roles)
        .stored_claims(&stored)
        .build();

    assert!(claims.contains("app:role", "ColorApi:admin"));
    assert!(claims.contains("organization", "Acme"));
    assert!(claims.contains("organization_admin_for", "Acme"));
    assert!(!claims.contains("locked", "true"));
}

#[test]
fn patched_token_is_stored_as_a_new_version() {
    let dir = Directory::new();
    let maria = dir.user("maria@acme.test", &dir.acme);
    let token = dir
        .store
        .user_tokens()
        .insert(
            UserToken::issue(maria.id, "Google", "refresh", "v1", ACTOR, t0()),
            ACTOR,
            t0(),
        )
        .unwrap();

    let input = serde_json::json!({"value": "v2", "SysStatus": "Nope", "Properties": {"scope": "email"}});
    let mut patched = token.clone();
    let errors = patched.patch(input.as_object().unwrap(), PatchOptions::default());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "SysStatus");

    let later = t0() + Duration::seconds(1);
    dir.store
        .user_tokens()
        .revise(patched, &ExpectedStamp::Any, ACTOR, later)
        .unwrap();

    let key = (maria.id, "Google".to_string(), "refresh".to_string());
    let current = dir.store.user_tokens().current(&key).unwrap().unwrap();
    assert_eq!(current.value.as_deref(), Some("v2"));
    assert_eq!(current.temporal.sys_start, later);
    assert_eq!(dir.store.user_tokens().as_of(&key, t0()).unwrap().unwrap().value.as_deref(), Some("v1"));
}

// Name uniqueness

#[tokio::test]
async fn duplicate_names_are_rejected_and_membership_stays_separate() {
    let dir = Directory::new();
    let a = dir.user("a@acme.test", &dir.acme);
    let cancel = CancellationToken::new();

    let org = dir
        .store
        .create_organization(Organization::new("acme", ACTOR, t0()), ACTOR, t0())
        .unwrap_err();
    let role = dir
        .store
        .create_role(Role::new("admin", Some(dir.color.id), ACTOR, t0()), ACTOR, t0())
        .unwrap_err();
    let app = dir
        .store
        .create_application(Application::new("COLORAPI", ACTOR, t0()), ACTOR, t0())
        .unwrap_err();
    for err in [org, role, app] {
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    let members = dir
        .members()
        .users_for_organization("Acme", Paging::All, &cancel)
        .await
        .unwrap();
    assert_eq!(ids(&members.items), vec![a.id]);
    assert_eq!(dir.store.organizations().live().unwrap().len(), 2);
}
