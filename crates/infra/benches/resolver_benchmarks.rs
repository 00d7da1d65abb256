use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{DateTime, Utc};
use domainid_directory::{
    Application, MembershipResolver, Organization, PageRequest, Paging, Role, RoleResolver, User,
};
use domainid_infra::InMemoryDirectoryStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const ACTOR: &str = "bench";

struct Fixture {
    store: Arc<InMemoryDirectoryStore>,
    application: Application,
    organization: Organization,
    sample_user: User,
}

/// `user_count` users in one organization, each holding every application
/// role, plus one role in an unrelated application.
fn setup(user_count: usize, roles_per_user: usize) -> Fixture {
    let at: DateTime<Utc> = Utc::now();
    let store = Arc::new(InMemoryDirectoryStore::new());
    let application = store
        .create_application(Application::new("ColorApi", ACTOR, at), ACTOR, at)
        .unwrap();
    let other = store
        .create_application(Application::new("Hr", ACTOR, at), ACTOR, at)
        .unwrap();
    let organization = store
        .create_organization(Organization::new("Acme", ACTOR, at), ACTOR, at)
        .unwrap();

    let roles: Vec<Role> = (0..roles_per_user)
        .map(|i| {
            store
                .create_role(Role::new(format!("role-{i}"), Some(application.id), ACTOR, at), ACTOR, at)
                .unwrap()
        })
        .collect();
    let unrelated = store
        .create_role(Role::new("clerk", Some(other.id), ACTOR, at), ACTOR, at)
        .unwrap();

    let mut sample_user = None;
    for i in 0..user_count {
        let user = store
            .users()
            .insert(User::new(format!("user{i}@acme.test"), organization.id, ACTOR, at), ACTOR, at)
            .unwrap();
        for role in &roles {
            store.grant_role(user.id, role.id, ACTOR, at).unwrap();
        }
        store.grant_role(user.id, unrelated.id, ACTOR, at).unwrap();
        sample_user.get_or_insert(user);
    }

    Fixture {
        store,
        application,
        organization,
        sample_user: sample_user.expect("fixture needs at least one user"),
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

fn bench_get_roles(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("get_roles");

    for roles_per_user in [1, 5, 25].iter() {
        let fixture = setup(100, *roles_per_user);
        let resolver = RoleResolver::new(fixture.store.clone());
        let cancel = CancellationToken::new();

        group.bench_with_input(
            BenchmarkId::from_parameter(roles_per_user),
            roles_per_user,
            |b, _| {
                b.iter(|| {
                    rt.block_on(resolver.get_roles(
                        black_box(&fixture.sample_user),
                        black_box(&fixture.application.name),
                        &cancel,
                    ))
                    .unwrap()
                })
            },
        );
    }

    group.finish();
}

fn bench_users_for_application(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("users_for_application");

    for user_count in [10, 100, 1000].iter() {
        let fixture = setup(*user_count, 3);
        let resolver = MembershipResolver::new(fixture.store.clone());
        let cancel = CancellationToken::new();
        group.throughput(Throughput::Elements(*user_count as u64));

        group.bench_with_input(BenchmarkId::new("by_name", user_count), user_count, |b, _| {
            b.iter(|| {
                rt.block_on(resolver.users_for_application(
                    black_box("ColorApi"),
                    Paging::All,
                    &cancel,
                ))
                .unwrap()
            })
        });

        group.bench_with_input(BenchmarkId::new("by_id", user_count), user_count, |b, _| {
            b.iter(|| {
                rt.block_on(resolver.users_for_application(
                    black_box(fixture.application.id),
                    Paging::All,
                    &cancel,
                ))
                .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_organization_paging(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("users_for_organization_paged");
    let fixture = setup(1000, 1);
    let resolver = MembershipResolver::new(fixture.store.clone());
    let cancel = CancellationToken::new();

    for page_number in [1i64, 5, 10].iter() {
        let paging = Paging::Page(PageRequest::new(*page_number, 100).unwrap());

        group.bench_with_input(BenchmarkId::new("by_id", page_number), &paging, |b, paging| {
            b.iter(|| {
                rt.block_on(resolver.users_for_organization(
                    black_box(fixture.organization.id),
                    *paging,
                    &cancel,
                ))
                .unwrap()
            })
        });

        group.bench_with_input(BenchmarkId::new("by_name", page_number), &paging, |b, paging| {
            b.iter(|| {
                rt.block_on(resolver.users_for_organization(black_box("Acme"), *paging, &cancel))
                    .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_get_roles,
    bench_users_for_application,
    bench_organization_paging
);
criterion_main!(benches);
