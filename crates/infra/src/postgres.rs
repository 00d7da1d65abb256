//! Postgres-backed directory read store.
//!
//! Answers the query builder with `JOIN` / `EXISTS` SQL and evaluates row
//! windows server-side with `OFFSET .. LIMIT ..`, so it advertises every
//! [`Capability`](domainid_directory::Capability).
//!
//! ## Schema
//!
//! One table per entity set (`users`, `roles`, `organizations`,
//! `applications`, `user_roles`, `user_claims`), each carrying the temporal
//! columns `sys_status INT`, `sys_user TEXT`, `sys_start TIMESTAMPTZ` and
//! `sys_end TIMESTAMPTZ`. Only current rows (`sys_end` at the open sentinel)
//! whose status is not `Deleted` are ever read, for the queried table and
//! for every joined table. Free-form `properties` are `JSONB`.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | DomainError |
//! |------------|----------------------|-------------|
//! | Database (unique violation) | `23505` | `ConcurrencyConflict` |
//! | Database (serialization failure) | `40001` | `ConcurrencyConflict` |
//! | Database (other) | Any other | `Store` |
//! | PoolClosed / Other | N/A | `Store` |
//! | Decoding a row | N/A | `Store` |

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use domainid_core::{
    ApplicationId, ConcurrencyStamp, DomainError, DomainResult, OrganizationId, RoleId,
    SysStatus, TemporalRecord, UserId, sys_end_open,
};
use domainid_directory::models::PropertyBag;
use domainid_directory::{
    Application, ApplicationFilter, DirectoryStore, Organization, OrganizationFilter, Role,
    RoleProjection, RowWindow, StoreCapabilities, User, UserClaim, UserFilter, UserPredicate,
    UserProjection, normalize,
};

const USER_COLUMNS: &str = "u.id, u.user_name, u.normalized_user_name, u.email, \
    u.normalized_email, u.email_confirmed, u.password_hash, u.security_stamp, \
    u.concurrency_stamp, u.phone_number, u.phone_number_confirmed, u.two_factor_enabled, \
    u.lockout_end, u.lockout_enabled, u.access_failed_count, u.organization_id, \
    u.properties, u.sys_status, u.sys_user, u.sys_start, u.sys_end";

const ROLE_COLUMNS: &str = "r.id, r.name, r.normalized_name, r.application_id, \
    r.concurrency_stamp, r.properties, r.sys_status, r.sys_user, r.sys_start, r.sys_end";

/// `$1` is always bound to the open `sys_end` sentinel.
fn live(alias: &str) -> String {
    format!(
        "{alias}.sys_end = $1 AND {alias}.sys_status <> {}",
        SysStatus::Deleted.code()
    )
}

/// A positional parameter after `$1`.
enum Param {
    Uuid(Uuid),
    Names(Vec<String>),
    Text(String),
}

/// SQL text plus its parameters, built from a query-builder value.
struct Statement {
    sql: String,
    params: Vec<Param>,
}

impl Statement {
    fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Push a parameter and return its placeholder.
    fn param(&mut self, param: Param) -> String {
        self.params.push(param);
        format!("${}", self.params.len() + 1)
    }

    fn push(&mut self, sql: &str) {
        self.sql.push(' ');
        self.sql.push_str(sql);
    }

    fn window(&mut self, window: Option<RowWindow>) -> DomainResult<()> {
        if let Some(window) = window {
            let offset = i64::try_from(window.offset)
                .map_err(|_| DomainError::invalid_argument("row offset out of range"))?;
            let limit = i64::try_from(window.limit)
                .map_err(|_| DomainError::invalid_argument("row limit out of range"))?;
            self.push(&format!("OFFSET {offset} LIMIT {limit}"));
        }
        Ok(())
    }

    async fn fetch_all(&self, pool: &PgPool, operation: &str) -> DomainResult<Vec<PgRow>> {
        let mut query = sqlx::query(&self.sql).bind(sys_end_open());
        for param in &self.params {
            query = match param {
                Param::Uuid(value) => query.bind(*value),
                Param::Names(values) => query.bind(values.clone()),
                Param::Text(value) => query.bind(value.clone()),
            };
        }
        query
            .fetch_all(pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))
    }

    async fn fetch_optional(&self, pool: &PgPool, operation: &str) -> DomainResult<Option<PgRow>> {
        Ok(self.fetch_all(pool, operation).await?.into_iter().next())
    }
}

/// `ApplicationFilter` as a predicate over the role alias `r`.
fn application_clause(stmt: &mut Statement, filter: &ApplicationFilter) -> String {
    match filter {
        ApplicationFilter::Id(id) => {
            let p = stmt.param(Param::Uuid(*id.as_uuid()));
            format!("r.application_id = {p}")
        }
        ApplicationFilter::Names(names) => {
            let p = stmt.param(Param::Names(names.clone()));
            format!(
                "EXISTS (SELECT 1 FROM applications a WHERE a.id = r.application_id AND {} \
                 AND UPPER(TRIM(a.name)) = ANY({p}))",
                live("a")
            )
        }
    }
}

/// Postgres-backed directory store.
///
/// Uses the SQLx connection pool, which is `Send + Sync`; reads hold no
/// transaction across calls.
#[derive(Debug, Clone)]
pub struct PostgresDirectoryStore {
    pool: Arc<PgPool>,
}

impl PostgresDirectoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect to `database_url` with a default pool.
    pub async fn connect(database_url: &str) -> DomainResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    async fn users(&self, stmt: Statement, operation: &str) -> DomainResult<Vec<User>> {
        let rows = stmt.fetch_all(&self.pool, operation).await?;
        let users = rows.iter().map(user_from_row).collect::<DomainResult<Vec<_>>>()?;
        tracing::debug!(operation, count = users.len(), "loaded users");
        Ok(users)
    }

    async fn one_user(&self, stmt: Statement, operation: &str) -> DomainResult<Option<User>> {
        stmt.fetch_optional(&self.pool, operation)
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn one_named(&self, stmt: Statement, operation: &str) -> DomainResult<Option<NamedRow>> {
        stmt.fetch_optional(&self.pool, operation)
            .await?
            .as_ref()
            .map(named_from_row)
            .transpose()
    }
}

#[async_trait]
impl DirectoryStore for PostgresDirectoryStore {
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::ALL
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn find_user(&self, id: UserId) -> DomainResult<Option<User>> {
        let mut stmt = Statement::new(format!("SELECT {USER_COLUMNS} FROM users u WHERE {}", live("u")));
        let p = stmt.param(Param::Uuid(*id.as_uuid()));
        stmt.push(&format!("AND u.id = {p}"));
        self.one_user(stmt, "find_user").await
    }

    #[instrument(skip(self), err)]
    async fn find_user_by_name(&self, normalized_user_name: &str) -> DomainResult<Option<User>> {
        let mut stmt = Statement::new(format!("SELECT {USER_COLUMNS} FROM users u WHERE {}", live("u")));
        let p = stmt.param(Param::Text(normalize(normalized_user_name)));
        stmt.push(&format!(
            "AND (u.normalized_user_name = {p} OR u.normalized_email = {p}) ORDER BY u.id LIMIT 1"
        ));
        self.one_user(stmt, "find_user_by_name").await
    }

    #[instrument(skip(self), fields(role_id = %id), err)]
    async fn find_role(&self, id: RoleId) -> DomainResult<Option<Role>> {
        let mut stmt = Statement::new(format!("SELECT {ROLE_COLUMNS} FROM roles r WHERE {}", live("r")));
        let p = stmt.param(Param::Uuid(*id.as_uuid()));
        stmt.push(&format!("AND r.id = {p}"));
        stmt.fetch_optional(&self.pool, "find_role")
            .await?
            .as_ref()
            .map(role_from_row)
            .transpose()
    }

    #[instrument(skip(self), fields(organization_id = %id), err)]
    async fn find_organization(&self, id: OrganizationId) -> DomainResult<Option<Organization>> {
        let stmt = named_by_id("organizations", *id.as_uuid());
        Ok(self
            .one_named(stmt, "find_organization")
            .await?
            .map(NamedRow::into_organization))
    }

    #[instrument(skip(self), err)]
    async fn find_organization_by_name(
        &self,
        normalized_name: &str,
    ) -> DomainResult<Option<Organization>> {
        let stmt = named_by_name("organizations", normalized_name);
        Ok(self
            .one_named(stmt, "find_organization_by_name")
            .await?
            .map(NamedRow::into_organization))
    }

    #[instrument(skip(self), fields(application_id = %id), err)]
    async fn find_application(&self, id: ApplicationId) -> DomainResult<Option<Application>> {
        let stmt = named_by_id("applications", *id.as_uuid());
        Ok(self
            .one_named(stmt, "find_application")
            .await?
            .map(NamedRow::into_application))
    }

    #[instrument(skip(self), err)]
    async fn find_application_by_name(
        &self,
        normalized_name: &str,
    ) -> DomainResult<Option<Application>> {
        let stmt = named_by_name("applications", normalized_name);
        Ok(self
            .one_named(stmt, "find_application_by_name")
            .await?
            .map(NamedRow::into_application))
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn user_claims(&self, user_id: UserId) -> DomainResult<Vec<UserClaim>> {
        let mut stmt = Statement::new(format!(
            "SELECT c.id, c.user_id, c.claim_type, c.claim_value, \
             c.sys_status, c.sys_user, c.sys_start, c.sys_end \
             FROM user_claims c WHERE {}",
            live("c")
        ));
        let p = stmt.param(Param::Uuid(*user_id.as_uuid()));
        stmt.push(&format!("AND c.user_id = {p} ORDER BY c.id"));

        let rows = stmt.fetch_all(&self.pool, "user_claims").await?;
        rows.iter()
            .map(|row| {
                Ok(UserClaim {
                    id: row.try_get("id").map_err(decode_error)?,
                    user_id: UserId::from_uuid(row.try_get("user_id").map_err(decode_error)?),
                    claim_type: row.try_get("claim_type").map_err(decode_error)?,
                    claim_value: row.try_get("claim_value").map_err(decode_error)?,
                    temporal: temporal_from_row(row)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn scan_users(
        &self,
        filter: &UserFilter,
        window: Option<RowWindow>,
    ) -> DomainResult<Vec<User>> {
        let mut stmt = Statement::new(format!("SELECT {USER_COLUMNS} FROM users u WHERE {}", live("u")));
        if let Some(organization_id) = filter.organization_id {
            let p = stmt.param(Param::Uuid(*organization_id.as_uuid()));
            stmt.push(&format!("AND u.organization_id = {p}"));
        }
        stmt.push("ORDER BY u.id");
        stmt.window(window)?;
        self.users(stmt, "scan_users").await
    }

    #[instrument(skip(self), err)]
    async fn project_roles(&self, query: &RoleProjection) -> DomainResult<Vec<Role>> {
        let mut stmt = Statement::new(format!(
            "SELECT {ROLE_COLUMNS} FROM user_roles ur JOIN roles r ON r.id = ur.role_id \
             WHERE {} AND {}",
            live("ur"),
            live("r")
        ));
        let p = stmt.param(Param::Uuid(*query.user_id.as_uuid()));
        let applications = application_clause(&mut stmt, &query.applications);
        stmt.push(&format!("AND ur.user_id = {p} AND {applications} ORDER BY r.id"));

        let rows = stmt.fetch_all(&self.pool, "project_roles").await?;
        rows.iter().map(role_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn project_users(&self, query: &UserProjection) -> DomainResult<Vec<User>> {
        let mut stmt = Statement::new(format!("SELECT {USER_COLUMNS} FROM users u"));
        match &query.predicate {
            UserPredicate::InOrganization(OrganizationFilter::Id(id)) => {
                let p = stmt.param(Param::Uuid(*id.as_uuid()));
                stmt.push(&format!("WHERE {} AND u.organization_id = {p}", live("u")));
            }
            UserPredicate::InOrganization(OrganizationFilter::Name(name)) => {
                let p = stmt.param(Param::Text(name.clone()));
                stmt.push(&format!(
                    "JOIN organizations o ON o.id = u.organization_id \
                     WHERE {} AND {} AND UPPER(TRIM(o.name)) = {p}",
                    live("u"),
                    live("o")
                ));
            }
            UserPredicate::HoldsRoleIn(filter) => {
                let applications = application_clause(&mut stmt, filter);
                stmt.push(&format!(
                    "WHERE {} AND EXISTS (SELECT 1 FROM user_roles ur JOIN roles r ON r.id = ur.role_id \
                     WHERE ur.user_id = u.id AND {} AND {} AND {applications})",
                    live("u"),
                    live("ur"),
                    live("r")
                ));
            }
        }
        stmt.push("ORDER BY u.id");
        stmt.window(query.window)?;
        self.users(stmt, "project_users").await
    }
}

fn named_by_id(table: &str, id: Uuid) -> Statement {
    let mut stmt = Statement::new(format!(
        "SELECT t.id, t.name, t.properties, t.sys_status, t.sys_user, t.sys_start, t.sys_end \
         FROM {table} t WHERE {}",
        live("t")
    ));
    let p = stmt.param(Param::Uuid(id));
    stmt.push(&format!("AND t.id = {p}"));
    stmt
}

fn named_by_name(table: &str, name: &str) -> Statement {
    let mut stmt = Statement::new(format!(
        "SELECT t.id, t.name, t.properties, t.sys_status, t.sys_user, t.sys_start, t.sys_end \
         FROM {table} t WHERE {}",
        live("t")
    ));
    let p = stmt.param(Param::Text(normalize(name)));
    stmt.push(&format!("AND UPPER(TRIM(t.name)) = {p} ORDER BY t.id LIMIT 1"));
    stmt
}

// SQLx row mapping

/// Organizations and applications share a row shape.
struct NamedRow {
    id: Uuid,
    name: String,
    properties: PropertyBag,
    temporal: TemporalRecord,
}

impl NamedRow {
    fn into_organization(self) -> Organization {
        Organization {
            id: OrganizationId::from_uuid(self.id),
            name: self.name,
            properties: self.properties,
            temporal: self.temporal,
        }
    }

    fn into_application(self) -> Application {
        Application {
            id: ApplicationId::from_uuid(self.id),
            name: self.name,
            properties: self.properties,
            temporal: self.temporal,
        }
    }
}

fn named_from_row(row: &PgRow) -> DomainResult<NamedRow> {
    Ok(NamedRow {
        id: row.try_get("id").map_err(decode_error)?,
        name: row.try_get("name").map_err(decode_error)?,
        properties: properties_from_row(row)?,
        temporal: temporal_from_row(row)?,
    })
}

fn user_from_row(row: &PgRow) -> DomainResult<User> {
    Ok(User {
        id: UserId::from_uuid(row.try_get("id").map_err(decode_error)?),
        user_name: row.try_get("user_name").map_err(decode_error)?,
        normalized_user_name: row.try_get("normalized_user_name").map_err(decode_error)?,
        email: row.try_get("email").map_err(decode_error)?,
        normalized_email: row.try_get("normalized_email").map_err(decode_error)?,
        email_confirmed: row.try_get("email_confirmed").map_err(decode_error)?,
        password_hash: row.try_get("password_hash").map_err(decode_error)?,
        security_stamp: row.try_get("security_stamp").map_err(decode_error)?,
        concurrency_stamp: ConcurrencyStamp::from_string(
            row.try_get::<String, _>("concurrency_stamp").map_err(decode_error)?,
        ),
        phone_number: row.try_get("phone_number").map_err(decode_error)?,
        phone_number_confirmed: row.try_get("phone_number_confirmed").map_err(decode_error)?,
        two_factor_enabled: row.try_get("two_factor_enabled").map_err(decode_error)?,
        lockout_end: row.try_get("lockout_end").map_err(decode_error)?,
        lockout_enabled: row.try_get("lockout_enabled").map_err(decode_error)?,
        access_failed_count: row.try_get("access_failed_count").map_err(decode_error)?,
        organization_id: OrganizationId::from_uuid(row.try_get("organization_id").map_err(decode_error)?),
        properties: properties_from_row(row)?,
        temporal: temporal_from_row(row)?,
    })
}

fn role_from_row(row: &PgRow) -> DomainResult<Role> {
    let application_id: Option<Uuid> = row.try_get("application_id").map_err(decode_error)?;
    Ok(Role {
        id: RoleId::from_uuid(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        normalized_name: row.try_get("normalized_name").map_err(decode_error)?,
        application_id: application_id.map(ApplicationId::from_uuid),
        concurrency_stamp: ConcurrencyStamp::from_string(
            row.try_get::<String, _>("concurrency_stamp").map_err(decode_error)?,
        ),
        properties: properties_from_row(row)?,
        temporal: temporal_from_row(row)?,
    })
}

fn temporal_from_row(row: &PgRow) -> DomainResult<TemporalRecord> {
    Ok(TemporalRecord {
        sys_status: SysStatus::from_code(row.try_get("sys_status").map_err(decode_error)?)?,
        sys_user: row.try_get("sys_user").map_err(decode_error)?,
        sys_start: row.try_get("sys_start").map_err(decode_error)?,
        sys_end: row.try_get("sys_end").map_err(decode_error)?,
    })
}

fn properties_from_row(row: &PgRow) -> DomainResult<PropertyBag> {
    let value: Option<serde_json::Value> = row.try_get("properties").map_err(decode_error)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(PropertyBag::new()),
        Some(serde_json::Value::Object(map)) => Ok(map),
        Some(other) => Err(DomainError::store(format!(
            "properties column holds a non-object JSON value: {other}"
        ))),
    }
}

fn decode_error(err: sqlx::Error) -> DomainError {
    DomainError::store(format!("failed to decode row: {err}"))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DomainError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("40001") => DomainError::conflict(msg),
                _ => DomainError::store(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            DomainError::store(format!("connection pool closed in {operation}"))
        }
        other => DomainError::store(format!("sqlx error in {operation}: {other}")),
    }
}
