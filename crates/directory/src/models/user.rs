use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use domainid_core::{ConcurrencyStamp, Entity, OrganizationId, SysStatus, TemporalRecord, UserId};

use super::{PropertyBag, impl_temporal, normalize};

/// A directory user.
///
/// # Invariants
/// - A user belongs to exactly one organization.
/// - `normalized_user_name` / `normalized_email` are the [`normalize`]d forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub user_name: String,
    pub normalized_user_name: String,
    pub email: String,
    pub normalized_email: String,
    pub email_confirmed: bool,
    pub password_hash: Option<String>,
    pub security_stamp: Option<String>,
    pub concurrency_stamp: ConcurrencyStamp,
    pub phone_number: Option<String>,
    pub phone_number_confirmed: bool,
    pub two_factor_enabled: bool,
    pub lockout_end: Option<DateTime<Utc>>,
    pub lockout_enabled: bool,
    pub access_failed_count: i32,
    pub organization_id: OrganizationId,
    pub properties: PropertyBag,
    #[serde(flatten)]
    pub temporal: TemporalRecord,
}

impl User {
    /// New user whose user name is its email, opened by `actor` at `at`.
    pub fn new(
        email: impl Into<String>,
        organization_id: OrganizationId,
        actor: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        let email = email.into().trim().to_string();
        Self {
            id: UserId::new(),
            normalized_user_name: normalize(&email),
            user_name: email.clone(),
            normalized_email: normalize(&email),
            email,
            email_confirmed: false,
            password_hash: None,
            security_stamp: None,
            concurrency_stamp: ConcurrencyStamp::new(),
            phone_number: None,
            phone_number_confirmed: false,
            two_factor_enabled: false,
            lockout_end: None,
            lockout_enabled: true,
            access_failed_count: 0,
            organization_id,
            properties: PropertyBag::new(),
            temporal: TemporalRecord::opened(actor, at),
        }
    }

    pub fn with_id(mut self, id: UserId) -> Self {
        self.id = id;
        self
    }

    /// Locked either by status or by an unexpired lockout.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        if self.temporal.sys_status == SysStatus::Locked {
            return true;
        }
        self.lockout_enabled && self.lockout_end.is_some_and(|end| end > now)
    }
}

impl Entity for User {
    type Key = UserId;

    fn key(&self) -> Self::Key {
        self.id
    }
}

impl_temporal!(User, "user", stamped);
