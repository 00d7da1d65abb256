//! Associative records hanging off users and roles.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use domainid_core::{Entity, RoleId, TemporalRecord, UserId};

use super::impl_temporal;

/// Grant of a role to a user. Revocation is a status transition, so the
/// history of grants is retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: UserId,
    pub role_id: RoleId,
    #[serde(flatten)]
    pub temporal: TemporalRecord,
}

impl UserRole {
    pub fn new(user_id: UserId, role_id: RoleId, actor: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            role_id,
            temporal: TemporalRecord::opened(actor, at),
        }
    }
}

impl Entity for UserRole {
    type Key = (UserId, RoleId);

    fn key(&self) -> Self::Key {
        (self.user_id, self.role_id)
    }
}

impl_temporal!(UserRole, "user_role");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaim {
    pub id: i64,
    pub user_id: UserId,
    pub claim_type: String,
    pub claim_value: String,
    #[serde(flatten)]
    pub temporal: TemporalRecord,
}

impl Entity for UserClaim {
    type Key = i64;

    fn key(&self) -> Self::Key {
        self.id
    }
}

impl_temporal!(UserClaim, "user_claim");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleClaim {
    pub id: i64,
    pub role_id: RoleId,
    pub claim_type: String,
    pub claim_value: String,
    #[serde(flatten)]
    pub temporal: TemporalRecord,
}

impl Entity for RoleClaim {
    type Key = i64;

    fn key(&self) -> Self::Key {
        self.id
    }
}

impl_temporal!(RoleClaim, "role_claim");

/// External login linked to a user, keyed by provider and provider key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserLogin {
    pub login_provider: String,
    pub provider_key: String,
    pub provider_display_name: Option<String>,
    pub user_id: UserId,
    #[serde(flatten)]
    pub temporal: TemporalRecord,
}

impl Entity for UserLogin {
    type Key = (String, String);

    fn key(&self) -> Self::Key {
        (self.login_provider.clone(), self.provider_key.clone())
    }
}

impl_temporal!(UserLogin, "user_login");

/// Token issued to a user by a login provider.
///
/// Created on first issuance. `Patch` merges or replaces `properties`
/// depending on the caller's merge flag; `Update` overwrites every field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserToken {
    pub user_id: UserId,
    pub login_provider: String,
    pub name: String,
    pub value: Option<String>,
    pub properties: Option<BTreeMap<String, String>>,
    #[serde(flatten)]
    pub temporal: TemporalRecord,
}

impl UserToken {
    pub fn issue(
        user_id: UserId,
        login_provider: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
        actor: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            login_provider: login_provider.into(),
            name: name.into(),
            value: Some(value.into()),
            properties: None,
            temporal: TemporalRecord::opened(actor, at),
        }
    }
}

impl Entity for UserToken {
    type Key = (UserId, String, String);

    fn key(&self) -> Self::Key {
        (self.user_id, self.login_provider.clone(), self.name.clone())
    }
}

impl_temporal!(UserToken, "user_token");
