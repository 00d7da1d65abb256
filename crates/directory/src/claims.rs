//! Claim types and claim emission for directory users.
//!
//! Claims are produced here and consumed by whatever authentication layer
//! sits in front of the directory. Signing and token issuance are outside
//! this crate.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use domainid_core::{DomainError, Temporal};

use crate::models::{Organization, Role, User, UserClaim};

/// Suffix marking an application's administrator role value.
pub const APPLICATION_ROLE_ADMIN_SUFFIX: &str = ":admin";

/// Claim types owned by the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomainClaimType {
    Organization,
    OrganizationConfirmed,
    OrganizationAdminFor,
    SuperAdmin,
    Locked,
    ApplicationRole,
}

impl DomainClaimType {
    pub const ALL: [DomainClaimType; 6] = [
        DomainClaimType::Organization,
        DomainClaimType::OrganizationConfirmed,
        DomainClaimType::OrganizationAdminFor,
        DomainClaimType::SuperAdmin,
        DomainClaimType::Locked,
        DomainClaimType::ApplicationRole,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DomainClaimType::Organization => "organization",
            DomainClaimType::OrganizationConfirmed => "organization_confirmed",
            DomainClaimType::OrganizationAdminFor => "organization_admin_for",
            DomainClaimType::SuperAdmin => "super_admin",
            DomainClaimType::Locked => "locked",
            DomainClaimType::ApplicationRole => "app:role",
        }
    }
}

impl core::fmt::Display for DomainClaimType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainClaimType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown claim type '{s}'")))
    }
}

/// `"<application>:<role>"`, the value of an application-role claim.
pub fn application_role(application: &str, role: &str) -> String {
    format!("{application}:{role}")
}

/// `"<application>:admin"`.
pub fn application_role_admin(application: &str) -> String {
    format!("{application}{APPLICATION_ROLE_ADMIN_SUFFIX}")
}

/// A single `(type, value)` claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// Claim type → one or many values. Flattening preserves insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(Vec<Claim>);

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value; repeated `(type, value)` pairs are kept once.
    pub fn add(&mut self, claim_type: impl Into<String>, value: impl Into<String>) {
        let claim = Claim::new(claim_type, value);
        if !self.0.contains(&claim) {
            self.0.push(claim);
        }
    }

    pub fn values(&self, claim_type: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
            .collect()
    }

    pub fn contains(&self, claim_type: &str, value: &str) -> bool {
        self.0
            .iter()
            .any(|c| c.claim_type == claim_type && c.value == value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `(type, value)` pairs in the order they were added.
    pub fn flatten(&self) -> Vec<Claim> {
        self.0.clone()
    }
}

impl<K, V> FromIterator<(K, V)> for ClaimSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = ClaimSet::new();
        for (claim_type, value) in iter {
            set.add(claim_type, value);
        }
        set
    }
}

/// Expands a claim map such as `{"role": ["admin", "user"]}`.
impl From<&BTreeMap<String, Vec<String>>> for ClaimSet {
    fn from(value: &BTreeMap<String, Vec<String>>) -> Self {
        value
            .iter()
            .flat_map(|(claim_type, values)| values.iter().map(move |v| (claim_type.clone(), v.clone())))
            .collect()
    }
}

/// Assembles the claims describing one user.
#[derive(Debug, Clone)]
pub struct ClaimsBuilder {
    claims: ClaimSet,
}

impl ClaimsBuilder {
    /// Start from the user's own state: emits `locked` when the user is
    /// locked at `now`.
    pub fn for_user(user: &User, now: DateTime<Utc>) -> Self {
        let mut claims = ClaimSet::new();
        if user.is_locked(now) {
            claims.add(DomainClaimType::Locked.as_str(), "true");
        }
        Self { claims }
    }

    pub fn organization(mut self, organization: &Organization) -> Self {
        self.claims
            .add(DomainClaimType::Organization.as_str(), organization.name.clone());
        self
    }

    /// One `app:role` claim per role, valued `"<application>:<role>"`.
    pub fn application_roles(mut self, application: &str, roles: &[Role]) -> Self {
        for role in roles {
            self.claims.add(
                DomainClaimType::ApplicationRole.as_str(),
                application_role(application, &role.name),
            );
        }
        self
    }

    /// Stored claims; only live rows are emitted.
    pub fn stored_claims(mut self, stored: &[UserClaim]) -> Self {
        for claim in stored.iter().filter(|c| c.temporal().is_live()) {
            self.claims.add(claim.claim_type.clone(), claim.claim_value.clone());
        }
        self
    }

    pub fn build(self) -> ClaimSet {
        self.claims
    }
}
