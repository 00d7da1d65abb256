use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use domainid_core::{ApplicationId, ConcurrencyStamp, Entity, RoleId, TemporalRecord};

use super::{PropertyBag, impl_temporal, normalize};

/// A role, scoped to one application or global when `application_id` is `None`.
///
/// # Invariants
/// - `(application_id, name)` is unique among application-scoped roles.
/// - `normalized_name` is globally unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub normalized_name: String,
    pub application_id: Option<ApplicationId>,
    pub concurrency_stamp: ConcurrencyStamp,
    pub properties: PropertyBag,
    #[serde(flatten)]
    pub temporal: TemporalRecord,
}

impl Role {
    pub fn new(
        name: impl Into<String>,
        application_id: Option<ApplicationId>,
        actor: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        let name = name.into().trim().to_string();
        Self {
            id: RoleId::new(),
            normalized_name: normalize(&name),
            name,
            application_id,
            concurrency_stamp: ConcurrencyStamp::new(),
            properties: PropertyBag::new(),
            temporal: TemporalRecord::opened(actor, at),
        }
    }

    /// Role valid across every application.
    pub fn is_global(&self) -> bool {
        self.application_id.is_none()
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)
    }
}

impl Entity for Role {
    type Key = RoleId;

    fn key(&self) -> Self::Key {
        self.id
    }
}

impl_temporal!(Role, "role", stamped);
