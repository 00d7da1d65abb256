use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use domainid_core::{Entity, OrganizationId, TemporalRecord};

use super::{PropertyBag, impl_temporal, normalize};

/// Owner of users. Names are unique after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub properties: PropertyBag,
    #[serde(flatten)]
    pub temporal: TemporalRecord,
}

impl Organization {
    pub fn new(name: impl Into<String>, actor: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: OrganizationId::new(),
            name: name.into().trim().to_string(),
            properties: PropertyBag::new(),
            temporal: TemporalRecord::opened(actor, at),
        }
    }

    pub fn normalized_name(&self) -> String {
        normalize(&self.name)
    }
}

impl Entity for Organization {
    type Key = OrganizationId;

    fn key(&self) -> Self::Key {
        self.id
    }
}

impl_temporal!(Organization, "organization");
