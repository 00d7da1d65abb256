use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use domainid_core::{ApplicationId, Entity, TemporalRecord};

use super::{PropertyBag, impl_temporal, normalize};

/// Scope of application roles. Names are unique after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub name: String,
    pub properties: PropertyBag,
    #[serde(flatten)]
    pub temporal: TemporalRecord,
}

impl Application {
    pub fn new(name: impl Into<String>, actor: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: ApplicationId::new(),
            name: name.into().trim().to_string(),
            properties: PropertyBag::new(),
            temporal: TemporalRecord::opened(actor, at),
        }
    }

    pub fn normalized_name(&self) -> String {
        normalize(&self.name)
    }
}

impl Entity for Application {
    type Key = ApplicationId;

    fn key(&self) -> Self::Key {
        self.id
    }
}

impl_temporal!(Application, "application");
