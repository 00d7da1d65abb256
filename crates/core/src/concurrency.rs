//! Optimistic concurrency tokens for directory writes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Opaque token regenerated on every write of a stamped entity (users, roles).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConcurrencyStamp(String);

impl ConcurrencyStamp {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConcurrencyStamp {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ConcurrencyStamp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Optimistic concurrency expectation for a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedStamp {
    /// Skip stamp checking (trusted or stamp-less writes).
    Any,
    /// Require the current version to carry exactly this stamp.
    Exact(ConcurrencyStamp),
}

impl ExpectedStamp {
    pub fn matches(&self, actual: Option<&ConcurrencyStamp>) -> bool {
        match self {
            ExpectedStamp::Any => true,
            ExpectedStamp::Exact(expected) => actual == Some(expected),
        }
    }

    pub fn check(&self, actual: Option<&ConcurrencyStamp>) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual:?})"
            )))
        }
    }
}
