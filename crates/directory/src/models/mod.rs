//! Directory entities.
//!
//! Plain records connected by explicit foreign-key fields. Every entity
//! carries a [`TemporalRecord`](domainid_core::TemporalRecord); the business
//! key returned by [`Entity::key`](domainid_core::Entity::key) is shared by
//! all versions of one logical entity.

mod application;
mod associations;
mod organization;
mod role;
mod user;

pub use application::Application;
pub use associations::{RoleClaim, UserClaim, UserLogin, UserRole, UserToken};
pub use organization::Organization;
pub use role::Role;
pub use user::User;

/// Free-form properties carried by root entities.
pub type PropertyBag = serde_json::Map<String, serde_json::Value>;

/// Lookup normalization for names, user names and emails (upper-invariant).
pub fn normalize(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Implements [`Temporal`](domainid_core::Temporal) for a struct with a
/// `temporal: TemporalRecord` field.
macro_rules! impl_temporal {
    ($t:ty, $kind:literal) => {
        impl domainid_core::Temporal for $t {
            const KIND: &'static str = $kind;

            fn temporal(&self) -> &domainid_core::TemporalRecord {
                &self.temporal
            }

            fn temporal_mut(&mut self) -> &mut domainid_core::TemporalRecord {
                &mut self.temporal
            }
        }
    };
    ($t:ty, $kind:literal, stamped) => {
        impl domainid_core::Temporal for $t {
            const KIND: &'static str = $kind;

            fn temporal(&self) -> &domainid_core::TemporalRecord {
                &self.temporal
            }

            fn temporal_mut(&mut self) -> &mut domainid_core::TemporalRecord {
                &mut self.temporal
            }

            fn concurrency_stamp(&self) -> Option<&domainid_core::ConcurrencyStamp> {
                Some(&self.concurrency_stamp)
            }

            fn refresh_concurrency_stamp(&mut self) {
                self.concurrency_stamp = domainid_core::ConcurrencyStamp::new();
            }
        }
    };
}

pub(crate) use impl_temporal;
