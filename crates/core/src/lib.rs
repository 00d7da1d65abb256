//! `domainid-core`: foundation types for the domain identity directory.
//!
//! This crate contains **pure domain** primitives (no storage or transport
//! concerns): identifiers, the error taxonomy, temporal (system-versioned)
//! record metadata and optimistic-concurrency stamps.

pub mod concurrency;
pub mod entity;
pub mod error;
pub mod id;
pub mod temporal;

pub use concurrency::{ConcurrencyStamp, ExpectedStamp};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ApplicationId, OrganizationId, RoleId, UserId};
pub use temporal::{SysStatus, Temporal, TemporalRecord, sys_end_open};
