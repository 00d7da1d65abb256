//! `domainid-directory`: users, roles, organizations and applications,
//! and the resolvers that answer who holds what where.
//!
//! This crate is intentionally decoupled from any particular storage engine:
//! resolvers run against the capability-based [`DirectoryStore`] contract.

pub mod claims;
pub mod models;
pub mod pagination;
pub mod patch;
pub mod query;
pub mod resolver;
pub mod store;

pub use claims::{Claim, ClaimSet, ClaimsBuilder, DomainClaimType};
pub use models::{
    Application, Organization, Role, RoleClaim, User, UserClaim, UserLogin, UserRole, UserToken,
    normalize,
};
pub use pagination::{Page, PageRequest, Paging};
pub use patch::{FieldError, Patch, PatchDocument, PatchOptions, Update};
pub use query::{
    ApplicationFilter, ApplicationRef, OrganizationFilter, OrganizationRef, RoleProjection,
    RowWindow, UserFilter, UserPredicate, UserProjection,
};
pub use resolver::{MembershipResolver, RoleResolver};
pub use store::{Capability, DirectoryStore, StoreCapabilities};
