//! Read-only resolvers over a [`DirectoryStore`](crate::DirectoryStore).
//!
//! Resolvers are stateless: each call is one self-contained read, validated
//! and capability-checked before the store is touched, and abandoned as soon
//! as the caller's [`CancellationToken`] fires.

mod membership;
mod roles;

use std::future::Future;

use tokio_util::sync::CancellationToken;

use domainid_core::{DomainError, DomainResult};

pub use membership::MembershipResolver;
pub use roles::RoleResolver;

/// Run `fut` unless `cancel` fires first.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> DomainResult<T>
where
    F: Future<Output = DomainResult<T>>,
{
    if cancel.is_cancelled() {
        return Err(DomainError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DomainError::Cancelled),
        result = fut => result,
    }
}
