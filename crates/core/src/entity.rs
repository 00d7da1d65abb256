//! Entity trait: identity + continuity across versions.

/// Entity marker + minimal interface.
///
/// For temporal entities the key is the *business* key: every historical
/// version of the same logical entity shares it.
pub trait Entity {
    /// Strongly-typed entity key.
    type Key: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity key.
    fn key(&self) -> Self::Key;
}
