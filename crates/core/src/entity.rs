//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Stored endorsements are entities; lot codes and allocation lines are values.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
