//! Entity trait: identity that survives state changes.

/// Records keyed by a stable identifier (users, cohorts, students).
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Human-readable resource name used in error messages ("User", "Cohort").
    const RESOURCE: &'static str;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
