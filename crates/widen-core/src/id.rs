//! Strongly-typed identifiers.

use std::fmt;

/// Index of a unit record within a unit arena.
///
/// `UnitId(n)` addresses the n-th slot of the arena. Validity depends on
/// the capacity of the arena it is used against; the arena rejects
/// out-of-range IDs rather than the ID type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u32);

impl UnitId {
    /// The slot index as a `usize`, for buffer indexing.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for UnitId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies one compiled routine: the owning type plus the member name.
///
/// Routines of the host and of every extension live in per-module routine
/// tables keyed by this ID, e.g. `PathManager::Awake`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutineId {
    owner: String,
    member: String,
}

impl RoutineId {
    /// Create a routine ID from its owning type and member name.
    pub fn new(owner: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            member: member.into(),
        }
    }

    /// The fully-qualified owning type.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The member (method) name.
    pub fn member(&self) -> &str {
        &self.member
    }
}

impl fmt::Display for RoutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_id_index_matches_raw() {
        assert_eq!(UnitId(42).index(), 42);
        assert_eq!(UnitId::from(7), UnitId(7));
    }

    #[test]
    fn routine_id_display_joins_owner_and_member() {
        let id = RoutineId::new("PathManager", "Awake");
        assert_eq!(id.to_string(), "PathManager::Awake");
        assert_eq!(id.owner(), "PathManager");
        assert_eq!(id.member(), "Awake");
    }

    #[test]
    fn routine_ids_with_same_parts_are_equal() {
        let a = RoutineId::new("PathFind", "Awake");
        let b = RoutineId::new(String::from("PathFind"), "Awake");
        assert_eq!(a, b);
        assert_ne!(a, RoutineId::new("PathManager", "Awake"));
    }
}
