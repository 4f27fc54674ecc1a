//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use widen_core::UnitId;

/// Errors that can occur during arena operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// Requested capacity is zero or collides with the end-of-chain sentinel.
    InvalidCapacity {
        /// The rejected capacity.
        requested: u64,
    },
    /// The free-list is empty: every slot is in use.
    CapacityExceeded {
        /// Units requested by the failing operation.
        requested: usize,
        /// Capacity of the arena.
        capacity: usize,
    },
    /// A unit index outside `[0, capacity)`.
    OutOfRange {
        /// The rejected unit.
        unit: UnitId,
        /// Capacity of the arena.
        capacity: usize,
    },
    /// A path chain revisited a unit or ran past the arena's capacity.
    CorruptChain {
        /// The unit at which the walk stopped.
        unit: UnitId,
    },
    /// A path was requested with more positions than one chain may carry.
    PathTooLong {
        /// Number of positions requested.
        positions: usize,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCapacity { requested } => {
                write!(f, "invalid arena capacity {requested}")
            }
            Self::CapacityExceeded {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "arena capacity exceeded: requested {requested} units, capacity {capacity}"
                )
            }
            Self::OutOfRange { unit, capacity } => {
                write!(f, "unit {unit} out of range for capacity {capacity}")
            }
            Self::CorruptChain { unit } => write!(f, "corrupt path chain at unit {unit}"),
            Self::PathTooLong { positions } => {
                write!(f, "path of {positions} positions exceeds the chain limit")
            }
        }
    }
}

impl Error for ArenaError {}
