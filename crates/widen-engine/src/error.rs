//! Errors surfaced by the load-sequence hooks.

use std::error::Error;
use std::fmt;

use widen_arena::ArenaError;
use widen_core::RoutineId;
use widen_patch::PatchError;

use crate::coordinator::LoadState;

/// Errors from migration and load coordination.
#[derive(Clone, Debug, PartialEq)]
pub enum MigrationError {
    /// After loading, the arena in the owner slot does not have the
    /// capacity the cycle's decision called for. Every patch has been
    /// reverted when this is returned.
    AllocationVerificationFailed {
        /// Capacity the decision called for.
        expected: usize,
        /// Capacity found in the owner slot (0 if empty).
        actual: usize,
    },
    /// An expanded cycle found host capacity routines running their
    /// original streams. Every patch has been reverted when this is
    /// returned.
    CapacityRoutinesUnpatched {
        /// The unpatched routines.
        routines: Vec<RoutineId>,
    },
    /// Holders still report a different capacity after installation.
    StaleHolder {
        /// Names of the stale holders.
        holders: Vec<String>,
        /// Capacity of the installed arena.
        capacity: usize,
    },
    /// A hook was called in a state that does not accept it.
    UnexpectedState {
        /// The hook.
        hook: &'static str,
        /// The state the coordinator was in.
        state: LoadState,
    },
    /// Arena allocation or bookkeeping failed.
    Arena(ArenaError),
    /// A patch could not be installed.
    Patch(PatchError),
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationVerificationFailed { expected, actual } => write!(
                f,
                "arena capacity is {actual}, expected {expected}; patches reverted"
            ),
            Self::CapacityRoutinesUnpatched { routines } => {
                write!(f, "capacity routines left unpatched:")?;
                for routine in routines {
                    write!(f, " {routine}")?;
                }
                write!(f, "; patches reverted")
            }
            Self::StaleHolder { holders, capacity } => write!(
                f,
                "holders {holders:?} did not adopt the arena of capacity {capacity}"
            ),
            Self::UnexpectedState { hook, state } => {
                write!(f, "{hook} called in state {state}")
            }
            Self::Arena(e) => write!(f, "arena: {e}"),
            Self::Patch(e) => write!(f, "patch: {e}"),
        }
    }
}

impl Error for MigrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Arena(e) => Some(e),
            Self::Patch(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArenaError> for MigrationError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}

impl From<PatchError> for MigrationError {
    fn from(e: PatchError) -> Self {
        Self::Patch(e)
    }
}
