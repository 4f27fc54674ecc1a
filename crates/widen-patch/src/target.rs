//! Statically enumerated patch targets.

use std::fmt;

use widen_core::RoutineId;

use crate::instr::Op;

/// How a target routine is rewritten.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchKind {
    /// Replace the single `ldc.i4 original` with the new capacity.
    Literal {
        /// The literal the routine is expected to contain once.
        original: i32,
    },
    /// Replace `[start, end)` with a call to `accessor`.
    Splice {
        /// First replaced instruction.
        start: Op,
        /// First preserved instruction after the replaced range.
        end: Op,
        /// Accessor the replacement calls.
        accessor: String,
    },
}

/// One routine to patch, and how.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchTarget {
    /// The routine.
    pub routine: RoutineId,
    /// The rewrite.
    pub kind: PatchKind,
    /// Whether a failure leaves the owning module inconsistent with the
    /// arena capacity.
    pub governs_capacity: bool,
}

impl PatchTarget {
    /// A capacity-governing literal target.
    pub fn literal(owner: &str, member: &str, original: i32) -> Self {
        Self {
            routine: RoutineId::new(owner, member),
            kind: PatchKind::Literal { original },
            governs_capacity: true,
        }
    }

    /// A capacity-governing splice target.
    pub fn splice(owner: &str, member: &str, start: Op, end: Op, accessor: &str) -> Self {
        Self {
            routine: RoutineId::new(owner, member),
            kind: PatchKind::Splice {
                start,
                end,
                accessor: accessor.to_owned(),
            },
            governs_capacity: true,
        }
    }

    /// Mark the target as not governing capacity.
    pub fn auxiliary(mut self) -> Self {
        self.governs_capacity = false;
        self
    }
}

impl fmt::Display for PatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PatchKind::Literal { original } => write!(f, "{} (ldc.i4 {original})", self.routine),
            PatchKind::Splice { start, end, .. } => {
                write!(f, "{} ([{start}, {end}))", self.routine)
            }
        }
    }
}
