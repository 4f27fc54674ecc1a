//! Error types for patching and routine evaluation.

use std::error::Error;
use std::fmt;

use widen_core::RoutineId;

use crate::instr::{Label, Op};

/// Errors from rewriting or installing a routine.
///
/// A patch error means the routine's implementation no longer matches
/// the assumptions the patch was written against. The routine is left
/// unpatched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchError {
    /// The expected literal does not appear in the routine.
    TargetNotFound {
        /// The literal searched for.
        literal: i32,
    },
    /// The expected literal appears more than once.
    AmbiguousTarget {
        /// The literal searched for.
        literal: i32,
        /// Number of occurrences found.
        occurrences: usize,
    },
    /// A splice anchor is missing or not unique.
    AnchorNotFound {
        /// The anchor searched for.
        anchor: Op,
        /// Number of occurrences found.
        occurrences: usize,
    },
    /// The end anchor precedes the start anchor.
    AnchorOrder {
        /// Index of the start anchor.
        start: usize,
        /// Index of the end anchor.
        end: usize,
    },
    /// A splice would discard an instruction that a branch or exception
    /// region refers to.
    DanglingLabel {
        /// Index of the referenced instruction.
        index: usize,
        /// The labels it carries.
        labels: Vec<Label>,
    },
    /// The routine is not defined in the table.
    RoutineMissing {
        /// The missing routine.
        routine: RoutineId,
    },
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TargetNotFound { literal } => write!(f, "no ldc.i4 {literal} found"),
            Self::AmbiguousTarget {
                literal,
                occurrences,
            } => write!(
                f,
                "ldc.i4 {literal} found {occurrences} times, expected exactly once"
            ),
            Self::AnchorNotFound {
                anchor,
                occurrences,
            } => write!(
                f,
                "anchor `{anchor}` found {occurrences} times, expected exactly once"
            ),
            Self::AnchorOrder { start, end } => {
                write!(f, "end anchor at {end} precedes start anchor at {start}")
            }
            Self::DanglingLabel { index, labels } => {
                write!(f, "instruction {index} is referenced ({labels:?}) and cannot be removed")
            }
            Self::RoutineMissing { routine } => write!(f, "routine {routine} is not defined"),
        }
    }
}

impl Error for PatchError {}

/// Errors from evaluating a routine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecError {
    /// An instruction needed more operands than the stack held.
    StackUnderflow {
        /// Index of the failing instruction.
        pc: usize,
    },
    /// A branch targets a label no instruction carries.
    UnknownLabel {
        /// The missing label.
        label: Label,
    },
    /// Two instructions carry the same label.
    DuplicateLabel {
        /// The duplicated label.
        label: Label,
    },
    /// A local slot index is outside the routine's locals.
    LocalOutOfRange {
        /// The slot.
        slot: u16,
        /// Number of locals declared.
        locals: u16,
    },
    /// More arguments than declared locals.
    TooManyArguments {
        /// Arguments supplied.
        supplied: usize,
        /// Number of locals declared.
        locals: u16,
    },
    /// A call to an accessor that is not registered.
    UnknownAccessor {
        /// The accessor name.
        name: String,
    },
    /// Execution ran past the last instruction without `ret`.
    MissingReturn,
    /// The instruction budget ran out (likely an unbounded loop).
    FuelExhausted,
    /// The routine is not defined in the table.
    UnknownRoutine {
        /// The missing routine.
        routine: RoutineId,
    },
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackUnderflow { pc } => write!(f, "stack underflow at instruction {pc}"),
            Self::UnknownLabel { label } => write!(f, "branch to unknown label {label}"),
            Self::DuplicateLabel { label } => write!(f, "label {label} defined twice"),
            Self::LocalOutOfRange { slot, locals } => {
                write!(f, "local {slot} out of range ({locals} declared)")
            }
            Self::TooManyArguments { supplied, locals } => {
                write!(f, "{supplied} arguments supplied, {locals} locals declared")
            }
            Self::UnknownAccessor { name } => write!(f, "unknown accessor {name}"),
            Self::MissingReturn => write!(f, "execution ran past the end without ret"),
            Self::FuelExhausted => write!(f, "instruction budget exhausted"),
            Self::UnknownRoutine { routine } => write!(f, "routine {routine} is not defined"),
        }
    }
}

impl Error for ExecError {}
