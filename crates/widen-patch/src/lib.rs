//! Patchable routines for the widen capacity-migration engine.
//!
//! Capacity assumptions live in compiled routines as integer literals.
//! This crate models those routines as instruction streams held in a
//! [`RoutineTable`] per module and rewrites them:
//!
//! - [`ConstantPatcher::replace_literal`] swaps one known literal for the
//!   expanded capacity.
//! - [`ConstantPatcher::splice`] replaces a computed range with a call to
//!   a named accessor.
//! - [`PatchLedger`] installs rewrites, skips repeats and reverts them.
//!
//! Rewrites are pure functions over [`Routine`]s; only installation into
//! a table changes behaviour, and every installation can be undone.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod instr;
pub mod ledger;
pub mod patcher;
pub mod routine;
pub mod table;
pub mod target;

pub use error::{ExecError, PatchError};
pub use instr::{ExceptionBlock, Instruction, Label, Op};
pub use ledger::{PatchLedger, PatchOutcome};
pub use patcher::ConstantPatcher;
pub use routine::{AccessorEnv, Accessors, Routine, DEFAULT_FUEL};
pub use table::RoutineTable;
pub use target::{PatchKind, PatchTarget};
