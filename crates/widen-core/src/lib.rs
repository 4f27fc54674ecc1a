//! Core types for the widen capacity-migration engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! identifiers and value types shared by the arena, patching, save-format
//! and engine crates: unit and routine IDs, the [`CapacityPlan`] that maps
//! an original arena capacity to its expanded size, and the per-load
//! [`MigrationDecision`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod capacity;
pub mod id;

pub use capacity::{CapacityPlan, MigrationDecision, PlanError};
pub use id::{RoutineId, UnitId};
