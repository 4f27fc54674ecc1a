//! Benchmark profiles for the widen capacity-migration engine.
//!
//! - [`reference_profile`]: the host's real arena, 262144 units, factor 2
//! - [`loaded_arena`]: an arena as deserialization leaves it, before
//!   reconciliation

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use widen_arena::{ArenaError, UnitArena};
use widen_core::{CapacityPlan, UnitId};
use widen_save::{SaveError, SaveWriter};

/// The capacity plan of the unmodified host.
pub fn reference_profile() -> CapacityPlan {
    CapacityPlan::default()
}

/// An arena of `capacity` slots with one created unit every `stride`
/// slots in the first `populated` slots and an empty free-list, which is
/// the state a partial deserialization leaves behind.
pub fn loaded_arena(capacity: u32, populated: u32, stride: u32) -> Result<UnitArena, ArenaError> {
    let mut arena = UnitArena::new(capacity)?;
    for _ in 0..populated.min(capacity) {
        arena.create_unit()?;
    }
    for index in (0..populated.min(capacity)).filter(|i| i % stride.max(1) != 0) {
        arena.release_unit(UnitId(index))?;
    }
    arena.clear_unused();
    Ok(arena)
}

/// Serialize `arena` without metadata.
pub fn encode_arena(arena: &UnitArena) -> Result<Vec<u8>, SaveError> {
    let mut writer = SaveWriter::new(Vec::with_capacity(arena.capacity()), None)?;
    writer.write_units(arena)?;
    writer.finish()
}
