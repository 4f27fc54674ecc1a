//! Reusable routine, extension, and save fixtures.
//!
//! - [`capacity_routine`] and [`deserialize_routine`] build host routines
//!   shaped the way the capacity targets expect;
//!   [`unanchored_deserialize_routine`] is one they do not match.
//! - [`MockExtension`] stands in for a loaded extension with its own
//!   routines and live instance.
//! - [`populated_arena`] and [`save_bytes`] build persisted states.

use std::sync::Arc;

use widen_arena::{ArenaCache, ArenaHolder, UnitArena, FLAG_READY};
use widen_core::{CapacityPlan, RoutineId};
use widen_engine::Extension;
use widen_patch::{ExceptionBlock, Instruction, Label, Op, Routine, RoutineTable};
use widen_save::{SaveError, SaveMetadata, SaveWriter};

/// A routine that loads `literal` inside a guarded block and returns it,
/// the shape of the host's size-dependent initializers.
pub fn capacity_routine(literal: i32) -> Routine {
    Routine::new(
        1,
        vec![
            Instruction::new(Op::LdcI4(literal)).with_block(ExceptionBlock::BeginTry),
            Instruction::new(Op::StLoc(0)),
            Instruction::new(Op::LdLoc(0))
                .with_label(Label(0))
                .with_block(ExceptionBlock::End),
            Instruction::new(Op::Ret),
        ],
    )
}

/// The host's deserializer: computes `4096 << 6`, adjusts it down to
/// `original`, stores it in local 2 and returns it.
pub fn deserialize_routine(original: u32) -> Routine {
    let mut ops = vec![Op::LdcI4(4096), Op::LdcI4(6), Op::Shl];
    let excess = i64::from(CapacityPlan::DEFAULT_ORIGINAL) - i64::from(original);
    if excess != 0 {
        ops.push(Op::LdcI4(excess as i32));
        ops.push(Op::Sub);
    }
    ops.extend([Op::StLoc(2), Op::LdLoc(2), Op::Ret]);
    Routine::from_ops(3, ops)
}

/// A deserializer from a different host build: it keeps the record
/// count in local 1, so the splice's end anchor is missing.
pub fn unanchored_deserialize_routine(original: u32) -> Routine {
    Routine::from_ops(3, [Op::LdcI4(original as i32), Op::StLoc(1), Op::LdLoc(1), Op::Ret])
}

/// Routines of a host whose arena holds `original` units.
pub fn host_routines(original: u32) -> RoutineTable {
    host_routines_with(original, deserialize_routine(original))
}

/// Routines of a host whose arena holds `original` units, with
/// `deserialize` as its deserializer.
pub fn host_routines_with(original: u32, deserialize: Routine) -> RoutineTable {
    let literal = original as i32;
    let table = RoutineTable::new(widen_engine::HOST_MODULE);
    for (owner, member) in [
        ("PathFind", "Awake"),
        ("PathFind", "PathFindImplementation"),
        ("PathManager", "Awake"),
        ("PathManager", "ReleasePath"),
    ] {
        table.define(RoutineId::new(owner, member), capacity_routine(literal));
    }
    table.define(RoutineId::new("PathManager.Data", "Deserialize"), deserialize);
    table
}

// ── MockExtension ──────────────────────────────────────────────────

/// An extension with its own routine table and optional live instance.
pub struct MockExtension {
    pub name: String,
    pub routines: Arc<RoutineTable>,
    pub instance: Option<Arc<ArenaCache>>,
}

impl MockExtension {
    /// An empty extension with a live instance.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            routines: Arc::new(RoutineTable::new(name.clone())),
            instance: Some(Arc::new(ArenaCache::new(format!("{name}/instance")))),
            name,
        }
    }

    /// The traffic extension with all four capacity routines intact.
    pub fn traffic_manager(original: u32) -> Self {
        let mut ext = Self::new(widen_engine::TRAFFIC_MANAGER);
        for (owner, member) in [
            ("CustomPathFind", "Awake"),
            ("CustomPathFind", "PathFindImplementation"),
            ("CustomPathManager", "CustomReleasePath"),
            ("CustomPathManager", "UpdateWithPathManagerValues"),
        ] {
            ext.define(owner, member, capacity_routine(original as i32));
        }
        ext
    }

    /// Define or replace one routine.
    ///
    /// Tables never redefine a routine, so a replacement rebuilds the
    /// table from the original streams. Call it before the extension is
    /// shared.
    pub fn define(&mut self, owner: &str, member: &str, routine: Routine) -> &mut Self {
        let id = RoutineId::new(owner, member);
        if !self.routines.contains(&id) {
            self.routines.define(id, routine);
            return self;
        }
        let table = RoutineTable::new(self.name.clone());
        for existing in self.routines.routine_ids() {
            if existing == id {
                continue;
            }
            if let Some(original) = self.routines.original(&existing) {
                table.define(existing, (*original).clone());
            }
        }
        table.define(id, routine);
        self.routines = Arc::new(table);
        self
    }

    /// Drop the live instance.
    pub fn without_instance(mut self) -> Self {
        self.instance = None;
        self
    }

    /// Capacity the live instance currently reads from.
    pub fn instance_capacity(&self) -> Option<usize> {
        self.instance.as_ref().and_then(|i| i.held_capacity())
    }
}

impl Extension for MockExtension {
    fn name(&self) -> &str {
        &self.name
    }

    fn routines(&self) -> Arc<RoutineTable> {
        Arc::clone(&self.routines)
    }

    fn live_instance(&self) -> Option<Arc<dyn ArenaHolder>> {
        self.instance
            .clone()
            .map(|i| i as Arc<dyn ArenaHolder>)
    }
}

// ── Saves ──────────────────────────────────────────────────────────

/// An arena of `capacity` slots with `paths` two-unit paths allocated.
///
/// Head units are marked ready; one in every three paths is released
/// again so the free-list is not a simple tail.
pub fn populated_arena(capacity: u32, paths: usize) -> UnitArena {
    let mut arena = match UnitArena::new(capacity) {
        Ok(arena) => arena,
        Err(e) => panic!("fixture arena of {capacity}: {e}"),
    };
    let mut heads = Vec::with_capacity(paths);
    for p in 0..paths {
        let positions: Vec<u32> = (0..20).map(|i| (p as u32) * 100 + i).collect();
        match arena.allocate_path(&positions) {
            Ok(head) => heads.push(head),
            Err(e) => panic!("fixture path {p}: {e}"),
        }
    }
    for (p, head) in heads.iter().enumerate() {
        if p % 3 == 2 {
            if let Err(e) = arena.release_path(*head) {
                panic!("fixture release {p}: {e}");
            }
        } else if let Some(unit) = arena.get_mut(*head) {
            unit.simulation_flags |= FLAG_READY;
        }
    }
    arena
}

/// Serialize `arena` with `metadata`.
pub fn save_bytes(arena: &UnitArena, metadata: Option<&SaveMetadata>) -> Result<Vec<u8>, SaveError> {
    let mut writer = SaveWriter::new(Vec::new(), metadata)?;
    writer.write_units(arena)?;
    writer.finish()
}

/// A save from an unmodified host: `original` records, no capacity
/// marker, and a metadata map holding an unrelated key.
pub fn vanilla_save(original: u32, paths: usize) -> Result<(Vec<u8>, UnitArena), SaveError> {
    let arena = populated_arena(original, paths);
    let mut metadata = SaveMetadata::new();
    metadata.set("User/Other Setting", true);
    let bytes = save_bytes(&arena, Some(&metadata))?;
    Ok((bytes, arena))
}
