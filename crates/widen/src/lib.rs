//! widen: capacity migration and live routine patching for fixed-size
//! unit arenas.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all widen sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use widen::prelude::*;
//!
//! // A host whose arena holds 64 units and whose allocator hard-codes it.
//! let routines = Arc::new(RoutineTable::new(HOST_MODULE));
//! routines.define(
//!     RoutineId::new("PathManager", "Awake"),
//!     Routine::from_ops(0, [Op::LdcI4(64), Op::Ret]),
//! );
//! let slot = ArenaSlot::new();
//!
//! let mut coordinator = LoadSequenceCoordinator::new(
//!     MigrationSettings::default(),
//!     64,
//!     HostBindings {
//!         routines: Arc::clone(&routines),
//!         slot: slot.clone(),
//!         holders: HolderSet::new(),
//!         queue: TaskQueue::new(),
//!         extensions: ExtensionRegistry::new(),
//!     },
//! )
//! .unwrap();
//!
//! coordinator.on_startup().unwrap();
//! coordinator.on_allocate(None).unwrap();
//! let mut metadata = None;
//! let outcome = coordinator.on_level_loaded(&mut metadata).unwrap();
//!
//! assert_eq!(outcome, VerificationOutcome::Success);
//! assert_eq!(slot.capacity(), Some(128));
//! assert!(is_expanded(metadata.as_ref()));
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `widen-core` | IDs, capacity plan, migration decision |
//! | [`arena`] | `widen-arena` | Unit arena, owner slot, holders |
//! | [`patch`] | `widen-patch` | Routines, routine tables, patcher, ledger |
//! | [`save`] | `widen-save` | Binary save format |
//! | [`engine`] | `widen-engine` | Load-sequence coordination, settings, logging |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and IDs (`widen-core`).
pub use widen_core as types;

/// Unit arena and reference ownership (`widen-arena`).
///
/// [`arena::ArenaSlot`] is the canonical owner; [`arena::HolderSet`]
/// enumerates every cached copy.
pub use widen_arena as arena;

/// Patchable routines (`widen-patch`).
pub use widen_patch as patch;

/// Binary save format (`widen-save`).
pub use widen_save as save;

/// Load-sequence coordination (`widen-engine`).
///
/// [`engine::LoadSequenceCoordinator`] drives a migration per load cycle;
/// [`engine::logging::init`] installs the log subscriber.
pub use widen_engine as engine;

/// Common imports for typical widen usage.
///
/// ```rust
/// use widen::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use widen_core::{CapacityPlan, MigrationDecision, RoutineId, UnitId};

    // Arena
    pub use widen_arena::{ArenaCache, ArenaHolder, ArenaSlot, HolderSet, SharedArena, UnitArena};

    // Routines
    pub use widen_patch::{Accessors, Op, Routine, RoutineTable};

    // Saves
    pub use widen_save::{SaveMetadata, SaveReader, SaveWriter};

    // Errors
    pub use widen_engine::{ConfigError, MigrationError};
    pub use widen_patch::{ExecError, PatchError};
    pub use widen_save::SaveError;

    // Engine
    pub use widen_engine::{
        is_expanded, Extension, ExtensionRegistry, HostBindings, LoadSequenceCoordinator,
        LoadState, MigrationMetrics, MigrationSettings, TaskQueue, VerificationOutcome,
        HOST_MODULE,
    };
}
