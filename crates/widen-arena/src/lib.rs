//! Unit arena storage for the widen capacity-migration engine.
//!
//! Provides the fixed-capacity [`UnitArena`] with its embedded free-list,
//! and the [`ArenaSlot`] that owns the active arena on behalf of the whole
//! process.
//!
//! # Architecture
//!
//! ```text
//! ArenaSlot (single canonical owner, swapped on resize)
//! └── SharedArena = Arc<RwLock<UnitArena>>
//!     ├── Unit[capacity]       (records, zeroed on release)
//!     └── free-list            (threaded through unused records' links)
//! HolderSet (every subsystem caching a SharedArena, enumerated explicitly)
//! ```
//!
//! Capacity is immutable. Growing the pool means building a new
//! `UnitArena` and installing it through the slot; the previous instance
//! is never resized in place.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod error;
pub mod slot;
pub mod unit;

pub use arena::{ArenaAudit, UnitArena};
pub use error::ArenaError;
pub use slot::{read_arena, share, write_arena, ArenaCache, ArenaHolder, ArenaSlot, HolderSet, SharedArena};
pub use unit::{Unit, FLAG_CREATED, FLAG_FAILED, FLAG_READY, POSITIONS_PER_UNIT};
