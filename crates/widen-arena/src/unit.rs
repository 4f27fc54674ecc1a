//! The unit record stored in each arena slot.
//!
//! A [`Unit`] holds a fixed-size block of path positions and a link to the
//! next unit of the same path. Long paths are chains of units. When a
//! unit is not in use, the same link field threads it into the arena's
//! free-list.

use widen_core::UnitId;

/// Number of path positions one unit can hold.
pub const POSITIONS_PER_UNIT: usize = 12;

/// Unit is allocated and part of a live path.
pub const FLAG_CREATED: u8 = 1;
/// Path search finished successfully.
pub const FLAG_READY: u8 = 4;
/// Path search finished without a route.
pub const FLAG_FAILED: u8 = 8;

/// One addressable element of the unit arena.
///
/// The zeroed record (`Unit::default()`) is an unused unit with no link,
/// which is the state every released unit is returned to before it
/// re-enters the free-list.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Unit {
    /// Lifecycle flags (`FLAG_*`).
    pub simulation_flags: u8,
    /// Pathfinder-specific flags, opaque to the arena.
    pub path_find_flags: u8,
    /// Number of valid entries in `positions`.
    pub position_count: u8,
    /// Number of owners referencing this path.
    pub reference_count: u8,
    /// Accumulated path length.
    pub length: f32,
    /// Packed path positions; only the first `position_count` are valid.
    pub positions: [u32; POSITIONS_PER_UNIT],
    /// Link to the next unit, stored as `index + 1`; zero means none.
    next_link: u32,
}

impl Unit {
    /// Whether this unit is in active use.
    pub fn is_created(&self) -> bool {
        self.simulation_flags & FLAG_CREATED != 0
    }

    /// The next unit in this unit's chain, if any.
    ///
    /// For created units this is the path chain; for unused units it is
    /// the next free slot.
    pub fn next_unit(&self) -> Option<UnitId> {
        self.next_link.checked_sub(1).map(UnitId)
    }

    /// Set or clear the chain link.
    pub fn set_next_unit(&mut self, next: Option<UnitId>) {
        self.next_link = next.map_or(0, |id| id.0 + 1);
    }

    /// Raw link value (`index + 1`, zero for none), as persisted.
    pub fn raw_link(&self) -> u32 {
        self.next_link
    }

    /// Restore a raw link value read from persisted state.
    pub fn set_raw_link(&mut self, raw: u32) {
        self.next_link = raw;
    }

    /// The valid positions of this unit.
    pub fn positions(&self) -> &[u32] {
        let count = (self.position_count as usize).min(POSITIONS_PER_UNIT);
        &self.positions[..count]
    }
}
