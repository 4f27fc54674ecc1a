//! Fixed-capacity unit arena with an embedded free-list.
//!
//! [`UnitArena`] is an index-addressed pool of [`Unit`] records. Unused
//! records form a singly-linked free-list threaded through their link
//! field; the arena tracks the list head, its length, and the live count.
//!
//! Invariant: every index in `[0, capacity)` is either created or present
//! exactly once in the free-list, and `live_count + free_len == capacity`.
//! Capacity never changes after construction. A larger arena is a new
//! `UnitArena`.

use widen_core::{CapacityPlan, UnitId};

use crate::error::ArenaError;
use crate::unit::{Unit, FLAG_CREATED, POSITIONS_PER_UNIT};

/// Longest path, in positions, that [`UnitArena::allocate_path`] accepts.
pub const MAX_PATH_POSITIONS: usize = u16::MAX as usize;

/// Index-addressed pool of unit records.
pub struct UnitArena {
    units: Box<[Unit]>,
    free_head: Option<UnitId>,
    free_len: u32,
    live_count: u32,
}

impl UnitArena {
    /// Allocate a zeroed arena with every slot on the free-list.
    ///
    /// The free-list is ordered so that allocation hands out ascending
    /// indices starting at 0.
    pub fn new(capacity: u32) -> Result<Self, ArenaError> {
        if capacity == 0 || capacity > CapacityPlan::MAX_CAPACITY {
            return Err(ArenaError::InvalidCapacity {
                requested: capacity as u64,
            });
        }
        let mut units = vec![Unit::default(); capacity as usize].into_boxed_slice();
        for (i, unit) in units.iter_mut().enumerate().take(capacity as usize - 1) {
            unit.set_next_unit(Some(UnitId(i as u32 + 1)));
        }
        Ok(Self {
            units,
            free_head: Some(UnitId(0)),
            free_len: capacity,
            live_count: 0,
        })
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.units.len()
    }

    /// Number of slots not on the free-list.
    pub fn live_count(&self) -> usize {
        self.live_count as usize
    }

    /// Number of slots on the free-list.
    pub fn free_len(&self) -> usize {
        self.free_len as usize
    }

    /// All records, in index order.
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Read one record.
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.index())
    }

    /// Mutable access to one record.
    ///
    /// Deserialization writes records through this. Writing a record does
    /// not touch the free-list; callers that change a slot's created state
    /// must restore the bookkeeping with [`clear_unused`](Self::clear_unused)
    /// and [`release_unit`](Self::release_unit).
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(id.index())
    }

    /// Take one unit from the free-list and mark it created.
    pub fn create_unit(&mut self) -> Result<UnitId, ArenaError> {
        let id = self.free_head.ok_or(ArenaError::CapacityExceeded {
            requested: 1,
            capacity: self.capacity(),
        })?;
        let unit = &mut self.units[id.index()];
        self.free_head = unit.next_unit();
        *unit = Unit::default();
        unit.simulation_flags = FLAG_CREATED;
        self.free_len -= 1;
        self.live_count += 1;
        Ok(id)
    }

    /// Zero a unit and push it onto the free-list.
    ///
    /// The caller must not release a unit that is already on the list;
    /// doing so would make the chain cyclic. Bookkeeping rebuilds call
    /// [`clear_unused`](Self::clear_unused) first.
    pub fn release_unit(&mut self, id: UnitId) -> Result<(), ArenaError> {
        let capacity = self.capacity();
        let unit = self
            .units
            .get_mut(id.index())
            .ok_or(ArenaError::OutOfRange { unit: id, capacity })?;
        *unit = Unit::default();
        unit.set_next_unit(self.free_head);
        self.free_head = Some(id);
        self.free_len += 1;
        self.live_count = self.live_count.saturating_sub(1);
        Ok(())
    }

    /// Forget the free-list: every slot counts as live until released.
    pub fn clear_unused(&mut self) {
        self.free_head = None;
        self.free_len = 0;
        self.live_count = self.units.len() as u32;
    }

    /// Walk the free-list from its head.
    ///
    /// The walk is bounded by the recorded list length, so a corrupted
    /// (cyclic) chain cannot loop forever.
    pub fn free_units(&self) -> FreeUnits<'_> {
        FreeUnits {
            arena: self,
            next: self.free_head,
            remaining: self.free_len,
        }
    }

    /// Check the slot/free-list invariant.
    ///
    /// O(capacity). Used after migrations, never on the steady-state path.
    pub fn audit(&self) -> ArenaAudit {
        let mut on_free_list = vec![false; self.units.len()];
        let mut observed = 0usize;
        let mut chain_broken = false;
        let mut cursor = self.free_head;
        while let Some(id) = cursor {
            match on_free_list.get_mut(id.index()) {
                Some(seen) if !*seen => {
                    *seen = true;
                    observed += 1;
                    cursor = self.units[id.index()].next_unit();
                }
                _ => {
                    chain_broken = true;
                    break;
                }
            }
        }

        let mut orphaned = Vec::new();
        let mut created_on_free_list = Vec::new();
        for (i, unit) in self.units.iter().enumerate() {
            match (unit.is_created(), on_free_list[i]) {
                (false, false) => orphaned.push(UnitId(i as u32)),
                (true, true) => created_on_free_list.push(UnitId(i as u32)),
                _ => {}
            }
        }

        ArenaAudit {
            orphaned,
            created_on_free_list,
            observed_free_len: observed,
            recorded_free_len: self.free_len(),
            chain_broken,
            counts_balanced: self.live_count() + self.free_len() == self.capacity(),
        }
    }

    /// Allocate a chain of units holding `positions`, returning its head.
    ///
    /// Fails without side effects if the free-list cannot supply the
    /// whole chain.
    pub fn allocate_path(&mut self, positions: &[u32]) -> Result<UnitId, ArenaError> {
        if positions.len() > MAX_PATH_POSITIONS {
            return Err(ArenaError::PathTooLong {
                positions: positions.len(),
            });
        }
        let needed = positions.len().div_ceil(POSITIONS_PER_UNIT).max(1);
        if needed > self.free_len() {
            return Err(ArenaError::CapacityExceeded {
                requested: needed,
                capacity: self.capacity(),
            });
        }

        let mut chunks = positions.chunks(POSITIONS_PER_UNIT);
        let head = self.create_unit()?;
        let mut current = head;
        let mut first = chunks.next().unwrap_or(&[]);
        loop {
            let unit = &mut self.units[current.index()];
            unit.positions[..first.len()].copy_from_slice(first);
            unit.position_count = first.len() as u8;
            match chunks.next() {
                Some(chunk) => {
                    let next = self.create_unit()?;
                    self.units[current.index()].set_next_unit(Some(next));
                    current = next;
                    first = chunk;
                }
                None => break,
            }
        }
        let length = positions.len() as f32;
        let head_unit = &mut self.units[head.index()];
        head_unit.reference_count = 1;
        head_unit.length = length;
        Ok(head)
    }

    /// Collect the positions of the path starting at `head`.
    pub fn path_positions(&self, head: UnitId) -> Result<Vec<u32>, ArenaError> {
        let mut out = Vec::new();
        let mut visited = 0usize;
        let mut cursor = Some(head);
        while let Some(id) = cursor {
            let unit = self.created_unit(id)?;
            visited += 1;
            if visited > self.capacity() {
                return Err(ArenaError::CorruptChain { unit: id });
            }
            out.extend_from_slice(unit.positions());
            cursor = unit.next_unit();
        }
        Ok(out)
    }

    /// Release every unit of the path starting at `head`.
    ///
    /// Each unit is zeroed before it re-enters the free-list, so no
    /// dangling chain survives the release. Returns the number of units
    /// freed.
    pub fn release_path(&mut self, head: UnitId) -> Result<usize, ArenaError> {
        let mut freed = 0usize;
        let mut cursor = Some(head);
        while let Some(id) = cursor {
            // A unit visited twice has already been released, so a cycle
            // surfaces here as a non-created unit.
            cursor = self.created_unit(id)?.next_unit();
            self.release_unit(id)?;
            freed += 1;
        }
        Ok(freed)
    }

    fn created_unit(&self, id: UnitId) -> Result<&Unit, ArenaError> {
        let unit = self.units.get(id.index()).ok_or(ArenaError::OutOfRange {
            unit: id,
            capacity: self.capacity(),
        })?;
        if !unit.is_created() {
            return Err(ArenaError::CorruptChain { unit: id });
        }
        Ok(unit)
    }
}

impl std::fmt::Debug for UnitArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitArena")
            .field("capacity", &self.capacity())
            .field("live_count", &self.live_count)
            .field("free_len", &self.free_len)
            .field("free_head", &self.free_head)
            .finish()
    }
}

/// Iterator over the free-list, see [`UnitArena::free_units`].
pub struct FreeUnits<'a> {
    arena: &'a UnitArena,
    next: Option<UnitId>,
    remaining: u32,
}

impl Iterator for FreeUnits<'_> {
    type Item = UnitId;

    fn next(&mut self) -> Option<UnitId> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.next?;
        self.remaining -= 1;
        self.next = self.arena.get(id).and_then(Unit::next_unit);
        Some(id)
    }
}

/// Result of [`UnitArena::audit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaAudit {
    /// Slots neither created nor on the free-list (leaked capacity).
    pub orphaned: Vec<UnitId>,
    /// Slots flagged created that are also on the free-list.
    pub created_on_free_list: Vec<UnitId>,
    /// Free-list length counted by walking the chain.
    pub observed_free_len: usize,
    /// Free-list length recorded by the arena.
    pub recorded_free_len: usize,
    /// The walk hit a revisited or out-of-range slot.
    pub chain_broken: bool,
    /// `live_count + free_len == capacity`.
    pub counts_balanced: bool,
}

impl ArenaAudit {
    /// Whether the arena satisfies its slot/free-list invariant.
    pub fn is_consistent(&self) -> bool {
        self.orphaned.is_empty()
            && self.created_on_free_list.is_empty()
            && !self.chain_broken
            && self.observed_free_len == self.recorded_free_len
            && self.counts_balanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_arena_is_all_free() {
        let arena = UnitArena::new(16).unwrap();
        assert_eq!(arena.capacity(), 16);
        assert_eq!(arena.live_count(), 0);
        assert_eq!(arena.free_len(), 16);
        let free: Vec<_> = arena.free_units().collect();
        assert_eq!(free.first(), Some(&UnitId(0)));
        assert_eq!(free.len(), 16);
        assert!(arena.audit().is_consistent());
    }

    #[test]
    fn zero_and_sentinel_capacity_rejected() {
        assert!(matches!(
            UnitArena::new(0),
            Err(ArenaError::InvalidCapacity { requested: 0 })
        ));
        assert!(UnitArena::new(u32::MAX).is_err());
    }

    #[test]
    fn create_hands_out_ascending_indices() {
        let mut arena = UnitArena::new(4).unwrap();
        assert_eq!(arena.create_unit().unwrap(), UnitId(0));
        assert_eq!(arena.create_unit().unwrap(), UnitId(1));
        assert_eq!(arena.live_count(), 2);
        assert_eq!(arena.free_len(), 2);
        assert!(arena.get(UnitId(0)).unwrap().is_created());
    }

    #[test]
    fn exhaustion_reports_capacity() {
        let mut arena = UnitArena::new(2).unwrap();
        arena.create_unit().unwrap();
        arena.create_unit().unwrap();
        assert_eq!(
            arena.create_unit(),
            Err(ArenaError::CapacityExceeded {
                requested: 1,
                capacity: 2
            })
        );
    }

    #[test]
    fn release_zeroes_and_reuses_slot() {
        let mut arena = UnitArena::new(4).unwrap();
        let id = arena.create_unit().unwrap();
        {
            let unit = arena.get_mut(id).unwrap();
            unit.positions[0] = 99;
            unit.position_count = 1;
            unit.length = 3.5;
        }
        arena.release_unit(id).unwrap();
        assert_eq!(arena.live_count(), 0);
        let unit = arena.get(id).unwrap();
        assert!(!unit.is_created());
        assert_eq!(unit.position_count, 0);
        assert_eq!(unit.length, 0.0);
        // Released slot is the new head.
        assert_eq!(arena.create_unit().unwrap(), id);
    }

    #[test]
    fn release_out_of_range_rejected() {
        let mut arena = UnitArena::new(4).unwrap();
        assert_eq!(
            arena.release_unit(UnitId(4)),
            Err(ArenaError::OutOfRange {
                unit: UnitId(4),
                capacity: 4
            })
        );
    }

    #[test]
    fn clear_unused_orphans_every_free_slot() {
        let mut arena = UnitArena::new(8).unwrap();
        arena.create_unit().unwrap();
        arena.clear_unused();
        assert_eq!(arena.live_count(), 8);
        assert_eq!(arena.free_len(), 0);
        let audit = arena.audit();
        assert_eq!(audit.orphaned.len(), 7);
        assert!(!audit.is_consistent());
    }

    #[test]
    fn audit_detects_created_unit_on_free_list() {
        let mut arena = UnitArena::new(4).unwrap();
        arena.get_mut(UnitId(2)).unwrap().simulation_flags = FLAG_CREATED;
        let audit = arena.audit();
        assert_eq!(audit.created_on_free_list, vec![UnitId(2)]);
        assert!(!audit.is_consistent());
    }

    #[test]
    fn path_round_trip_spans_units() {
        let mut arena = UnitArena::new(8).unwrap();
        let positions: Vec<u32> = (0..30).collect();
        let head = arena.allocate_path(&positions).unwrap();
        // 30 positions at 12 per unit = 3 units.
        assert_eq!(arena.live_count(), 3);
        assert_eq!(arena.path_positions(head).unwrap(), positions);
        assert_eq!(arena.get(head).unwrap().reference_count, 1);

        assert_eq!(arena.release_path(head).unwrap(), 3);
        assert_eq!(arena.live_count(), 0);
        assert!(arena.audit().is_consistent());
    }

    #[test]
    fn empty_path_uses_one_unit() {
        let mut arena = UnitArena::new(2).unwrap();
        let head = arena.allocate_path(&[]).unwrap();
        assert_eq!(arena.live_count(), 1);
        assert!(arena.path_positions(head).unwrap().is_empty());
    }

    #[test]
    fn path_larger_than_free_list_fails_cleanly() {
        let mut arena = UnitArena::new(2).unwrap();
        let positions: Vec<u32> = (0..40).collect();
        let err = arena.allocate_path(&positions).unwrap_err();
        assert_eq!(
            err,
            ArenaError::CapacityExceeded {
                requested: 4,
                capacity: 2
            }
        );
        assert_eq!(arena.live_count(), 0);
    }

    #[test]
    fn release_path_rejects_unused_head() {
        let mut arena = UnitArena::new(2).unwrap();
        assert_eq!(
            arena.release_path(UnitId(1)),
            Err(ArenaError::CorruptChain { unit: UnitId(1) })
        );
    }

    #[test]
    fn release_path_stops_on_cycle() {
        let mut arena = UnitArena::new(4).unwrap();
        let head = arena.allocate_path(&(0..20).collect::<Vec<_>>()).unwrap();
        let tail = arena.get(head).unwrap().next_unit().unwrap();
        arena.get_mut(tail).unwrap().set_next_unit(Some(head));
        assert_eq!(
            arena.release_path(head),
            Err(ArenaError::CorruptChain { unit: head })
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn alloc_release_keeps_invariant(
                ops in proptest::collection::vec((any::<bool>(), 0usize..40), 1..60),
            ) {
                let mut arena = UnitArena::new(32).unwrap();
                let mut paths = Vec::new();
                for (alloc, len) in ops {
                    if alloc || paths.is_empty() {
                        let positions: Vec<u32> = (0..len as u32).collect();
                        if let Ok(head) = arena.allocate_path(&positions) {
                            paths.push(head);
                        }
                    } else {
                        let head = paths.swap_remove(len % paths.len());
                        arena.release_path(head).unwrap();
                    }
                    prop_assert!(arena.audit().is_consistent());
                }
            }
        }
    }
}
