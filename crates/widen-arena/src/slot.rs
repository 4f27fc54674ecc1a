//! The canonical owner slot and the holders that cache its arena.
//!
//! [`ArenaSlot`] is the single process-wide owner of the unit arena. A
//! resize never mutates the arena in place: a new [`UnitArena`] is built
//! and swapped into the slot, and every [`ArenaHolder`] is handed the new
//! [`SharedArena`]. Readers that cloned the previous handle keep a valid
//! arena that nothing writes to any more.
//!
//! Holders do not pick up a replacement on their own. Each one must be
//! enumerated in a [`HolderSet`] so the migrator can reach it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;

use crate::arena::UnitArena;

/// Shared, lockable handle to one arena instance.
pub type SharedArena = Arc<RwLock<UnitArena>>;

/// Wrap an arena in a [`SharedArena`].
pub fn share(arena: UnitArena) -> SharedArena {
    Arc::new(RwLock::new(arena))
}

/// Read-lock an arena, recovering from a poisoned lock.
///
/// The arena holds plain records, so a panic in another lock holder does
/// not leave it unusable.
pub fn read_arena(arena: &SharedArena) -> RwLockReadGuard<'_, UnitArena> {
    arena.read().unwrap_or_else(PoisonError::into_inner)
}

/// Write-lock an arena, recovering from a poisoned lock.
pub fn write_arena(arena: &SharedArena) -> RwLockWriteGuard<'_, UnitArena> {
    arena.write().unwrap_or_else(PoisonError::into_inner)
}

struct SlotInner {
    current: RwLock<Option<SharedArena>>,
    generation: AtomicU64,
}

/// Single canonical owner of the active arena.
///
/// Cloning an `ArenaSlot` clones the handle, not the arena: all clones
/// observe the same replacement. Only the load coordinator replaces the
/// arena, once per load cycle; everything else treats the slot as
/// read-only.
#[derive(Clone)]
pub struct ArenaSlot {
    inner: Arc<SlotInner>,
}

// Compile-time assertion: ArenaSlot must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<ArenaSlot>();
};

impl ArenaSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SlotInner {
                current: RwLock::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Move `arena` into the slot and return the shared handle to it.
    pub fn replace(&self, arena: UnitArena) -> SharedArena {
        let shared = share(arena);
        self.install(Arc::clone(&shared));
        shared
    }

    /// Install an already-shared arena, returning the previous one.
    pub fn install(&self, arena: SharedArena) -> Option<SharedArena> {
        let mut current = self
            .inner
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let previous = current.replace(arena);
        self.inner.generation.fetch_add(1, Ordering::Release);
        previous
    }

    /// The arena currently owned by the slot.
    pub fn current(&self) -> Option<SharedArena> {
        self.inner
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Capacity of the current arena, if one is installed.
    pub fn capacity(&self) -> Option<usize> {
        self.current().map(|arena| read_arena(&arena).capacity())
    }

    /// Number of replacements performed so far.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// Whether `arena` is the instance currently in the slot.
    pub fn is_current(&self, arena: &SharedArena) -> bool {
        self.current()
            .is_some_and(|current| Arc::ptr_eq(&current, arena))
    }
}

impl Default for ArenaSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// A subsystem that caches its own copy of the arena reference.
///
/// Path workers cache the arena for their iteration loop; extensions
/// that replace the arena-owning subsystem keep theirs in private state.
/// `adopt` must re-derive any cached size from the new arena.
pub trait ArenaHolder: Send + Sync {
    /// Stable name used for diagnostics and registration.
    fn name(&self) -> &str;

    /// Replace the cached reference with `arena`.
    fn adopt(&self, arena: SharedArena);

    /// Capacity of the arena this holder currently reads from.
    fn held_capacity(&self) -> Option<usize>;
}

/// A holder that simply caches the handle and its capacity.
pub struct ArenaCache {
    name: String,
    cached: RwLock<Option<SharedArena>>,
}

impl ArenaCache {
    /// Create an empty cache.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cached: RwLock::new(None),
        }
    }

    /// The cached arena handle.
    pub fn arena(&self) -> Option<SharedArena> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ArenaHolder for ArenaCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn adopt(&self, arena: SharedArena) {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(arena);
    }

    fn held_capacity(&self) -> Option<usize> {
        self.arena().map(|arena| read_arena(&arena).capacity())
    }
}

/// Explicit enumeration of every holder of the arena reference.
#[derive(Default)]
pub struct HolderSet {
    holders: IndexMap<String, Arc<dyn ArenaHolder>>,
}

impl HolderSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a holder. Returns `false` if the name is already taken.
    pub fn register(&mut self, holder: Arc<dyn ArenaHolder>) -> bool {
        let name = holder.name().to_owned();
        if self.holders.contains_key(&name) {
            return false;
        }
        self.holders.insert(name, holder);
        true
    }

    /// Remove a holder by name.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn ArenaHolder>> {
        self.holders.shift_remove(name)
    }

    /// Number of registered holders.
    pub fn len(&self) -> usize {
        self.holders.len()
    }

    /// Whether no holders are registered.
    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    /// Registered holders in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ArenaHolder>> {
        self.holders.values()
    }

    /// Hand `arena` to every holder. Returns the number updated.
    pub fn adopt_all(&self, arena: &SharedArena) -> usize {
        for holder in self.holders.values() {
            holder.adopt(Arc::clone(arena));
        }
        self.holders.len()
    }

    /// Names of holders whose capacity differs from `capacity`.
    pub fn stale(&self, capacity: usize) -> Vec<String> {
        self.holders
            .values()
            .filter(|h| h.held_capacity() != Some(capacity))
            .map(|h| h.name().to_owned())
            .collect()
    }
}
