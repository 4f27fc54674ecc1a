//! Per-module routine tables: the indirection point patches act on.

use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use widen_core::RoutineId;

use crate::error::{ExecError, PatchError};
use crate::routine::{AccessorEnv, Routine};

struct Entry {
    original: Arc<Routine>,
    active: Arc<Routine>,
}

/// The patchable routines of one module (the host or an extension).
///
/// Callers never hold on to a routine's behaviour: they evaluate whatever
/// stream is active at the time of the call. Installing a stream changes
/// behaviour for every later call; the stream defined first is kept as
/// the original.
pub struct RoutineTable {
    module: String,
    entries: RwLock<IndexMap<RoutineId, Entry>>,
}

// Compile-time assertion: RoutineTable must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<RoutineTable>();
};

impl RoutineTable {
    /// Create an empty table for `module`.
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            entries: RwLock::new(IndexMap::new()),
        }
    }

    /// Name of the owning module.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Define a routine. Returns `false` if `id` is already defined.
    pub fn define(&self, id: RoutineId, routine: Routine) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&id) {
            return false;
        }
        let routine = Arc::new(routine);
        entries.insert(
            id,
            Entry {
                original: Arc::clone(&routine),
                active: routine,
            },
        );
        true
    }

    /// Whether `id` is defined.
    pub fn contains(&self, id: &RoutineId) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// The stream currently installed for `id`.
    pub fn active(&self, id: &RoutineId) -> Option<Arc<Routine>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|e| Arc::clone(&e.active))
    }

    /// The stream `id` was defined with.
    pub fn original(&self, id: &RoutineId) -> Option<Arc<Routine>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|e| Arc::clone(&e.original))
    }

    /// Whether the active stream differs from the original one.
    pub fn is_patched(&self, id: &RoutineId) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .is_some_and(|e| !Arc::ptr_eq(&e.active, &e.original))
    }

    /// Install `routine` as the active stream, returning the previous one.
    pub fn install(&self, id: &RoutineId, routine: Arc<Routine>) -> Result<Arc<Routine>, PatchError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get_mut(id).ok_or_else(|| PatchError::RoutineMissing {
            routine: id.clone(),
        })?;
        Ok(std::mem::replace(&mut entry.active, routine))
    }

    /// Reinstall the original stream. Returns whether anything changed.
    pub fn restore(&self, id: &RoutineId) -> Result<bool, PatchError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get_mut(id).ok_or_else(|| PatchError::RoutineMissing {
            routine: id.clone(),
        })?;
        if Arc::ptr_eq(&entry.active, &entry.original) {
            return Ok(false);
        }
        entry.active = Arc::clone(&entry.original);
        Ok(true)
    }

    /// Ids of all defined routines, in definition order.
    pub fn routine_ids(&self) -> Vec<RoutineId> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Evaluate the active stream of `id`.
    pub fn invoke(
        &self,
        id: &RoutineId,
        args: &[i64],
        env: &dyn AccessorEnv,
    ) -> Result<i64, ExecError> {
        // Clone the Arc so evaluation runs without holding the lock.
        let routine = self.active(id).ok_or_else(|| ExecError::UnknownRoutine {
            routine: id.clone(),
        })?;
        routine.evaluate(args, env)
    }
}

impl std::fmt::Debug for RoutineTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutineTable")
            .field("module", &self.module)
            .field("routines", &self.routine_ids())
            .finish()
    }
}
