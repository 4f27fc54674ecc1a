//! Keeping allow-listed extensions in step with the host.
//!
//! Extensions are optional modules that duplicate the host's capacity
//! literals and cache their own arena reference. The synchronizer finds
//! the allow-listed ones through the [`ExtensionRegistry`], patches their
//! routines, and posts adoption of each new arena to the host's task
//! queue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use tracing::{debug, error, info, warn};
use widen_arena::{ArenaHolder, ArenaSlot};
use widen_patch::{PatchError, PatchLedger, PatchOutcome, RoutineTable};

use crate::metrics::MigrationMetrics;
use crate::queue::TaskQueue;
use crate::targets::AllowedExtension;

/// An optional module that may carry its own copy of the capacity.
pub trait Extension: Send + Sync {
    /// Module name; matched against the allow-list.
    fn name(&self) -> &str;

    /// The extension's patchable routines.
    fn routines(&self) -> Arc<RoutineTable>;

    /// The running instance caching the arena, if it has started.
    fn live_instance(&self) -> Option<Arc<dyn ArenaHolder>>;
}

/// Modules currently loaded alongside the host.
///
/// Cloning shares the registry.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    loaded: Arc<RwLock<IndexMap<String, Arc<dyn Extension>>>>,
}

impl ExtensionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a loaded extension, replacing any with the same name.
    pub fn register(&self, extension: Arc<dyn Extension>) {
        let name = extension.name().to_owned();
        self.loaded
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, extension);
    }

    /// Forget an extension.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Extension>> {
        self.loaded
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(name)
    }

    /// Look up a loaded extension by name.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Extension>> {
        self.loaded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

/// What synchronization did for one allow-listed extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtensionStatus {
    /// Not loaded. Not an error.
    Absent,
    /// Loaded and patched.
    Patched {
        /// Patches newly installed by this pass.
        applied: usize,
        /// Targets that were already patched.
        already: usize,
        /// Non-governing targets that failed to match.
        skipped: usize,
    },
    /// A capacity-governing target failed; the extension's patches were
    /// reverted.
    Failed {
        /// The failing target.
        target: String,
        /// Why it failed.
        error: PatchError,
    },
}

/// Per-extension outcome of a synchronization pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionReport {
    /// The extension.
    pub name: String,
    /// What happened.
    pub status: ExtensionStatus,
}

/// Outcome of [`ExtensionSynchronizer::synchronize`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// One entry per allow-listed extension, in allow-list order.
    pub extensions: Vec<ExtensionReport>,
}

impl SyncReport {
    /// Patches newly installed across all extensions.
    pub fn patch_count(&self) -> usize {
        self.extensions
            .iter()
            .map(|r| match r.status {
                ExtensionStatus::Patched { applied, .. } => applied,
                _ => 0,
            })
            .sum()
    }

    /// Status of one extension.
    pub fn status(&self, name: &str) -> Option<&ExtensionStatus> {
        self.extensions
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.status)
    }
}

/// Applies the capacity patch to allow-listed extensions and pushes new
/// arenas into their live instances.
pub struct ExtensionSynchronizer {
    allow_list: Vec<AllowedExtension>,
    registry: ExtensionRegistry,
    replacement: i32,
    adoptions_run: Arc<AtomicU64>,
}

impl ExtensionSynchronizer {
    /// Create a synchronizer writing `replacement` into matched literals.
    pub fn new(allow_list: Vec<AllowedExtension>, registry: ExtensionRegistry, replacement: i32) -> Self {
        Self {
            allow_list,
            registry,
            replacement,
            adoptions_run: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The registry consulted for loaded extensions.
    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Adoption tasks that reached a live instance so far.
    pub fn adoptions_run(&self) -> u64 {
        self.adoptions_run.load(Ordering::Relaxed)
    }

    /// Patch every allow-listed extension that is loaded.
    ///
    /// Targets already patched through `ledger` are skipped, so calling
    /// this on every detection is safe.
    pub fn synchronize(&self, ledger: &mut PatchLedger, metrics: &mut MigrationMetrics) -> SyncReport {
        let mut report = SyncReport::default();
        for allowed in &self.allow_list {
            let status = match self.registry.lookup(&allowed.name) {
                None => {
                    debug!(extension = %allowed.name, "extension not loaded");
                    ExtensionStatus::Absent
                }
                Some(extension) => self.patch_extension(allowed, &extension.routines(), ledger, metrics),
            };
            report.extensions.push(ExtensionReport {
                name: allowed.name.clone(),
                status,
            });
        }
        report
    }

    fn patch_extension(
        &self,
        allowed: &AllowedExtension,
        table: &Arc<RoutineTable>,
        ledger: &mut PatchLedger,
        metrics: &mut MigrationMetrics,
    ) -> ExtensionStatus {
        let (mut applied, mut already, mut skipped) = (0, 0, 0);
        for target in &allowed.targets {
            match ledger.apply(table, target, self.replacement) {
                Ok(PatchOutcome::Applied) => {
                    applied += 1;
                    metrics.patches_applied += 1;
                }
                Ok(PatchOutcome::AlreadyApplied) => already += 1,
                Err(e) => {
                    metrics.patches_failed += 1;
                    error!(extension = %allowed.name, target = %target, error = %e, "extension patch failed");
                    if target.governs_capacity {
                        let reverted = ledger.revert_module(table.module());
                        metrics.patches_reverted += reverted as u64;
                        return ExtensionStatus::Failed {
                            target: target.to_string(),
                            error: e,
                        };
                    }
                    skipped += 1;
                }
            }
        }
        if applied > 0 {
            info!(extension = %allowed.name, applied, "extension patched");
        }
        ExtensionStatus::Patched {
            applied,
            already,
            skipped,
        }
    }

    /// Post one adoption task per allow-listed extension that is loaded.
    ///
    /// Each task, when run, hands the arena then in `slot` to the
    /// extension's live instance. Returns the number of tasks posted.
    pub fn schedule_adoption(&self, queue: &TaskQueue, slot: &ArenaSlot) -> usize {
        let mut posted = 0;
        for allowed in &self.allow_list {
            if self.registry.lookup(&allowed.name).is_none() {
                continue;
            }
            let registry = self.registry.clone();
            let slot = slot.clone();
            let name = allowed.name.clone();
            let adoptions_run = Arc::clone(&self.adoptions_run);
            queue.post(move || {
                let Some(extension) = registry.lookup(&name) else {
                    debug!(extension = %name, "extension unloaded before adoption");
                    return;
                };
                let Some(instance) = extension.live_instance() else {
                    warn!(extension = %name, "no live instance to adopt the arena");
                    return;
                };
                let Some(arena) = slot.current() else {
                    warn!(extension = %name, "owner slot empty at adoption");
                    return;
                };
                instance.adopt(arena);
                adoptions_run.fetch_add(1, Ordering::Relaxed);
                info!(extension = %name, capacity = instance.held_capacity(), "extension adopted arena");
            });
            posted += 1;
        }
        posted
    }
}
