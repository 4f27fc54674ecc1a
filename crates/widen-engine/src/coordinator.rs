//! Orders patching and migration against the host's load lifecycle.
//!
//! # Load cycle
//!
//! ```text
//! Idle ──on_startup──▶ PrePatchApplied ──on_allocate──▶ AllocationPrepared
//!                                                          │
//!                       ┌──────────── on_deserialized ◀────┤ (saved game)
//!                       ▼                                  │
//!                   Reconciled ──on_level_loaded──▶ Verified(Success | Failed)
//!                                     ▲                    │
//!                                     └────────────────────┘ (new game)
//! ```
//!
//! `Verified(Success)` accepts the next `on_allocate`: the host loads
//! several states per session. `Verified(Failed)` is terminal. Every
//! patch has been reverted and later hooks let the host run unmodified.
//! Besides a failed verification, a host capacity routine that cannot
//! be patched or an arena the holders refuse to adopt leads there too.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use widen_arena::{write_arena, ArenaSlot, HolderSet, SharedArena};
use widen_core::{CapacityPlan, MigrationDecision, RoutineId};
use widen_patch::{Accessors, PatchError, PatchLedger, PatchOutcome, PatchTarget, RoutineTable};
use widen_save::SaveMetadata;

use crate::config::{ConfigError, MigrationSettings};
use crate::decision::{CapacityDecisionPolicy, DecisionCache};
use crate::error::MigrationError;
use crate::extension::{ExtensionRegistry, ExtensionSynchronizer, SyncReport};
use crate::metadata::{is_expanded, mark_expanded};
use crate::metrics::MigrationMetrics;
use crate::migrator::{ArenaMigrator, ReconcileReport};
use crate::queue::TaskQueue;
use crate::targets::{default_allow_list, host_targets, AllowedExtension, DESERIALIZE_SIZE_ACCESSOR};

// ── States ─────────────────────────────────────────────────────────

/// Result of post-load verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The arena has the intended capacity.
    Success,
    /// The arena did not match; the coordinator has rolled back.
    Failed,
}

/// Position in the load cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing patched yet.
    Idle,
    /// Startup patches applied.
    PrePatchApplied,
    /// Decision made and arena installed for this cycle.
    AllocationPrepared,
    /// The host finished reading the save.
    DeserializationComplete,
    /// Free-list bookkeeping is consistent.
    Reconciled,
    /// Post-load verification ran.
    Verified(VerificationOutcome),
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::PrePatchApplied => write!(f, "PrePatchApplied"),
            Self::AllocationPrepared => write!(f, "AllocationPrepared"),
            Self::DeserializationComplete => write!(f, "DeserializationComplete"),
            Self::Reconciled => write!(f, "Reconciled"),
            Self::Verified(VerificationOutcome::Success) => write!(f, "Verified(Success)"),
            Self::Verified(VerificationOutcome::Failed) => write!(f, "Verified(Failed)"),
        }
    }
}

// ── Host bindings ──────────────────────────────────────────────────

/// Everything the coordinator needs from the host.
pub struct HostBindings {
    /// The host's patchable routines.
    pub routines: Arc<RoutineTable>,
    /// The canonical owner of the arena.
    pub slot: ArenaSlot,
    /// Host subsystems caching the arena reference.
    pub holders: HolderSet,
    /// The host's deferred task queue.
    pub queue: TaskQueue,
    /// Extensions loaded alongside the host.
    pub extensions: ExtensionRegistry,
}

/// Outcome of [`LoadSequenceCoordinator::on_startup`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StartupReport {
    /// Host patches installed.
    pub host_applied: usize,
    /// Host targets that failed, with the reason.
    pub host_failed: Vec<(RoutineId, PatchError)>,
    /// Extension synchronization.
    pub extensions: SyncReport,
}

// ── Coordinator ────────────────────────────────────────────────────

/// Drives one arena migration per load cycle.
pub struct LoadSequenceCoordinator {
    settings: MigrationSettings,
    plan: CapacityPlan,
    replacement: i32,
    state: LoadState,
    host_routines: Arc<RoutineTable>,
    host_targets: Vec<PatchTarget>,
    ledger: PatchLedger,
    policy: CapacityDecisionPolicy,
    decisions: DecisionCache,
    migrator: ArenaMigrator,
    slot: ArenaSlot,
    holders: HolderSet,
    queue: TaskQueue,
    extensions: ExtensionSynchronizer,
    metrics: MigrationMetrics,
}

impl LoadSequenceCoordinator {
    /// Create a coordinator for a host whose original capacity is
    /// `original`, with the default extension allow-list.
    pub fn new(
        settings: MigrationSettings,
        original: u32,
        host: HostBindings,
    ) -> Result<Self, ConfigError> {
        let plan = settings.plan_for(original)?;
        let allow_list = default_allow_list(&plan);
        Self::with_allow_list(settings, original, host, allow_list)
    }

    /// Create a coordinator with an explicit extension allow-list.
    pub fn with_allow_list(
        settings: MigrationSettings,
        original: u32,
        host: HostBindings,
        allow_list: Vec<AllowedExtension>,
    ) -> Result<Self, ConfigError> {
        let plan = settings.plan_for(original)?;
        let replacement = i32::try_from(plan.expanded()).map_err(|_| ConfigError::CapacityTooLarge {
            capacity: plan.expanded(),
        })?;
        info!(plan = %plan, expand_on_load = settings.expand_on_load, "coordinator created");
        Ok(Self {
            settings,
            plan,
            replacement,
            state: LoadState::Idle,
            host_targets: host_targets(&plan),
            host_routines: host.routines,
            ledger: PatchLedger::new(),
            policy: CapacityDecisionPolicy,
            decisions: DecisionCache::new(),
            migrator: ArenaMigrator::new(plan),
            slot: host.slot,
            holders: host.holders,
            queue: host.queue,
            extensions: ExtensionSynchronizer::new(allow_list, host.extensions, replacement),
            metrics: MigrationMetrics::default(),
        })
    }

    /// Register the accessors patched host routines call.
    pub fn register_accessors(&self, accessors: &mut Accessors) {
        let cache = self.decisions.clone();
        let plan = self.plan;
        accessors.register(DESERIALIZE_SIZE_ACCESSOR, move || {
            i64::from(cache.deserialize_size(&plan))
        });
    }

    // ── Hooks ──────────────────────────────────────────────────────

    /// Patch the host's capacity routines and any loaded extensions.
    ///
    /// A target that does not match is logged and skipped; the others
    /// are still applied. If it is one of the host's capacity routines,
    /// every patch is reverted and the coordinator degrades.
    pub fn on_startup(&mut self) -> Result<StartupReport, MigrationError> {
        if self.state != LoadState::Idle {
            return Err(self.unexpected("on_startup"));
        }
        let report = self.apply_patches();
        self.state = LoadState::PrePatchApplied;
        info!(
            host_applied = report.host_applied,
            host_failed = report.host_failed.len(),
            extension_patches = report.extensions.patch_count(),
            "startup patches applied"
        );
        let unpatched = self.unpatched_host_targets();
        if !unpatched.is_empty() {
            self.degrade(&MigrationError::CapacityRoutinesUnpatched { routines: unpatched });
        }
        Ok(report)
    }

    /// Decide this cycle's capacity and install a fresh arena of it.
    ///
    /// Called before the host deserializes, with the state's metadata.
    /// If the host's capacity routines cannot all be patched, or the
    /// expanded arena cannot be installed, every patch is reverted and
    /// an arena of the original capacity is returned instead.
    pub fn on_allocate(&mut self, metadata: Option<&SaveMetadata>) -> Result<SharedArena, MigrationError> {
        if self.is_degraded() {
            debug!("degraded; allocating original capacity");
            return self.allocate_original();
        }
        if !matches!(
            self.state,
            LoadState::PrePatchApplied | LoadState::Verified(VerificationOutcome::Success)
        ) {
            return Err(self.unexpected("on_allocate"));
        }

        let decision = self
            .policy
            .decide(is_expanded(metadata), self.settings.expand_on_load);
        self.decisions.store(decision);
        self.metrics.load_cycles += 1;

        // Routines must agree with the arena the cycle will use.
        if decision.use_expanded_capacity {
            if self.ledger.is_empty() {
                self.apply_patches();
            } else {
                let sync = self.extensions.synchronize(&mut self.ledger, &mut self.metrics);
                debug!(extension_patches = sync.patch_count(), "extensions synchronized");
            }
            let unpatched = self.unpatched_host_targets();
            if !unpatched.is_empty() {
                self.degrade(&MigrationError::CapacityRoutinesUnpatched { routines: unpatched });
                return self.allocate_original();
            }
        } else if !self.ledger.is_empty() {
            let reverted = self.ledger.revert_all();
            self.metrics.patches_reverted += reverted as u64;
            info!(reverted, "running this cycle at original capacity");
        }

        let installed = self
            .migrator
            .prepare(decision)
            .and_then(|arena| self.migrator.install_reference(&self.slot, arena, &self.holders));
        let installed = match installed {
            Ok(installed) => installed,
            Err(e) => {
                self.degrade(&e);
                return self.allocate_original();
            }
        };
        let posted = self.extensions.schedule_adoption(&self.queue, &self.slot);
        self.metrics.adoptions_posted += posted as u64;
        self.state = LoadState::AllocationPrepared;
        Ok(installed.arena)
    }

    /// Reconcile the free-list after the host has read the save.
    ///
    /// Returns `None` when no pass is needed: the source was already
    /// expanded, the cycle runs at the original capacity, or the
    /// coordinator is degraded.
    pub fn on_deserialized(&mut self) -> Result<Option<ReconcileReport>, MigrationError> {
        if self.is_degraded() {
            return Ok(None);
        }
        if self.state != LoadState::AllocationPrepared {
            return Err(self.unexpected("on_deserialized"));
        }
        let decision = self.current_decision()?;
        let Some(arena) = self.slot.current() else {
            return Err(MigrationError::AllocationVerificationFailed {
                expected: self.plan.capacity_for(decision) as usize,
                actual: 0,
            });
        };
        self.state = LoadState::DeserializationComplete;
        let report = self.migrator.reconcile(&mut write_arena(&arena), decision);
        if let Some(r) = report {
            self.metrics.reconcile_passes += 1;
            self.metrics.slots_freed += r.freed as u64;
            self.metrics.slots_forced += r.forced as u64;
        }
        self.state = LoadState::Reconciled;
        Ok(report)
    }

    /// Verify the arena after loading finished.
    ///
    /// On success the state is marked expanded (when the expanded
    /// capacity was used). An expanded cycle also requires every host
    /// capacity routine to still be patched. On mismatch every patch is
    /// reverted, the coordinator degrades, and the error is returned.
    pub fn on_level_loaded(
        &mut self,
        metadata: &mut Option<SaveMetadata>,
    ) -> Result<VerificationOutcome, MigrationError> {
        if self.is_degraded() {
            return Ok(VerificationOutcome::Failed);
        }
        if !matches!(self.state, LoadState::Reconciled | LoadState::AllocationPrepared) {
            return Err(self.unexpected("on_level_loaded"));
        }
        let decision = self.current_decision()?;
        let expected = self.plan.capacity_for(decision) as usize;
        let actual = self.slot.capacity().unwrap_or(0);
        let unpatched = if decision.use_expanded_capacity {
            self.unpatched_host_targets()
        } else {
            Vec::new()
        };
        info!(expected, actual, unpatched = unpatched.len(), "verifying arena capacity");

        if actual == expected && unpatched.is_empty() {
            if decision.use_expanded_capacity {
                mark_expanded(metadata);
            }
            self.state = LoadState::Verified(VerificationOutcome::Success);
            info!("load complete");
            return Ok(VerificationOutcome::Success);
        }

        let err = if actual != expected {
            MigrationError::AllocationVerificationFailed { expected, actual }
        } else {
            MigrationError::CapacityRoutinesUnpatched { routines: unpatched }
        };
        self.degrade(&err);
        Err(err)
    }

    /// Re-run extension synchronization, for an extension loaded after
    /// startup. Adoption of the current arena is posted as well.
    pub fn on_extensions_changed(&mut self) -> SyncReport {
        if self.is_degraded() || self.state == LoadState::Idle {
            return SyncReport::default();
        }
        let report = self.extensions.synchronize(&mut self.ledger, &mut self.metrics);
        if self.slot.current().is_some() {
            let posted = self.extensions.schedule_adoption(&self.queue, &self.slot);
            self.metrics.adoptions_posted += posted as u64;
        }
        report
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// Current load state.
    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Whether verification failed and the coordinator rolled back.
    pub fn is_degraded(&self) -> bool {
        self.state == LoadState::Verified(VerificationOutcome::Failed)
    }

    /// The capacity plan.
    pub fn plan(&self) -> CapacityPlan {
        self.plan
    }

    /// The settings in force.
    pub fn settings(&self) -> &MigrationSettings {
        &self.settings
    }

    /// The decision of the current cycle.
    pub fn decision(&self) -> Option<MigrationDecision> {
        self.decisions.get()
    }

    /// The shared decision cache.
    pub fn decisions(&self) -> &DecisionCache {
        &self.decisions
    }

    /// Number of patches currently installed.
    pub fn installed_patches(&self) -> usize {
        self.ledger.len()
    }

    /// Snapshot of the counters.
    pub fn metrics(&self) -> MigrationMetrics {
        MigrationMetrics {
            adoptions_run: self.extensions.adoptions_run(),
            ..self.metrics.clone()
        }
    }

    // ── Internals ──────────────────────────────────────────────────

    fn apply_patches(&mut self) -> StartupReport {
        let mut report = StartupReport::default();
        for target in &self.host_targets {
            match self.ledger.apply(&self.host_routines, target, self.replacement) {
                Ok(PatchOutcome::Applied) => {
                    report.host_applied += 1;
                    self.metrics.patches_applied += 1;
                }
                Ok(PatchOutcome::AlreadyApplied) => {}
                Err(e) => {
                    error!(target = %target, error = %e, "host patch failed; routine left unpatched");
                    self.metrics.patches_failed += 1;
                    report.host_failed.push((target.routine.clone(), e));
                }
            }
        }
        report.extensions = self.extensions.synchronize(&mut self.ledger, &mut self.metrics);
        report
    }

    /// Host capacity routines whose active stream is still the original.
    fn unpatched_host_targets(&self) -> Vec<RoutineId> {
        self.host_targets
            .iter()
            .filter(|t| t.governs_capacity && !self.host_routines.is_patched(&t.routine))
            .map(|t| t.routine.clone())
            .collect()
    }

    fn degrade(&mut self, cause: &MigrationError) {
        error!(error = %cause, "migration abandoned; reverting all patches");
        let reverted = self.ledger.revert_all();
        self.metrics.patches_reverted += reverted as u64;
        self.metrics.verification_failures += 1;
        self.state = LoadState::Verified(VerificationOutcome::Failed);
    }

    fn allocate_original(&mut self) -> Result<SharedArena, MigrationError> {
        let arena = self.migrator.prepare(MigrationDecision {
            use_expanded_capacity: false,
            source_was_expanded: false,
        })?;
        let installed = self.migrator.install_reference(&self.slot, arena, &self.holders)?;
        let posted = self.extensions.schedule_adoption(&self.queue, &self.slot);
        self.metrics.adoptions_posted += posted as u64;
        Ok(installed.arena)
    }

    fn current_decision(&self) -> Result<MigrationDecision, MigrationError> {
        self.decisions.get().ok_or(MigrationError::UnexpectedState {
            hook: "decision",
            state: self.state,
        })
    }

    fn unexpected(&self, hook: &'static str) -> MigrationError {
        warn!(hook, state = %self.state, "hook called out of order");
        MigrationError::UnexpectedState {
            hook,
            state: self.state,
        }
    }
}

impl fmt::Debug for LoadSequenceCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadSequenceCoordinator")
            .field("plan", &self.plan)
            .field("state", &self.state)
            .field("patches", &self.ledger)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use widen_arena::{read_arena, ArenaHolder, UnitArena};
    use widen_patch::{Op, Routine};

    const ORIGINAL: u32 = 32;

    fn host_table() -> Arc<RoutineTable> {
        host_table_with(Routine::from_ops(
            3,
            [Op::LdcI4(4096), Op::LdcI4(6), Op::Shl, Op::StLoc(2), Op::LdLoc(2), Op::Ret],
        ))
    }

    fn host_table_with(deserialize: Routine) -> Arc<RoutineTable> {
        let table = RoutineTable::new("host");
        for (owner, member) in [
            ("PathFind", "Awake"),
            ("PathFind", "PathFindImplementation"),
            ("PathManager", "Awake"),
            ("PathManager", "ReleasePath"),
        ] {
            table.define(
                RoutineId::new(owner, member),
                Routine::from_ops(0, [Op::LdcI4(ORIGINAL as i32), Op::Ret]),
            );
        }
        table.define(RoutineId::new("PathManager.Data", "Deserialize"), deserialize);
        Arc::new(table)
    }

    fn coordinator() -> (LoadSequenceCoordinator, Arc<RoutineTable>, ArenaSlot) {
        coordinator_with(host_table(), HolderSet::new())
    }

    fn coordinator_with(
        routines: Arc<RoutineTable>,
        holders: HolderSet,
    ) -> (LoadSequenceCoordinator, Arc<RoutineTable>, ArenaSlot) {
        let slot = ArenaSlot::new();
        let host = HostBindings {
            routines: Arc::clone(&routines),
            slot: slot.clone(),
            holders,
            queue: TaskQueue::new(),
            extensions: ExtensionRegistry::new(),
        };
        let c = LoadSequenceCoordinator::new(MigrationSettings::default(), ORIGINAL, host).unwrap();
        (c, routines, slot)
    }

    #[test]
    fn startup_patches_every_host_target() {
        let (mut c, routines, _) = coordinator();
        let report = c.on_startup().unwrap();
        assert_eq!(report.host_applied, 5);
        assert!(report.host_failed.is_empty());
        assert_eq!(c.state(), LoadState::PrePatchApplied);
        let awake = RoutineId::new("PathManager", "Awake");
        assert_eq!(routines.invoke(&awake, &[], &Accessors::new()), Ok(64));
    }

    #[test]
    fn hooks_out_of_order_are_rejected() {
        let (mut c, _, _) = coordinator();
        assert!(matches!(
            c.on_allocate(None),
            Err(MigrationError::UnexpectedState {
                hook: "on_allocate",
                state: LoadState::Idle
            })
        ));
        c.on_startup().unwrap();
        assert!(matches!(
            c.on_startup(),
            Err(MigrationError::UnexpectedState { .. })
        ));
        assert!(matches!(
            c.on_deserialized(),
            Err(MigrationError::UnexpectedState { .. })
        ));
    }

    #[test]
    fn new_game_cycle_marks_metadata() {
        let (mut c, _, slot) = coordinator();
        c.on_startup().unwrap();
        let arena = c.on_allocate(None).unwrap();
        assert_eq!(read_arena(&arena).capacity(), 64);
        let mut metadata = None;
        assert_eq!(
            c.on_level_loaded(&mut metadata),
            Ok(VerificationOutcome::Success)
        );
        assert!(is_expanded(metadata.as_ref()));
        assert_eq!(slot.capacity(), Some(64));
    }

    #[test]
    fn accessor_reports_cycle_size() {
        let (mut c, routines, _) = coordinator();
        let mut accessors = Accessors::new();
        c.register_accessors(&mut accessors);
        c.on_startup().unwrap();
        let deserialize = RoutineId::new("PathManager.Data", "Deserialize");

        c.on_allocate(None).unwrap();
        assert_eq!(routines.invoke(&deserialize, &[], &accessors), Ok(32));

        let mut marked = None;
        mark_expanded(&mut marked);
        c.on_level_loaded(&mut None).unwrap();
        c.on_allocate(marked.as_ref()).unwrap();
        assert_eq!(routines.invoke(&deserialize, &[], &accessors), Ok(64));
    }

    #[test]
    fn verification_failure_reverts_and_degrades() {
        let (mut c, routines, slot) = coordinator();
        let originals: Vec<_> = routines
            .routine_ids()
            .into_iter()
            .map(|id| (id.clone(), routines.active(&id).unwrap()))
            .collect();
        c.on_startup().unwrap();
        c.on_allocate(None).unwrap();
        c.on_deserialized().unwrap();
        slot.replace(UnitArena::new(ORIGINAL).unwrap());

        let err = c.on_level_loaded(&mut None).unwrap_err();
        assert_eq!(
            err,
            MigrationError::AllocationVerificationFailed {
                expected: 64,
                actual: 32
            }
        );
        assert!(c.is_degraded());
        assert_eq!(c.installed_patches(), 0);
        for (id, original) in originals {
            assert_eq!(*routines.active(&id).unwrap(), *original);
        }

        // Degraded: hooks pass through at original capacity.
        let arena = c.on_allocate(None).unwrap();
        assert_eq!(read_arena(&arena).capacity(), 32);
        assert_eq!(c.on_deserialized(), Ok(None));
        assert_eq!(c.on_level_loaded(&mut None), Ok(VerificationOutcome::Failed));
        assert_eq!(c.metrics().verification_failures, 1);
    }

    #[test]
    fn unpatchable_host_routine_degrades_at_startup() {
        let deserialize = RoutineId::new("PathManager.Data", "Deserialize");
        let routines = host_table_with(Routine::from_ops(
            3,
            [Op::LdcI4(ORIGINAL as i32), Op::StLoc(2), Op::LdLoc(2), Op::Ret],
        ));
        let (mut c, routines, slot) = coordinator_with(routines, HolderSet::new());

        let report = c.on_startup().unwrap();
        assert_eq!(report.host_applied, 4);
        assert_eq!(report.host_failed.len(), 1);
        assert_eq!(report.host_failed[0].0, deserialize);
        assert!(c.is_degraded());
        assert_eq!(c.installed_patches(), 0);
        for id in routines.routine_ids() {
            assert!(!routines.is_patched(&id), "{id} still patched");
        }

        let arena = c.on_allocate(None).unwrap();
        assert_eq!(read_arena(&arena).capacity(), 32);
        let mut metadata = None;
        assert_eq!(c.on_level_loaded(&mut metadata), Ok(VerificationOutcome::Failed));
        assert!(metadata.is_none());
        assert_eq!(slot.capacity(), Some(32));
    }

    #[test]
    fn routine_restored_mid_cycle_fails_verification() {
        let (mut c, routines, _) = coordinator();
        c.on_startup().unwrap();
        c.on_allocate(None).unwrap();
        let awake = RoutineId::new("PathFind", "Awake");
        routines.restore(&awake).unwrap();

        let mut metadata = None;
        let err = c.on_level_loaded(&mut metadata).unwrap_err();
        assert_eq!(
            err,
            MigrationError::CapacityRoutinesUnpatched {
                routines: vec![awake]
            }
        );
        assert!(metadata.is_none());
        assert!(c.is_degraded());
        assert_eq!(c.installed_patches(), 0);
        for id in routines.routine_ids() {
            assert!(!routines.is_patched(&id), "{id} still patched");
        }
    }

    struct Pinned;

    impl ArenaHolder for Pinned {
        fn name(&self) -> &str {
            "pinned"
        }

        fn adopt(&self, _arena: SharedArena) {}

        fn held_capacity(&self) -> Option<usize> {
            Some(ORIGINAL as usize)
        }
    }

    #[test]
    fn refused_adoption_falls_back_to_original_capacity() {
        let mut holders = HolderSet::new();
        holders.register(Arc::new(Pinned));
        let (mut c, routines, slot) = coordinator_with(host_table(), holders);
        c.on_startup().unwrap();

        let arena = c.on_allocate(None).unwrap();
        assert_eq!(read_arena(&arena).capacity(), 32);
        assert!(slot.is_current(&arena));
        assert!(c.is_degraded());
        assert_eq!(c.installed_patches(), 0);
        for id in routines.routine_ids() {
            assert!(!routines.is_patched(&id), "{id} still patched");
        }
        assert_eq!(c.on_deserialized(), Ok(None));
        assert_eq!(c.on_level_loaded(&mut None), Ok(VerificationOutcome::Failed));
        assert_eq!(c.metrics().verification_failures, 1);
    }

    #[test]
    fn original_capacity_cycle_runs_unpatched() {
        let routines = host_table();
        let host = HostBindings {
            routines: Arc::clone(&routines),
            slot: ArenaSlot::new(),
            holders: HolderSet::new(),
            queue: TaskQueue::new(),
            extensions: ExtensionRegistry::new(),
        };
        let settings = MigrationSettings {
            expand_on_load: false,
            ..MigrationSettings::default()
        };
        let mut c = LoadSequenceCoordinator::new(settings, ORIGINAL, host).unwrap();
        c.on_startup().unwrap();
        let arena = c.on_allocate(None).unwrap();
        assert_eq!(read_arena(&arena).capacity(), 32);
        assert_eq!(c.installed_patches(), 0);
        let mut metadata = None;
        assert_eq!(
            c.on_level_loaded(&mut metadata),
            Ok(VerificationOutcome::Success)
        );
        assert!(metadata.is_none());
    }
}
