//! Integration test: full-size load scenarios.
//!
//! Drives a mock host at the real capacity (262144 units, factor 2)
//! through startup and load:
//!
//! - A vanilla save loaded with expansion enabled lands in a 524288-slot
//!   arena, data in the first half and the second half free.
//! - An expanded save is read straight into 524288 slots with no
//!   reconciliation pass, whatever the expand-on-load setting says.
//! - An allow-listed extension that is not loaded is skipped quietly.

use widen_arena::{read_arena, Unit, UnitArena};
use widen_core::CapacityPlan;
use widen_engine::{
    is_expanded, ExtensionStatus, LoadState, MigrationSettings, VerificationOutcome,
    TRAFFIC_MANAGER,
};
use widen_test_utils::fixtures::vanilla_save;
use widen_test_utils::MockHost;

const ORIGINAL: u32 = CapacityPlan::DEFAULT_ORIGINAL;
const EXPANDED: usize = 2 * ORIGINAL as usize;

fn created(arena: &UnitArena) -> Vec<(usize, Unit)> {
    arena
        .units()
        .iter()
        .enumerate()
        .filter(|(_, u)| u.is_created())
        .map(|(i, u)| (i, *u))
        .collect()
}

// ── Vanilla save, expansion enabled ─────────────────────────────

#[test]
fn vanilla_save_expands_to_double_capacity() {
    let (bytes, source) = vanilla_save(ORIGINAL, 300).unwrap();
    let mut host = MockHost::new(ORIGINAL).unwrap();
    host.start().unwrap();

    assert_eq!(host.load(&bytes).unwrap(), VerificationOutcome::Success);

    let shared = host.arena().unwrap();
    let arena = read_arena(&shared);
    assert_eq!(arena.capacity(), EXPANDED);
    assert_eq!(created(&arena), created(&source));
    assert_eq!(arena.live_count(), source.live_count());
    assert_eq!(arena.free_len(), EXPANDED - source.live_count());
    let tail_free = arena
        .free_units()
        .filter(|id| id.index() >= ORIGINAL as usize)
        .count();
    assert_eq!(tail_free, ORIGINAL as usize);
    assert!(arena.audit().is_consistent());

    assert_eq!(host.coordinator.metrics().reconcile_passes, 1);
    assert!(is_expanded(host.metadata.as_ref()));
    assert_eq!(
        host.metadata.as_ref().and_then(|m| m.get("User/Other Setting")),
        Some(true)
    );
    assert_eq!(host.worker_capacities(), vec![Some(EXPANDED); 2]);
    assert_eq!(host.invoke("PathManager", "Awake"), Ok(EXPANDED as i64));
}

#[test]
fn unpopulated_full_size_migration_is_all_free() {
    let mut host = MockHost::new(ORIGINAL).unwrap();
    host.start().unwrap();
    let arena = UnitArena::new(ORIGINAL).unwrap();
    let bytes = widen_test_utils::fixtures::save_bytes(&arena, None).unwrap();

    host.load(&bytes).unwrap();
    let shared = host.arena().unwrap();
    let arena = read_arena(&shared);
    assert_eq!(arena.capacity(), EXPANDED);
    assert_eq!(arena.live_count(), 0);
    assert_eq!(arena.free_len(), EXPANDED);
}

// ── Expanded save ───────────────────────────────────────────────

fn expanded_save() -> Vec<u8> {
    let (bytes, _) = vanilla_save(ORIGINAL, 120).unwrap();
    let mut host = MockHost::new(ORIGINAL).unwrap();
    host.start().unwrap();
    host.load(&bytes).unwrap();
    host.save().unwrap()
}

#[test]
fn expanded_save_loads_without_reconcile() {
    let bytes = expanded_save();
    for expand_on_load in [true, false] {
        let settings = MigrationSettings {
            expand_on_load,
            ..MigrationSettings::default()
        };
        let mut host = MockHost::with_settings(ORIGINAL, settings).unwrap();
        host.start().unwrap();
        assert_eq!(host.load(&bytes).unwrap(), VerificationOutcome::Success);

        let decision = host.coordinator.decision().unwrap();
        assert!(decision.use_expanded_capacity);
        assert!(decision.source_was_expanded);
        assert_eq!(host.record_count().unwrap(), EXPANDED);

        assert_eq!(read_arena(&host.arena().unwrap()).capacity(), EXPANDED);
        let metrics = host.coordinator.metrics();
        assert_eq!(metrics.reconcile_passes, 0, "expand_on_load = {expand_on_load}");
        assert_eq!(metrics.slots_freed, 0);
        assert_eq!(
            host.coordinator.state(),
            LoadState::Verified(VerificationOutcome::Success)
        );
    }
}

// ── Absent extension ────────────────────────────────────────────

#[test]
fn absent_extension_is_skipped() {
    let mut host = MockHost::new(ORIGINAL).unwrap();
    let report = host.start().unwrap();

    assert_eq!(report.extensions.patch_count(), 0);
    assert_eq!(
        report.extensions.status(TRAFFIC_MANAGER),
        Some(&ExtensionStatus::Absent)
    );
    assert!(report.host_failed.is_empty());
    assert_eq!(host.coordinator.metrics().patches_failed, 0);
    assert_eq!(host.queue.pending(), 0);

    host.new_game().unwrap();
    assert_eq!(host.coordinator.metrics().adoptions_posted, 0);
}
