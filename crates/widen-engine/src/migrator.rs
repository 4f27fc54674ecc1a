//! Arena allocation, free-list reconciliation, and reference installation.
//!
//! A migration never grows an arena in place. [`ArenaMigrator::prepare`]
//! builds a fresh arena at the decided capacity, the host deserializes
//! into it, [`ArenaMigrator::reconcile`] rebuilds the free-list when the
//! source covered fewer slots, and [`ArenaMigrator::install_reference`]
//! publishes the result to the owner slot and every holder.

use std::sync::Arc;

use tracing::{info, warn};
use widen_arena::{share, ArenaSlot, HolderSet, SharedArena, UnitArena};
use widen_core::{CapacityPlan, MigrationDecision, UnitId};

use crate::error::MigrationError;

/// Result of a reconciliation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Slots returned to the free-list by the pass.
    pub freed: usize,
    /// Slots the post-pass audit found orphaned and force-released.
    pub forced: usize,
    /// Live (created) slots after the pass.
    pub live: usize,
}

/// Result of installing an arena.
#[derive(Clone, Debug)]
pub struct InstallReport {
    /// The installed arena.
    pub arena: SharedArena,
    /// Its capacity.
    pub capacity: usize,
    /// Number of holders that adopted it.
    pub holders: usize,
    /// Owner-slot generation after the swap.
    pub generation: u64,
}

/// Performs the arena side of a capacity migration.
#[derive(Clone, Copy, Debug)]
pub struct ArenaMigrator {
    plan: CapacityPlan,
}

impl ArenaMigrator {
    /// Create a migrator for `plan`.
    pub fn new(plan: CapacityPlan) -> Self {
        Self { plan }
    }

    /// The capacity plan.
    pub fn plan(&self) -> CapacityPlan {
        self.plan
    }

    /// Allocate a zeroed arena sized for `decision`.
    pub fn prepare(&self, decision: MigrationDecision) -> Result<UnitArena, MigrationError> {
        let capacity = self.plan.capacity_for(decision);
        let arena = UnitArena::new(capacity)?;
        info!(capacity, "arena prepared");
        Ok(arena)
    }

    /// Rebuild the free-list after deserializing an unexpanded source.
    ///
    /// Returns `None` without touching the arena when the source was
    /// already expanded. Otherwise every non-created slot is released
    /// through the arena's normal release path, and the result is
    /// audited. O(capacity).
    pub fn reconcile(
        &self,
        arena: &mut UnitArena,
        decision: MigrationDecision,
    ) -> Option<ReconcileReport> {
        if !decision.requires_reconcile() {
            return None;
        }
        arena.clear_unused();
        let mut freed = 0usize;
        for index in 0..arena.capacity() {
            let id = UnitId(index as u32);
            if arena.get(id).is_some_and(|u| !u.is_created()) && arena.release_unit(id).is_ok() {
                freed += 1;
            }
        }

        let audit = arena.audit();
        let mut forced = 0usize;
        for id in &audit.orphaned {
            warn!(unit = %id, "slot neither created nor free after reconcile; releasing");
            if arena.release_unit(*id).is_ok() {
                forced += 1;
            }
        }
        if audit.chain_broken || !audit.created_on_free_list.is_empty() {
            warn!(
                chain_broken = audit.chain_broken,
                created_on_free_list = audit.created_on_free_list.len(),
                "free-list inconsistent after reconcile"
            );
        }

        let report = ReconcileReport {
            freed,
            forced,
            live: arena.live_count(),
        };
        info!(
            freed = report.freed,
            forced = report.forced,
            live = report.live,
            "free-list reconciled"
        );
        Some(report)
    }

    /// Make `arena` the canonical arena and hand it to every holder.
    ///
    /// Holders adopt first; the owner slot is only swapped once all of
    /// them report the new capacity. If any holder does not, the holders
    /// are handed the slot's current arena back and the slot is left
    /// untouched. The previously installed arena is left as it was;
    /// readers still holding it see a consistent, no longer updated
    /// snapshot.
    pub fn install_reference(
        &self,
        slot: &ArenaSlot,
        arena: UnitArena,
        holders: &HolderSet,
    ) -> Result<InstallReport, MigrationError> {
        let capacity = arena.capacity();
        let shared = share(arena);
        let adopted = holders.adopt_all(&shared);
        let stale = holders.stale(capacity);
        if !stale.is_empty() {
            warn!(?stale, capacity, "holders refused the new arena; keeping the current one");
            if let Some(current) = slot.current() {
                holders.adopt_all(&current);
            }
            return Err(MigrationError::StaleHolder {
                holders: stale,
                capacity,
            });
        }
        slot.install(Arc::clone(&shared));
        info!(capacity, holders = adopted, "arena installed");
        Ok(InstallReport {
            arena: shared,
            capacity,
            holders: adopted,
            generation: slot.generation(),
        })
    }
}
