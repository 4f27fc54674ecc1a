//! Cumulative counters for the migration engine.
//!
//! [`MigrationMetrics`] is a plain snapshot; the coordinator updates its
//! own copy as hooks run and hands out clones.

/// Counters collected across load cycles.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationMetrics {
    /// Patches installed (host and extensions).
    pub patches_applied: u64,
    /// Patch attempts that failed to match their routine.
    pub patches_failed: u64,
    /// Patches reverted by rollback or a per-extension failure.
    pub patches_reverted: u64,
    /// Load cycles that reached allocation.
    pub load_cycles: u64,
    /// Reconciliation passes performed.
    pub reconcile_passes: u64,
    /// Slots returned to the free-list by reconciliation.
    pub slots_freed: u64,
    /// Slots force-released after failing the post-reconcile audit.
    pub slots_forced: u64,
    /// Level loads whose arena capacity did not match the decision.
    pub verification_failures: u64,
    /// Adoption tasks posted to the host queue.
    pub adoptions_posted: u64,
    /// Adoption tasks that reached a live extension instance.
    pub adoptions_run: u64,
}
