//! Per-load capacity decision and its cycle-scoped cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;
use widen_core::{CapacityPlan, MigrationDecision};

/// Decides the capacity of a load cycle.
#[derive(Clone, Copy, Debug, Default)]
pub struct CapacityDecisionPolicy;

impl CapacityDecisionPolicy {
    /// Combine the persisted capacity flag with the configuration flag.
    ///
    /// A state saved expanded is always loaded expanded; otherwise the
    /// configuration decides.
    pub fn decide(&self, persisted_flag: bool, config_flag: bool) -> MigrationDecision {
        let decision = MigrationDecision {
            use_expanded_capacity: persisted_flag || config_flag,
            source_was_expanded: persisted_flag,
        };
        info!(
            expanded = decision.use_expanded_capacity,
            source_expanded = decision.source_was_expanded,
            "capacity decided"
        );
        decision
    }
}

struct CacheInner {
    decision: RwLock<Option<MigrationDecision>>,
    reads: AtomicU64,
}

/// The decision of the current load cycle, shared with accessors.
///
/// Cloning shares the cache. The coordinator stores a decision at the
/// start of each cycle; the deserialize-size accessor and the migrator
/// read it.
#[derive(Clone)]
pub struct DecisionCache {
    inner: Arc<CacheInner>,
}

impl DecisionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CacheInner {
                decision: RwLock::new(None),
                reads: AtomicU64::new(0),
            }),
        }
    }

    /// Store the decision for the cycle now starting.
    pub fn store(&self, decision: MigrationDecision) {
        *self
            .inner
            .decision
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(decision);
    }

    /// The cached decision, if one has been stored.
    pub fn get(&self) -> Option<MigrationDecision> {
        self.inner.reads.fetch_add(1, Ordering::Relaxed);
        *self
            .inner
            .decision
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of reads since creation.
    pub fn reads(&self) -> u64 {
        self.inner.reads.load(Ordering::Relaxed)
    }

    /// Number of records the host must deserialize under the cached
    /// decision. Without a decision the host's own count applies.
    pub fn deserialize_size(&self, plan: &CapacityPlan) -> u32 {
        self.get()
            .map_or(plan.original(), |d| plan.deserialize_size(d))
    }
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::new()
    }
}
