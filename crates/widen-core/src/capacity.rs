//! Capacity plans and per-load migration decisions.

use std::error::Error;
use std::fmt;

/// Maps the host's original arena capacity to its expanded capacity.
///
/// The expansion factor is a configuration parameter rather than a
/// hardcoded doubling, so further capacity tiers only need a different
/// plan. Validated at construction; immutable afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CapacityPlan {
    original: u32,
    factor: u32,
}

impl CapacityPlan {
    /// The host's built-in unit capacity.
    pub const DEFAULT_ORIGINAL: u32 = 262_144;

    /// Default expansion factor (double the original).
    pub const DEFAULT_FACTOR: u32 = 2;

    /// Largest capacity an arena can hold. `u32::MAX` is reserved as the
    /// end-of-chain sentinel.
    pub const MAX_CAPACITY: u32 = u32::MAX - 1;

    /// Create a plan, validating that both sizes are addressable.
    pub fn new(original: u32, factor: u32) -> Result<Self, PlanError> {
        if original == 0 {
            return Err(PlanError::ZeroCapacity);
        }
        if factor == 0 {
            return Err(PlanError::ZeroFactor);
        }
        match original.checked_mul(factor) {
            Some(expanded) if expanded <= Self::MAX_CAPACITY => Ok(Self { original, factor }),
            _ => Err(PlanError::Overflow { original, factor }),
        }
    }

    /// Original (unpatched) capacity.
    pub fn original(&self) -> u32 {
        self.original
    }

    /// Expansion factor.
    pub fn factor(&self) -> u32 {
        self.factor
    }

    /// Expanded capacity: `original * factor`.
    pub fn expanded(&self) -> u32 {
        // Cannot overflow: checked in `new`.
        self.original * self.factor
    }

    /// Arena capacity to allocate for a load cycle.
    pub fn capacity_for(&self, decision: MigrationDecision) -> u32 {
        if decision.use_expanded_capacity {
            self.expanded()
        } else {
            self.original
        }
    }

    /// Number of unit records present in the persisted state.
    ///
    /// A state saved under the expanded capacity carries `expanded()`
    /// records; any other state carries `original()`.
    pub fn deserialize_size(&self, decision: MigrationDecision) -> u32 {
        if decision.source_was_expanded {
            self.expanded()
        } else {
            self.original
        }
    }
}

impl Default for CapacityPlan {
    fn default() -> Self {
        Self {
            original: Self::DEFAULT_ORIGINAL,
            factor: Self::DEFAULT_FACTOR,
        }
    }
}

impl fmt::Display for CapacityPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x{} = {}",
            self.original,
            self.factor,
            self.expanded()
        )
    }
}

/// Errors from [`CapacityPlan::new`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlanError {
    /// The original capacity was zero.
    ZeroCapacity,
    /// The expansion factor was zero.
    ZeroFactor,
    /// `original * factor` exceeds [`CapacityPlan::MAX_CAPACITY`].
    Overflow {
        /// Requested original capacity.
        original: u32,
        /// Requested factor.
        factor: u32,
    },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity => write!(f, "original capacity must be at least 1"),
            Self::ZeroFactor => write!(f, "expansion factor must be at least 1"),
            Self::Overflow { original, factor } => write!(
                f,
                "expanded capacity {original} x {factor} exceeds {}",
                CapacityPlan::MAX_CAPACITY
            ),
        }
    }
}

impl Error for PlanError {}

/// Which capacity a load cycle uses, and what the persisted state was.
///
/// Produced once per load cycle by the decision policy and read at
/// least twice: to size the allocation, and to decide whether free-list
/// reconciliation is required after deserialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MigrationDecision {
    /// Whether the arena is allocated at the expanded capacity.
    pub use_expanded_capacity: bool,
    /// Whether the persisted state was already saved expanded.
    pub source_was_expanded: bool,
}

impl MigrationDecision {
    /// Whether the arena needs a post-load reconciliation pass.
    ///
    /// True when an unexpanded state is loaded into the expanded arena:
    /// deserialization only populates the first `original` slots and the
    /// free-list bookkeeping for the remainder must be rebuilt. At the
    /// original capacity the host's reader already covers every slot.
    pub fn requires_reconcile(&self) -> bool {
        self.use_expanded_capacity && !self.source_was_expanded
    }
}
