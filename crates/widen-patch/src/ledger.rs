//! Record of applied patches, for skipping repeats and reverting.

use std::sync::Arc;

use tracing::{debug, info};
use widen_core::RoutineId;

use crate::error::PatchError;
use crate::patcher::ConstantPatcher;
use crate::routine::Routine;
use crate::table::RoutineTable;
use crate::target::PatchTarget;

/// Outcome of [`PatchLedger::apply`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The rewritten routine was installed.
    Applied,
    /// The target was already patched through this ledger.
    AlreadyApplied,
}

struct AppliedPatch {
    table: Arc<RoutineTable>,
    routine: RoutineId,
    previous: Arc<Routine>,
}

/// Every patch installed so far, in application order.
///
/// Reverting reinstalls the stream that was active before each patch, in
/// reverse order, so the tables end up exactly as they were.
#[derive(Default)]
pub struct PatchLedger {
    patcher: ConstantPatcher,
    applied: Vec<AppliedPatch>,
}

impl PatchLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite `target` in `table` and install the result.
    ///
    /// On error nothing is installed.
    pub fn apply(
        &mut self,
        table: &Arc<RoutineTable>,
        target: &PatchTarget,
        replacement: i32,
    ) -> Result<PatchOutcome, PatchError> {
        if self.is_applied(table.module(), &target.routine) {
            return Ok(PatchOutcome::AlreadyApplied);
        }
        let current = table
            .active(&target.routine)
            .ok_or_else(|| PatchError::RoutineMissing {
                routine: target.routine.clone(),
            })?;
        let patched = self.patcher.apply(&current, &target.kind, replacement)?;
        let previous = table.install(&target.routine, Arc::new(patched))?;
        debug!(module = table.module(), target = %target, replacement, "patch installed");
        self.applied.push(AppliedPatch {
            table: Arc::clone(table),
            routine: target.routine.clone(),
            previous,
        });
        Ok(PatchOutcome::Applied)
    }

    /// Whether `routine` of `module` has been patched through this ledger.
    pub fn is_applied(&self, module: &str, routine: &RoutineId) -> bool {
        self.applied
            .iter()
            .any(|p| p.table.module() == module && &p.routine == routine)
    }

    /// Number of patches currently installed.
    pub fn len(&self) -> usize {
        self.applied.len()
    }

    /// Whether no patches are installed.
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }

    /// Number of patches installed in `module`.
    pub fn count_for(&self, module: &str) -> usize {
        self.applied
            .iter()
            .filter(|p| p.table.module() == module)
            .count()
    }

    /// Revert every patch installed in `module`. Returns the number reverted.
    pub fn revert_module(&mut self, module: &str) -> usize {
        let (revert, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut self.applied)
            .into_iter()
            .partition(|p| p.table.module() == module);
        self.applied = keep;
        let reverted = restore(revert);
        if reverted > 0 {
            info!(module, reverted, "module patches reverted");
        }
        reverted
    }

    /// Revert every installed patch. Calling it again is a no-op.
    pub fn revert_all(&mut self) -> usize {
        let reverted = restore(std::mem::take(&mut self.applied));
        if reverted > 0 {
            info!(reverted, "all patches reverted");
        }
        reverted
    }
}

fn restore(patches: Vec<AppliedPatch>) -> usize {
    let mut reverted = 0;
    for patch in patches.into_iter().rev() {
        // The entry cannot disappear: tables never remove routines.
        if patch.table.install(&patch.routine, patch.previous).is_ok() {
            debug!(module = patch.table.module(), routine = %patch.routine, "patch reverted");
            reverted += 1;
        }
    }
    reverted
}

impl std::fmt::Debug for PatchLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.applied
                    .iter()
                    .map(|p| format!("{}/{}", p.table.module(), p.routine)),
            )
            .finish()
    }
}
