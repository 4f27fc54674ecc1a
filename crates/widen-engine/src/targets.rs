//! The routines that encode the host's capacity, and the extension
//! allow-list.

use widen_core::CapacityPlan;
use widen_patch::{Op, PatchTarget};

/// Module name of the host's routine table.
pub const HOST_MODULE: &str = "host";

/// Accessor the spliced deserializer calls for its record count.
pub const DESERIALIZE_SIZE_ACCESSOR: &str = "widen::deserialize_size";

/// The host computes its record count as `4096 << 6` between these
/// anchors before storing it in local 2.
const DESERIALIZE_START: Op = Op::LdcI4(4096);
const DESERIALIZE_END: Op = Op::StLoc(2);

/// Name of the allow-listed traffic extension.
pub const TRAFFIC_MANAGER: &str = "TrafficManager";

/// The host routines carrying the capacity literal, plus the splice of
/// the deserializer's record count.
pub fn host_targets(plan: &CapacityPlan) -> Vec<PatchTarget> {
    let original = literal(plan);
    vec![
        PatchTarget::literal("PathFind", "Awake", original),
        PatchTarget::literal("PathFind", "PathFindImplementation", original),
        PatchTarget::literal("PathManager", "Awake", original),
        PatchTarget::literal("PathManager", "ReleasePath", original),
        deserialize_target(),
    ]
}

/// The deserializer splice.
pub fn deserialize_target() -> PatchTarget {
    PatchTarget::splice(
        "PathManager.Data",
        "Deserialize",
        DESERIALIZE_START,
        DESERIALIZE_END,
        DESERIALIZE_SIZE_ACCESSOR,
    )
}

/// An extension that may be present, and the routines to patch in it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllowedExtension {
    /// Module name the extension registers under.
    pub name: String,
    /// Routines carrying the capacity literal.
    pub targets: Vec<PatchTarget>,
}

/// Extensions known to duplicate the host's capacity assumptions.
pub fn default_allow_list(plan: &CapacityPlan) -> Vec<AllowedExtension> {
    let original = literal(plan);
    vec![AllowedExtension {
        name: TRAFFIC_MANAGER.to_owned(),
        targets: vec![
            PatchTarget::literal("CustomPathFind", "Awake", original),
            PatchTarget::literal("CustomPathFind", "PathFindImplementation", original),
            PatchTarget::literal("CustomPathManager", "CustomReleasePath", original),
            PatchTarget::literal("CustomPathManager", "UpdateWithPathManagerValues", original),
        ],
    }]
}

// Plans from validated settings always fit; an original above i32::MAX
// cannot appear as a literal, so such targets will simply not match.
fn literal(plan: &CapacityPlan) -> i32 {
    i32::try_from(plan.original()).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use widen_patch::PatchKind;

    #[test]
    fn host_targets_cover_four_literals_and_the_splice() {
        let targets = host_targets(&CapacityPlan::default());
        assert_eq!(targets.len(), 5);
        let literals = targets
            .iter()
            .filter(|t| t.kind == PatchKind::Literal { original: 262_144 })
            .count();
        assert_eq!(literals, 4);
        assert!(targets.iter().all(|t| t.governs_capacity));
        assert_eq!(targets[4].routine.to_string(), "PathManager.Data::Deserialize");
    }

    #[test]
    fn allow_list_names_traffic_manager() {
        let list = default_allow_list(&CapacityPlan::default());
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, TRAFFIC_MANAGER);
        assert_eq!(list[0].targets.len(), 4);
    }
}
