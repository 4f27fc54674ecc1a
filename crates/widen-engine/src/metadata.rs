//! The persisted capacity flag.

use tracing::debug;
use widen_save::SaveMetadata;

/// Metadata key recording that a state was saved at expanded capacity.
pub const CAPACITY_MARKER_KEY: &str = "User/More PathUnits x2";

/// Whether the persisted state was saved at expanded capacity.
///
/// Absent map, absent key, and `false` all read as not expanded.
pub fn is_expanded(metadata: Option<&SaveMetadata>) -> bool {
    let expanded = metadata
        .and_then(|m| m.get(CAPACITY_MARKER_KEY))
        .unwrap_or(false);
    if metadata.is_none() {
        debug!("no persisted metadata map");
    }
    expanded
}

/// Record that the state is now at expanded capacity, creating the map
/// if the state has none. Other keys are untouched.
pub fn mark_expanded(metadata: &mut Option<SaveMetadata>) {
    let map = metadata.get_or_insert_with(SaveMetadata::new);
    if map.set(CAPACITY_MARKER_KEY, true).is_none() {
        debug!(key = CAPACITY_MARKER_KEY, "capacity marker added");
    }
}
