//! Load-sequence coordination for widen.
//!
//! A host allocates its unit arena once, at a size baked into several
//! routines, and assumes every saved state covers exactly that many
//! records. [`LoadSequenceCoordinator`] hooks the host's load lifecycle
//! to move both assumptions to an expanded capacity:
//!
//! 1. [`on_startup`](LoadSequenceCoordinator::on_startup) patches the
//!    host's routines and those of allow-listed extensions.
//! 2. [`on_allocate`](LoadSequenceCoordinator::on_allocate) decides the
//!    cycle's capacity from the save's marker and the settings, then
//!    installs a fresh arena of that size everywhere it is referenced.
//! 3. [`on_deserialized`](LoadSequenceCoordinator::on_deserialized)
//!    rebuilds the free-list when the save covered fewer slots.
//! 4. [`on_level_loaded`](LoadSequenceCoordinator::on_level_loaded)
//!    verifies the result and marks the state expanded, or reverts every
//!    patch.
//!
//! Settings come from a TOML file ([`MigrationSettings`]); diagnostics go
//! through `tracing` ([`logging::init`]).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod coordinator;
pub mod decision;
pub mod error;
pub mod extension;
pub mod logging;
pub mod metadata;
pub mod metrics;
pub mod migrator;
pub mod queue;
pub mod targets;

pub use config::{ConfigError, Diagnostics, MigrationSettings};
pub use coordinator::{
    HostBindings, LoadSequenceCoordinator, LoadState, StartupReport, VerificationOutcome,
};
pub use decision::{CapacityDecisionPolicy, DecisionCache};
pub use error::MigrationError;
pub use extension::{
    Extension, ExtensionRegistry, ExtensionReport, ExtensionStatus, ExtensionSynchronizer,
    SyncReport,
};
pub use metadata::{is_expanded, mark_expanded, CAPACITY_MARKER_KEY};
pub use metrics::MigrationMetrics;
pub use migrator::{ArenaMigrator, InstallReport, ReconcileReport};
pub use queue::{Task, TaskQueue};
pub use targets::{
    default_allow_list, host_targets, AllowedExtension, DESERIALIZE_SIZE_ACCESSOR, HOST_MODULE,
    TRAFFIC_MANAGER,
};
