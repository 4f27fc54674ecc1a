//! Test utilities and mock hosts for widen development.
//!
//! [`MockHost`] plays the host's side of the load lifecycle: it owns the
//! routine table, the arena slot, two worker caches and the task queue,
//! and drives a [`LoadSequenceCoordinator`] through the same hook order
//! the real host uses. Record counts come from invoking the (possibly
//! patched) deserializer routine, so a wrong patch shows up as a wrong
//! load.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use widen_arena::{read_arena, write_arena, ArenaCache, ArenaError, ArenaHolder, ArenaSlot, HolderSet, SharedArena, UnitArena};
use widen_core::RoutineId;
use widen_engine::{
    logging, ConfigError, Extension, ExtensionRegistry, HostBindings, LoadSequenceCoordinator,
    MigrationError, MigrationSettings, StartupReport, TaskQueue, VerificationOutcome,
};
use widen_patch::{Accessors, ExecError, RoutineTable};
use widen_save::{SaveError, SaveMetadata, SaveReader, SaveWriter};

pub use fixtures::MockExtension;

/// Names of the worker caches every mock host registers.
pub const WORKERS: [&str; 2] = ["pathfind-0", "pathfind-1"];

/// Anything that can go wrong while the mock host loads or saves.
#[derive(Debug)]
pub enum HostError {
    Config(ConfigError),
    Migration(MigrationError),
    Save(SaveError),
    Exec(ExecError),
    Arena(ArenaError),
    /// The deserializer routine produced an impossible record count.
    RecordCount(i64),
    /// No arena is installed.
    NoArena,
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Migration(e) => write!(f, "migration: {e}"),
            Self::Save(e) => write!(f, "save: {e}"),
            Self::Exec(e) => write!(f, "routine: {e}"),
            Self::Arena(e) => write!(f, "arena: {e}"),
            Self::RecordCount(n) => write!(f, "deserializer returned {n} records"),
            Self::NoArena => write!(f, "no arena installed"),
        }
    }
}

impl Error for HostError {}

impl From<ConfigError> for HostError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<MigrationError> for HostError {
    fn from(e: MigrationError) -> Self {
        Self::Migration(e)
    }
}

impl From<SaveError> for HostError {
    fn from(e: SaveError) -> Self {
        Self::Save(e)
    }
}

impl From<ExecError> for HostError {
    fn from(e: ExecError) -> Self {
        Self::Exec(e)
    }
}

impl From<ArenaError> for HostError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}

/// A host with an arena of `original` units, wired to a coordinator.
pub struct MockHost {
    pub original: u32,
    pub routines: Arc<RoutineTable>,
    pub slot: ArenaSlot,
    pub workers: Vec<Arc<ArenaCache>>,
    pub queue: TaskQueue,
    pub extensions: ExtensionRegistry,
    pub accessors: Accessors,
    pub metadata: Option<SaveMetadata>,
    pub coordinator: LoadSequenceCoordinator,
}

impl MockHost {
    /// A host with default settings.
    pub fn new(original: u32) -> Result<Self, HostError> {
        Self::with_settings(original, MigrationSettings::default())
    }

    /// A host with explicit settings. The host's own arena is installed
    /// at `original` capacity, as the unmodified host would have it.
    pub fn with_settings(original: u32, settings: MigrationSettings) -> Result<Self, HostError> {
        Self::assemble(original, settings, fixtures::host_routines(original), Vec::new())
    }

    /// A host with its own routine table and extra arena holders
    /// registered next to the worker caches.
    pub fn assemble(
        original: u32,
        settings: MigrationSettings,
        routines: RoutineTable,
        extra_holders: Vec<Arc<dyn ArenaHolder>>,
    ) -> Result<Self, HostError> {
        logging::init(settings.diagnostics);
        let routines = Arc::new(routines);
        let slot = ArenaSlot::new();
        let initial = slot.replace(UnitArena::new(original)?);

        let mut holders = HolderSet::new();
        let workers: Vec<Arc<ArenaCache>> = WORKERS
            .iter()
            .map(|name| Arc::new(ArenaCache::new(*name)))
            .collect();
        for worker in &workers {
            worker.adopt(Arc::clone(&initial));
            holders.register(Arc::clone(worker) as Arc<dyn ArenaHolder>);
        }
        for holder in extra_holders {
            holder.adopt(Arc::clone(&initial));
            holders.register(holder);
        }

        let queue = TaskQueue::new();
        let extensions = ExtensionRegistry::new();
        let coordinator = LoadSequenceCoordinator::new(
            settings,
            original,
            HostBindings {
                routines: Arc::clone(&routines),
                slot: slot.clone(),
                holders,
                queue: queue.clone(),
                extensions: extensions.clone(),
            },
        )?;
        let mut accessors = Accessors::new();
        coordinator.register_accessors(&mut accessors);

        Ok(Self {
            original,
            routines,
            slot,
            workers,
            queue,
            extensions,
            accessors,
            metadata: None,
            coordinator,
        })
    }

    /// Load an extension before startup.
    pub fn load_extension(&self, extension: Arc<dyn Extension>) {
        self.extensions.register(extension);
    }

    /// Run the startup hook.
    pub fn start(&mut self) -> Result<StartupReport, HostError> {
        Ok(self.coordinator.on_startup()?)
    }

    /// Load a saved state through the full hook sequence.
    pub fn load(&mut self, bytes: &[u8]) -> Result<VerificationOutcome, HostError> {
        let mut reader = SaveReader::open(bytes)?;
        self.metadata = reader.metadata().cloned();

        let arena = self.coordinator.on_allocate(self.metadata.as_ref())?;
        let count = self.record_count()?;
        reader.read_units(&mut write_arena(&arena), count)?;
        reader.finish()?;
        self.coordinator.on_deserialized()?;

        self.queue.drain();
        Ok(self.coordinator.on_level_loaded(&mut self.metadata)?)
    }

    /// Start a new game: allocate, skip deserialization, verify.
    pub fn new_game(&mut self) -> Result<VerificationOutcome, HostError> {
        self.metadata = None;
        self.coordinator.on_allocate(None)?;
        self.queue.drain();
        Ok(self.coordinator.on_level_loaded(&mut self.metadata)?)
    }

    /// Serialize the current arena with the current metadata.
    pub fn save(&self) -> Result<Vec<u8>, HostError> {
        let arena = self.arena()?;
        let mut writer = SaveWriter::new(Vec::new(), self.metadata.as_ref())?;
        writer.write_units(&read_arena(&arena))?;
        Ok(writer.finish()?)
    }

    /// The installed arena.
    pub fn arena(&self) -> Result<SharedArena, HostError> {
        self.slot.current().ok_or(HostError::NoArena)
    }

    /// Number of records the deserializer routine asks for right now.
    pub fn record_count(&self) -> Result<usize, HostError> {
        let id = RoutineId::new("PathManager.Data", "Deserialize");
        let n = self.routines.invoke(&id, &[], &self.accessors)?;
        usize::try_from(n).map_err(|_| HostError::RecordCount(n))
    }

    /// Evaluate one host routine.
    pub fn invoke(&self, owner: &str, member: &str) -> Result<i64, ExecError> {
        self.routines
            .invoke(&RoutineId::new(owner, member), &[], &self.accessors)
    }

    /// Capacities the worker caches read from.
    pub fn worker_capacities(&self) -> Vec<Option<usize>> {
        self.workers.iter().map(|w| w.held_capacity()).collect()
    }
}
