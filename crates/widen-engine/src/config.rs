//! Migration settings, persistence, and validation.
//!
//! [`MigrationSettings`] is the only user-visible configuration surface.
//! It is stored as TOML; missing keys take their defaults, and a missing
//! file yields the default settings.

use std::error::Error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use widen_core::{CapacityPlan, PlanError};

// ── Diagnostics ────────────────────────────────────────────────────

/// Logging verbosity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Diagnostics {
    /// Warnings and errors only.
    Quiet,
    /// Key milestones.
    #[default]
    Normal,
    /// Everything, including per-patch detail.
    Detailed,
}

impl Diagnostics {
    /// Default filter directive when `RUST_LOG` is unset.
    pub fn default_directive(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "info",
            Self::Detailed => "debug",
        }
    }
}

// ── MigrationSettings ──────────────────────────────────────────────

/// User-facing migration settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationSettings {
    /// Expand the arena when loading a state saved at original capacity.
    /// States already saved expanded are always loaded expanded.
    pub expand_on_load: bool,
    /// Multiplier applied to the host's original capacity. Default: 2.
    pub expansion_factor: u32,
    /// Logging verbosity.
    pub diagnostics: Diagnostics,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            expand_on_load: true,
            expansion_factor: CapacityPlan::DEFAULT_FACTOR,
            diagnostics: Diagnostics::Normal,
        }
    }
}

impl MigrationSettings {
    /// Parse and validate settings from TOML.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(s).map_err(ConfigError::Parse)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(ConfigError::Serialize)
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Write settings to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Check the settings against the host's default capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.plan().map(|_| ())
    }

    /// Capacity plan for the host's default original capacity.
    pub fn plan(&self) -> Result<CapacityPlan, ConfigError> {
        self.plan_for(CapacityPlan::DEFAULT_ORIGINAL)
    }

    /// Capacity plan for a host whose original capacity is `original`.
    ///
    /// The expanded capacity must fit a 32-bit signed literal, since it is
    /// written into routines as `ldc.i4`.
    pub fn plan_for(&self, original: u32) -> Result<CapacityPlan, ConfigError> {
        if self.expansion_factor < 1 {
            return Err(ConfigError::InvalidFactor {
                factor: self.expansion_factor,
            });
        }
        let plan = CapacityPlan::new(original, self.expansion_factor)?;
        if i32::try_from(plan.expanded()).is_err() {
            return Err(ConfigError::CapacityTooLarge {
                capacity: plan.expanded(),
            });
        }
        Ok(plan)
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors from loading, saving, or validating settings.
#[derive(Debug)]
pub enum ConfigError {
    /// The settings file could not be read or written.
    Io {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
    /// The settings file is not valid TOML for [`MigrationSettings`].
    Parse(toml::de::Error),
    /// Settings could not be serialized.
    Serialize(toml::ser::Error),
    /// `expansion_factor` must be at least 1.
    InvalidFactor {
        /// The configured factor.
        factor: u32,
    },
    /// The expanded capacity does not fit a routine literal.
    CapacityTooLarge {
        /// The expanded capacity.
        capacity: u32,
    },
    /// The capacity plan is invalid.
    Plan(PlanError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Parse(e) => write!(f, "parse: {e}"),
            Self::Serialize(e) => write!(f, "serialize: {e}"),
            Self::InvalidFactor { factor } => {
                write!(f, "expansion_factor must be at least 1, got {factor}")
            }
            Self::CapacityTooLarge { capacity } => {
                write!(f, "expanded capacity {capacity} exceeds i32::MAX")
            }
            Self::Plan(e) => write!(f, "plan: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(e) => Some(e),
            Self::Serialize(e) => Some(e),
            Self::Plan(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PlanError> for ConfigError {
    fn from(e: PlanError) -> Self {
        Self::Plan(e)
    }
}
