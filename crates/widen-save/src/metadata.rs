//! Persisted-state metadata: a string-keyed map of boolean flags.

use indexmap::IndexMap;

/// Key/value flags stored alongside the saved state.
///
/// A save may carry no map at all; callers model that as
/// `Option<SaveMetadata>`. Unknown keys are preserved through load and
/// save.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveMetadata {
    flags: IndexMap<String, bool>,
}

impl SaveMetadata {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a flag.
    pub fn get(&self, key: &str) -> Option<bool> {
        self.flags.get(key).copied()
    }

    /// Set a flag, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: bool) -> Option<bool> {
        self.flags.insert(key.into(), value)
    }

    /// Number of flags.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Whether the map holds no flags.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Flags in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.flags.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, bool)> for SaveMetadata {
    fn from_iter<T: IntoIterator<Item = (String, bool)>>(iter: T) -> Self {
        Self {
            flags: iter.into_iter().collect(),
        }
    }
}
