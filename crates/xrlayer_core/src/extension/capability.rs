//! Availability map built while probing one chain.

use std::collections::BTreeMap;

/// Capability name (case-sensitive) to advertised version.
///
/// Merge policy is first-seen-wins: once a name is present its version is
/// never replaced, even when a later link advertises a higher one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    entries: BTreeMap<String, u32>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `name` unless already present. Returns whether it was added.
    pub fn insert_first_seen(&mut self, name: impl Into<String>, version: u32) -> bool {
        let name = name.into();
        if self.entries.contains_key(name.as_str()) {
            return false;
        }
        self.entries.insert(name, version);
        true
    }

    /// Folds `other` into `self`, keeping versions already recorded here.
    pub fn merge_first_seen(&mut self, other: CapabilitySet) {
        for (name, version) in other.entries {
            self.entries.entry(name).or_insert(version);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn version(&self, name: &str) -> Option<u32> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = (S, u32)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (name, version) in iter {
            set.insert_first_seen(name, version);
        }
        set
    }
}
