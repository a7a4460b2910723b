//! Canonical inventory model.
//!
//! Both sides of a reconciliation run — the desired state assembled from
//! manifests and the current state reported by the hub — are normalized into
//! the same shape, a [`CanonicalInventory`], before anything is compared.
//! Component ids are the only keys; display names are carried for logging
//! and never participate in matching.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Opaque stable identifier for a component in the hub catalog.
///
/// Not guaranteed constant over time by the hub itself; drifted ids are
/// mapped back through the alias table (see [`crate::resolve::AliasTable`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    /// Create a component id from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw string form of the id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Canonicalized record for one component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentRecord {
    /// Lowercased name, for human-readable logging only. Never used as a key.
    pub display_name: String,
    /// Canonical version strings. A set: duplicate spellings collapse.
    pub versions: BTreeSet<String>,
    /// Tri-state license approval. `None` means "unspecified": the desired
    /// inventory leaves it `None` unless a manifest states it, and an
    /// unspecified value never produces a change operation.
    pub license_approved: Option<bool>,
}

/// A canonicalized inventory: component id → record.
///
/// Built fresh each run, read-only once diffed. Insertion order is preserved
/// so logs follow manifest/remote order.
#[derive(Debug, Clone, Default)]
pub struct CanonicalInventory {
    records: IndexMap<ComponentId, ComponentRecord>,
}

impl CanonicalInventory {
    /// Create an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch or create the record for `id`, updating its display name.
    ///
    /// The last-seen display name wins; it is logging-only metadata.
    pub fn record_mut(&mut self, id: &ComponentId, display_name: &str) -> &mut ComponentRecord {
        let record = self.records.entry(id.clone()).or_default();
        record.display_name = display_name.to_lowercase();
        record
    }

    /// Look up a component record.
    pub fn get(&self, id: &ComponentId) -> Option<&ComponentRecord> {
        self.records.get(id)
    }

    /// Whether `id` already lists `version` (canonical spelling).
    pub fn has_version(&self, id: &ComponentId, version: &str) -> bool {
        self.records
            .get(id)
            .is_some_and(|r| r.versions.contains(version))
    }

    /// Iterate records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ComponentId, &ComponentRecord)> {
        self.records.iter()
    }

    /// Component ids present in this inventory.
    pub fn ids(&self) -> impl Iterator<Item = &ComponentId> {
        self.records.keys()
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the inventory holds no components.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<(ComponentId, ComponentRecord)> for CanonicalInventory {
    fn from_iter<T: IntoIterator<Item = (ComponentId, ComponentRecord)>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_id_display() {
        let id = ComponentId::new("abc-123");
        assert_eq!(id.to_string(), "abc-123");
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn test_record_mut_lowercases_display_name() {
        let mut inv = CanonicalInventory::new();
        let id = ComponentId::new("c1");
        inv.record_mut(&id, "Fmtlib/Fmt");
        assert_eq!(inv.get(&id).unwrap().display_name, "fmtlib/fmt");
    }

    #[test]
    fn test_versions_collapse_duplicates() {
        let mut inv = CanonicalInventory::new();
        let id = ComponentId::new("c1");
        let record = inv.record_mut(&id, "zlib");
        record.versions.insert("1.2.13".to_string());
        record.versions.insert("1.2.13".to_string());
        assert_eq!(inv.get(&id).unwrap().versions.len(), 1);
    }

    #[test]
    fn test_has_version() {
        let mut inv = CanonicalInventory::new();
        let id = ComponentId::new("c1");
        inv.record_mut(&id, "zlib")
            .versions
            .insert("1.2.13".to_string());
        assert!(inv.has_version(&id, "1.2.13"));
        assert!(!inv.has_version(&id, "1.2.12"));
        assert!(!inv.has_version(&ComponentId::new("other"), "1.2.13"));
    }

    #[test]
    fn test_component_appears_at_most_once() {
        let mut inv = CanonicalInventory::new();
        let id = ComponentId::new("c1");
        inv.record_mut(&id, "zlib");
        inv.record_mut(&id, "zlib (renamed)");
        assert_eq!(inv.len(), 1);
        // Last display name wins
        assert_eq!(inv.get(&id).unwrap().display_name, "zlib (renamed)");
    }

    #[test]
    fn test_license_defaults_unspecified() {
        let mut inv = CanonicalInventory::new();
        let id = ComponentId::new("c1");
        inv.record_mut(&id, "openssl");
        assert_eq!(inv.get(&id).unwrap().license_approved, None);
    }
}
