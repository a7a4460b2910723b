//! Identity resolution: component-id aliases and version fallbacks.
//!
//! Hub component ids are not stable. Sometimes they change or get aliased to
//! a new id without warning, while our manifests keep the old one forever in
//! history. The [`AliasTable`] maps remote-reported ids back to the canonical
//! id the manifests use — a pure lookup table, loaded once per run.
//!
//! Separately, a manifest may want a component-version the knowledgebase does
//! not know about yet. For those, the table carries "fallback versions": a
//! configured substitute used in place of the new version until the real one
//! appears in the catalog.

use crate::canon::{canonicalize_version, AltVersionIndex};
use crate::error::{Result, SyncError};
use crate::model::{CanonicalInventory, ComponentId};
use crate::remote::{CatalogVersion, Hub};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// One component's entry in the alias configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AliasEntry {
    /// Display name, used when canonicalizing fallback keys.
    #[serde(rename = "bd-name", default)]
    name: Option<String>,
    /// Former ids the hub may still report for this component.
    #[serde(rename = "bd-id-aliases", default)]
    id_aliases: Vec<String>,
    /// Canonical version → substitute to use while the canonical one is
    /// absent from the catalog.
    #[serde(rename = "fallback-versions", default)]
    fallback_versions: IndexMap<String, String>,
}

/// Static alias configuration, loaded once at startup and never mutated.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    /// old id → canonical id
    id_aliases: HashMap<ComponentId, ComponentId>,
    /// (canonical id, canonical version) → fallback version
    version_fallbacks: HashMap<(ComponentId, String), String>,
}

impl AliasTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the alias document from `path`. A missing file is not an error:
    /// an empty table is assumed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No alias file at {}; assuming empty table", path.display());
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        Self::parse(&content)
            .map_err(|e| SyncError::config(format!("alias file {}: {e}", path.display())))
    }

    /// Parse the alias document from YAML text.
    pub fn parse(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        let entries: IndexMap<String, AliasEntry> = serde_yaml::from_str(yaml)?;
        let mut table = Self::new();
        for (id, entry) in entries {
            let canonical = ComponentId::new(id);
            let name = entry.name.as_deref().unwrap_or("<unknown component name>");

            for alias in &entry.id_aliases {
                table
                    .id_aliases
                    .insert(ComponentId::new(alias.as_str()), canonical.clone());
            }

            // Fallback keys are spelled however the author liked; index them
            // under the canonical spelling so lookups line up.
            for (version, fallback) in &entry.fallback_versions {
                let canonical_version = canonicalize_version(name, &canonical, version, None);
                table
                    .version_fallbacks
                    .insert((canonical.clone(), canonical_version), fallback.clone());
            }
        }
        tracing::debug!(
            "Loaded {} component id aliases and {} version fallbacks",
            table.id_aliases.len(),
            table.version_fallbacks.len()
        );
        Ok(table)
    }

    /// Map a raw id through the alias table. Identity if no alias exists.
    pub fn resolve_id(&self, raw: &ComponentId) -> ComponentId {
        self.id_aliases.get(raw).cloned().unwrap_or_else(|| raw.clone())
    }

    /// Configured fallback for `(id, canonical_version)`, if any.
    pub fn fallback_for(&self, id: &ComponentId, canonical_version: &str) -> Option<&str> {
        self.version_fallbacks
            .get(&(id.clone(), canonical_version.to_string()))
            .map(String::as_str)
    }

    /// Number of id aliases loaded.
    pub fn id_alias_count(&self) -> usize {
        self.id_aliases.len()
    }
}

/// Probe the catalog for `version` of component `id`, accepting only exact
/// version-name matches; on a miss, probe every registered alternate
/// spelling and return the first hit.
///
/// The hub's free-text search wildcards some characters, so a returned entry
/// counts only if its version field is an exact string match.
pub fn find_catalog_version<H: Hub + ?Sized>(
    hub: &H,
    alts: &AltVersionIndex,
    id: &ComponentId,
    display_name: &str,
    version: &str,
) -> Result<Option<CatalogVersion>> {
    if let Some(found) = search_exact(hub, id, version)? {
        return Ok(Some(found));
    }

    let Some(alternates) = alts.alternates(id, version) else {
        return Ok(None);
    };

    tracing::debug!(
        "Version {version} of {display_name} not in catalog; trying {} alternate spellings",
        alternates.len()
    );
    for alternate in alternates {
        match search_exact(hub, id, alternate)? {
            Some(found) => {
                tracing::info!("Found alternate spelling {alternate} for {display_name} {version}");
                return Ok(Some(found));
            }
            None => tracing::debug!("Alternate spelling {alternate} not in catalog either"),
        }
    }

    Ok(None)
}

/// One search round-trip, filtered down to an exact version-name match.
fn search_exact<H: Hub + ?Sized>(
    hub: &H,
    id: &ComponentId,
    version: &str,
) -> Result<Option<CatalogVersion>> {
    let hits = hub.search_catalog_versions(id, version)?;
    Ok(hits.into_iter().find(|hit| hit.version_name == version))
}

/// Decide which version the desired inventory should carry for
/// `(id, canonical_version)`.
///
/// If no fallback is configured, the canonical version is used as-is.
/// Otherwise, the canonical version is kept when the remote inventory
/// already lists it, or when the catalog knows it (or an alternate
/// spelling). Failing that, the configured fallback is canonicalized and
/// probed; if even the fallback is absent from the catalog, the
/// configuration is unusable and the run aborts.
pub fn resolve_fallback<H: Hub + ?Sized>(
    hub: &H,
    aliases: &AliasTable,
    alts: &mut AltVersionIndex,
    remote: &CanonicalInventory,
    id: &ComponentId,
    display_name: &str,
    canonical_version: &str,
) -> Result<String> {
    let Some(fallback) = aliases.fallback_for(id, canonical_version) else {
        return Ok(canonical_version.to_string());
    };

    // The remote already carries the real version; no fallback needed.
    if remote.has_version(id, canonical_version) {
        return Ok(canonical_version.to_string());
    }

    // The canonical version may have appeared in the catalog since the
    // fallback was configured.
    if find_catalog_version(hub, alts, id, display_name, canonical_version)?.is_some() {
        return Ok(canonical_version.to_string());
    }

    tracing::debug!("Canonicalizing fallback version {fallback} for {display_name}");
    let fallback = fallback.to_string();
    let canonical_fallback = canonicalize_version(display_name, id, &fallback, Some(alts));
    if find_catalog_version(hub, alts, id, display_name, &canonical_fallback)?.is_none() {
        return Err(SyncError::config(format!(
            "fallback version {fallback} for component {display_name} ({id}) \
             does not exist in the catalog either"
        )));
    }

    tracing::info!("Using fallback version {canonical_fallback} for component {display_name}");
    Ok(canonical_fallback)
}
