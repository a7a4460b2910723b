//! Manifest tree discovery and parsing.
//!
//! Desired state is declared in `<project>-component-manifest.yaml` files
//! scattered through a source tree. Each document may carry:
//!
//! - `include-projects`: other project names whose manifests are pulled in
//!   recursively (their manifests are searched for under the same root),
//! - `meta`: opaque metadata, accepted and ignored,
//! - `components`: component name → entry with `versions`, `bd-id`,
//!   `bd-name`, `license-approved`, and the (ignored here) `src-path`.
//!
//! Any other top-level key is a fatal configuration error — a typo in a
//! manifest must never silently drop components from the desired state.

use crate::error::{Result, SyncError};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A version value as it appears in YAML. Bare scalars like `7.1` or `2023`
/// parse as numbers and have to be restrung before canonicalization.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawVersion {
    Text(String),
    Number(serde_yaml::Number),
}

impl fmt::Display for RawVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// One component entry in a manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentEntry {
    /// Raw version strings to keep on the curated list.
    #[serde(default)]
    pub versions: Vec<RawVersion>,
    /// Canonical catalog id for this component.
    #[serde(rename = "bd-id", default)]
    pub id: Option<String>,
    /// Display-name override; defaults to the component key.
    #[serde(rename = "bd-name", default)]
    pub name: Option<String>,
    /// Explicit license approval. Absent means "leave the hub unchanged".
    #[serde(rename = "license-approved", default)]
    pub license_approved: Option<bool>,
    /// Source path used by the tree-pruning sibling tool; accepted so shared
    /// manifests parse, ignored here.
    #[serde(rename = "src-path", default)]
    pub src_path: Option<String>,
}

/// A component value: either a real entry or an empty-list placeholder kept
/// around to satisfy drift detection.
///
/// `Placeholder` must be tried first: with every entry field defaulted, an
/// empty list would otherwise also satisfy `Entry` and the list arm would
/// never match. Mappings cannot deserialize as a sequence, so real entries
/// still land on `Entry`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ComponentSpec {
    Placeholder(Vec<serde_yaml::Value>),
    Entry(ComponentEntry),
}

/// One parsed manifest document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Other projects whose manifests are included recursively.
    #[serde(rename = "include-projects", default)]
    pub include_projects: Vec<String>,
    /// Opaque metadata; allowed to exist, never interpreted.
    #[serde(default)]
    pub meta: Option<serde_yaml::Value>,
    /// Component entries, in document order.
    #[serde(default)]
    pub components: IndexMap<String, ComponentSpec>,
}

impl Manifest {
    /// Iterate real component entries, skipping empty-list placeholders.
    pub fn component_entries(&self) -> impl Iterator<Item = (&str, &ComponentEntry)> {
        self.components.iter().filter_map(|(name, spec)| match spec {
            ComponentSpec::Entry(entry) => Some((name.as_str(), entry)),
            ComponentSpec::Placeholder(_) => None,
        })
    }
}

/// A manifest together with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub path: PathBuf,
    pub manifest: Manifest,
}

/// The manifest filename for a project.
pub fn manifest_filename(project: &str) -> String {
    format!("{project}-component-manifest.yaml")
}

/// Parse and validate a single manifest file.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    tracing::info!("Loading input manifest {}", path.display());
    let content = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
    let manifest: Manifest =
        serde_yaml::from_str(&content).map_err(|e| SyncError::manifest(path, e.to_string()))?;

    for (name, spec) in &manifest.components {
        match spec {
            ComponentSpec::Placeholder(values) if !values.is_empty() => {
                return Err(SyncError::manifest(
                    path,
                    format!("component '{name}' is a non-empty list; expected a mapping"),
                ));
            }
            ComponentSpec::Placeholder(_) => {}
            ComponentSpec::Entry(entry) => {
                // An entry without an id could never match the catalog; fail
                // here rather than at apply time.
                if entry.id.is_none() {
                    return Err(SyncError::manifest(
                        path,
                        format!("component '{name}' has no bd-id"),
                    ));
                }
            }
        }
    }

    Ok(manifest)
}

/// Discover and load every manifest for `project` under `src_root`,
/// following `include-projects` references recursively.
///
/// Zero manifests for a referenced project is a logged warning, not an
/// error. Re-including an already-loaded project is a no-op.
pub fn discover_manifests(src_root: &Path, project: &str) -> Result<Vec<LoadedManifest>> {
    let mut visited = HashSet::new();
    let mut loaded = Vec::new();
    discover_into(src_root, project, &mut visited, &mut loaded)?;
    Ok(loaded)
}

fn discover_into(
    src_root: &Path,
    project: &str,
    visited: &mut HashSet<String>,
    loaded: &mut Vec<LoadedManifest>,
) -> Result<()> {
    if !visited.insert(project.to_string()) {
        tracing::debug!("Project {project} already included; skipping");
        return Ok(());
    }

    tracing::info!("Searching for manifests for project {project}");
    let filename = manifest_filename(project);

    let mut found = 0usize;
    let mut includes = Vec::new();
    for entry in WalkDir::new(src_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
    {
        if entry.file_type().is_file() && entry.file_name() == filename.as_str() {
            found += 1;
            let manifest = load_manifest(entry.path())?;
            includes.extend(manifest.include_projects.clone());
            loaded.push(LoadedManifest {
                path: entry.path().to_path_buf(),
                manifest,
            });
        }
    }

    if found == 0 {
        tracing::warn!("Loaded zero manifests for {project}!");
    } else {
        tracing::info!("Loaded {found} manifests for {project}");
    }

    for include in includes {
        discover_into(src_root, &include, visited, loaded)?;
    }

    Ok(())
}
