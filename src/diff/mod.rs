//! Typed diff over canonical inventories.
//!
//! A purpose-built structural comparison: set difference on version sets,
//! field comparison on license approval. Display names are metadata and
//! never produce change operations. The output is an ordered change list
//! that the apply stage executes verbatim; re-diffing after a successful
//! apply yields an empty list.

use crate::model::{CanonicalInventory, ComponentId};
use std::fmt;

/// One remote mutation needed to move the hub toward the desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOp {
    /// Add `version` of the component to the curated list.
    AddVersion {
        id: ComponentId,
        display_name: String,
        version: String,
    },
    /// Remove `version` of the component from the curated list.
    RemoveVersion {
        id: ComponentId,
        display_name: String,
        version: String,
    },
    /// Set the review state of every curated record of the component.
    SetLicenseApproved {
        id: ComponentId,
        display_name: String,
        approved: bool,
    },
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddVersion {
                display_name,
                version,
                ..
            } => write!(f, "add {display_name} {version}"),
            Self::RemoveVersion {
                display_name,
                version,
                ..
            } => write!(f, "remove {display_name} {version}"),
            Self::SetLicenseApproved {
                display_name,
                approved,
                ..
            } => write!(f, "set license-approved={approved} on {display_name}"),
        }
    }
}

/// Compute the ordered change list turning `remote` into `desired`.
///
/// - Components only in `desired`: one `AddVersion` per version.
/// - Components only in `remote`: one `RemoveVersion` per version.
/// - Components in both: version-set difference both ways, plus one
///   `SetLicenseApproved` when the desired approval is specified and differs
///   from the remote's.
///
/// Output order is deterministic: components sorted by id, versions in
/// sorted order, adds before removes before the license change. An add and
/// a remove for the same `(id, version)` can never both appear — each side
/// of the version-set difference is disjoint by construction.
pub fn diff(remote: &CanonicalInventory, desired: &CanonicalInventory) -> Vec<ChangeOp> {
    let mut ids: Vec<&ComponentId> = remote.ids().chain(desired.ids()).collect();
    ids.sort();
    ids.dedup();

    let mut ops = Vec::new();
    for id in ids {
        match (remote.get(id), desired.get(id)) {
            (None, Some(wanted)) => {
                for version in &wanted.versions {
                    ops.push(ChangeOp::AddVersion {
                        id: id.clone(),
                        display_name: wanted.display_name.clone(),
                        version: version.clone(),
                    });
                }
            }
            (Some(current), None) => {
                for version in &current.versions {
                    ops.push(ChangeOp::RemoveVersion {
                        id: id.clone(),
                        display_name: current.display_name.clone(),
                        version: version.clone(),
                    });
                }
            }
            (Some(current), Some(wanted)) => {
                for version in wanted.versions.difference(&current.versions) {
                    ops.push(ChangeOp::AddVersion {
                        id: id.clone(),
                        display_name: wanted.display_name.clone(),
                        version: version.clone(),
                    });
                }
                for version in current.versions.difference(&wanted.versions) {
                    ops.push(ChangeOp::RemoveVersion {
                        id: id.clone(),
                        display_name: wanted.display_name.clone(),
                        version: version.clone(),
                    });
                }
                if let Some(approved) = wanted.license_approved {
                    if current.license_approved != Some(approved) {
                        ops.push(ChangeOp::SetLicenseApproved {
                            id: id.clone(),
                            display_name: wanted.display_name.clone(),
                            approved,
                        });
                    }
                }
            }
            (None, None) => unreachable!("id came from one of the inventories"),
        }
    }

    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ComponentRecord;
    use std::collections::BTreeSet;

    fn inventory(entries: &[(&str, &[&str], Option<bool>)]) -> CanonicalInventory {
        entries
            .iter()
            .map(|(id, versions, license)| {
                (
                    ComponentId::new(*id),
                    ComponentRecord {
                        display_name: format!("name-{id}"),
                        versions: versions.iter().map(|v| (*v).to_string()).collect::<BTreeSet<_>>(),
                        license_approved: *license,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_diff_identical_is_empty() {
        let inv = inventory(&[("c1", &["1.0", "2.0"], Some(false)), ("c2", &["3.1"], None)]);
        assert!(diff(&inv, &inv).is_empty());
    }

    #[test]
    fn test_diff_empty_inventories() {
        let empty = CanonicalInventory::new();
        assert!(diff(&empty, &empty).is_empty());
    }

    #[test]
    fn test_new_component_adds_every_version() {
        let remote = CanonicalInventory::new();
        let desired = inventory(&[("c1", &["1.0", "2.0"], None)]);
        let ops = diff(&remote, &desired);
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| matches!(op, ChangeOp::AddVersion { .. })));
        let versions: Vec<&str> = ops
            .iter()
            .map(|op| match op {
                ChangeOp::AddVersion { version, .. } => version.as_str(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(versions, vec!["1.0", "2.0"]);
    }

    #[test]
    fn test_dropped_component_removes_every_version() {
        let remote = inventory(&[("c1", &["1.0", "2.0"], Some(false))]);
        let desired = CanonicalInventory::new();
        let ops = diff(&remote, &desired);
        assert_eq!(ops.len(), 2);
        assert!(ops
            .iter()
            .all(|op| matches!(op, ChangeOp::RemoveVersion { .. })));
    }

    #[test]
    fn test_version_drift_on_shared_component() {
        let remote = inventory(&[("c1", &["1.0", "2.0"], Some(false))]);
        let desired = inventory(&[("c1", &["2.0", "3.0"], None)]);
        let ops = diff(&remote, &desired);
        assert_eq!(
            ops,
            vec![
                ChangeOp::AddVersion {
                    id: ComponentId::new("c1"),
                    display_name: "name-c1".to_string(),
                    version: "3.0".to_string(),
                },
                ChangeOp::RemoveVersion {
                    id: ComponentId::new("c1"),
                    display_name: "name-c1".to_string(),
                    version: "1.0".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_add_and_remove_never_share_a_version() {
        let remote = inventory(&[("c1", &["1.0", "2.0"], Some(false))]);
        let desired = inventory(&[("c1", &["2.0", "3.0"], None)]);
        let ops = diff(&remote, &desired);
        let adds: BTreeSet<_> = ops
            .iter()
            .filter_map(|op| match op {
                ChangeOp::AddVersion { version, .. } => Some(version.clone()),
                _ => None,
            })
            .collect();
        let removes: BTreeSet<_> = ops
            .iter()
            .filter_map(|op| match op {
                ChangeOp::RemoveVersion { version, .. } => Some(version.clone()),
                _ => None,
            })
            .collect();
        assert!(adds.is_disjoint(&removes));
    }

    #[test]
    fn test_license_change_emitted_when_specified_and_different() {
        let remote = inventory(&[("c1", &["1.0"], Some(false))]);
        let desired = inventory(&[("c1", &["1.0"], Some(true))]);
        let ops = diff(&remote, &desired);
        assert_eq!(
            ops,
            vec![ChangeOp::SetLicenseApproved {
                id: ComponentId::new("c1"),
                display_name: "name-c1".to_string(),
                approved: true,
            }]
        );
    }

    #[test]
    fn test_license_unspecified_emits_nothing() {
        let remote = inventory(&[("c1", &["1.0"], Some(false))]);
        let desired = inventory(&[("c1", &["1.0"], None)]);
        assert!(diff(&remote, &desired).is_empty());
    }

    #[test]
    fn test_license_equal_emits_nothing() {
        let remote = inventory(&[("c1", &["1.0"], Some(true))]);
        let desired = inventory(&[("c1", &["1.0"], Some(true))]);
        assert!(diff(&remote, &desired).is_empty());
    }

    #[test]
    fn test_display_name_difference_emits_nothing() {
        let remote: CanonicalInventory = [(
            ComponentId::new("c1"),
            ComponentRecord {
                display_name: "old name".to_string(),
                versions: ["1.0".to_string()].into_iter().collect(),
                license_approved: Some(false),
            },
        )]
        .into_iter()
        .collect();
        let desired: CanonicalInventory = [(
            ComponentId::new("c1"),
            ComponentRecord {
                display_name: "new name".to_string(),
                versions: ["1.0".to_string()].into_iter().collect(),
                license_approved: None,
            },
        )]
        .into_iter()
        .collect();
        assert!(diff(&remote, &desired).is_empty());
    }

    #[test]
    fn test_output_sorted_by_component_id() {
        let remote = CanonicalInventory::new();
        let desired = inventory(&[("zzz", &["1.0"], None), ("aaa", &["1.0"], None)]);
        let ops = diff(&remote, &desired);
        let ids: Vec<&str> = ops
            .iter()
            .map(|op| match op {
                ChangeOp::AddVersion { id, .. } => id.as_str(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(ids, vec!["aaa", "zzz"]);
    }

    #[test]
    fn test_convergence_after_simulated_apply() {
        let remote = inventory(&[("c1", &["1.0", "2.0"], Some(false)), ("c2", &["5.0"], Some(false))]);
        let desired = inventory(&[("c1", &["2.0", "3.0"], Some(true)), ("c3", &["0.1"], None)]);

        // Apply the ops to a copy of the remote state.
        let mut post: std::collections::BTreeMap<ComponentId, ComponentRecord> = remote
            .iter()
            .map(|(id, rec)| (id.clone(), rec.clone()))
            .collect();
        for op in diff(&remote, &desired) {
            match op {
                ChangeOp::AddVersion {
                    id,
                    display_name,
                    version,
                } => {
                    let entry = post.entry(id).or_insert_with(|| ComponentRecord {
                        display_name,
                        versions: BTreeSet::new(),
                        license_approved: Some(false),
                    });
                    entry.versions.insert(version);
                }
                ChangeOp::RemoveVersion { id, version, .. } => {
                    if let Some(entry) = post.get_mut(&id) {
                        entry.versions.remove(&version);
                        if entry.versions.is_empty() {
                            post.remove(&id);
                        }
                    }
                }
                ChangeOp::SetLicenseApproved { id, approved, .. } => {
                    if let Some(entry) = post.get_mut(&id) {
                        entry.license_approved = Some(approved);
                    }
                }
            }
        }

        let post_inventory: CanonicalInventory = post.into_iter().collect();
        assert!(diff(&post_inventory, &desired).is_empty());
    }
}
