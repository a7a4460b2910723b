//! Apply stage: execute a change list against the hub.
//!
//! Operations run sequentially, in the order the diff produced them. Any
//! failed mutation aborts the run; operations already issued stay applied
//! (no rollback). Dry-run mode walks the entire decision path — catalog
//! resolution, removal lookup, record re-fetch — and replaces only the
//! mutating calls with log lines, so it validates feasibility without side
//! effects.

use crate::canon::AltVersionIndex;
use crate::diff::ChangeOp;
use crate::error::{Result, SyncError};
use crate::model::ComponentId;
use crate::remote::{CuratedRecord, Hub};
use crate::resolve::find_catalog_version;

/// Outcome of an apply run.
#[derive(Debug, Default)]
pub struct ApplyOutcome {
    /// Operations executed (or, in dry-run, that would have been executed).
    pub ops_applied: usize,
    /// Adds whose resolved catalog handle reported a different component id
    /// than expected. Continuable, but a sign the hub renumbered something.
    pub id_mismatches: usize,
}

/// Executes change operations against a hub.
pub struct ApplyEngine<'a, H: Hub + ?Sized> {
    hub: &'a H,
    alts: &'a AltVersionIndex,
    /// Curated records held from the initial remote load, canonical version
    /// spellings. Removal targets are located here, never re-fetched.
    held_records: &'a [CuratedRecord],
    dry_run: bool,
}

impl<'a, H: Hub + ?Sized> ApplyEngine<'a, H> {
    /// Create an apply engine over the given hub and held state.
    pub fn new(
        hub: &'a H,
        alts: &'a AltVersionIndex,
        held_records: &'a [CuratedRecord],
        dry_run: bool,
    ) -> Self {
        Self {
            hub,
            alts,
            held_records,
            dry_run,
        }
    }

    /// Execute every operation in order. Stops at the first failure.
    pub fn apply(&self, ops: &[ChangeOp]) -> Result<ApplyOutcome> {
        let mut outcome = ApplyOutcome::default();

        for op in ops {
            tracing::debug!("Executing: {op}");
            match op {
                ChangeOp::AddVersion {
                    id,
                    display_name,
                    version,
                } => self.add_version(id, display_name, version, &mut outcome)?,
                ChangeOp::RemoveVersion {
                    id,
                    display_name,
                    version,
                } => self.remove_version(id, display_name, version)?,
                ChangeOp::SetLicenseApproved {
                    id,
                    display_name,
                    approved,
                } => self.set_license_approved(id, display_name, *approved)?,
            }
            outcome.ops_applied += 1;
        }

        Ok(outcome)
    }

    /// Add a component-version to the curated list.
    ///
    /// The version must already exist in the catalog under its canonical
    /// spelling or a registered alternate; this tool never creates catalog
    /// entries. A miss here is fatal.
    fn add_version(
        &self,
        id: &ComponentId,
        display_name: &str,
        version: &str,
        outcome: &mut ApplyOutcome,
    ) -> Result<()> {
        tracing::info!("Adding component {display_name} ({id}) version {version}");

        let handle = find_catalog_version(self.hub, self.alts, id, display_name, version)?
            .ok_or_else(|| SyncError::catalog_miss(display_name, id, version))?;
        tracing::debug!("Catalog handle is {}", handle.href);

        if handle.component_id != *id {
            // The catalog answered with a different component id: the hub has
            // most likely renumbered the component. Too late to correct this
            // run; the alias table needs a new entry mapping the new id to
            // {id}. Loud warning, then continue.
            tracing::warn!(
                "COMPONENT ID MISMATCH: manifest references {id} for {display_name}, but \
                 searching for version {version} returned component {}. Add an alias table \
                 entry mapping the new id to the old one.",
                handle.component_id
            );
            outcome.id_mismatches += 1;
        }

        if self.dry_run {
            tracing::info!("DRYRUN: not adding {display_name} {version} to the curated list");
            return Ok(());
        }
        self.hub.add_curated_version(&handle.href)?;
        tracing::debug!("{id} version {version} added successfully");
        Ok(())
    }

    /// Remove a curated component-version record.
    ///
    /// The record must be present in the state held from the initial load —
    /// by definition we cannot be removing something that was never there.
    /// Not finding it is a logic error, not a transient condition.
    fn remove_version(&self, id: &ComponentId, display_name: &str, version: &str) -> Result<()> {
        tracing::info!("Removing component {display_name} ({id}) version {version}");

        let record = self
            .held_records
            .iter()
            .find(|r| r.component_id == *id && r.version_name == version)
            .ok_or_else(|| {
                SyncError::inconsistency(format!(
                    "failed to find curated record {id} {version} to delete"
                ))
            })?;

        if self.dry_run {
            tracing::info!("DRYRUN: found curated record but not deleting it");
            return Ok(());
        }
        self.hub.remove_curated_record(&record.href)?;
        tracing::debug!("{id} version {version} deleted successfully");
        Ok(())
    }

    /// Set the review state on every curated record of a component.
    ///
    /// Approval applies per record, so the live record set is re-fetched
    /// rather than trusting the initial load. Expensive, but only runs when
    /// the diff found an actual change.
    fn set_license_approved(
        &self,
        id: &ComponentId,
        display_name: &str,
        approved: bool,
    ) -> Result<()> {
        let live = self.hub.curated_records()?;
        for record in live.iter().filter(|r| r.component_id == *id) {
            tracing::info!(
                "Setting {display_name} version {} to license-approved={approved}",
                record.version_name
            );
            if self.dry_run {
                tracing::info!("DRYRUN: not updating review state");
            } else {
                self.hub.set_review_status(record, approved)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::remote::CatalogVersion;
    use std::cell::RefCell;

    /// Records mutations; catalog holds a fixed set of versions.
    struct RecordingHub {
        catalog: Vec<CatalogVersion>,
        curated: Vec<CuratedRecord>,
        added: RefCell<Vec<String>>,
        removed: RefCell<Vec<String>>,
        reviewed: RefCell<Vec<(String, bool)>>,
    }

    impl RecordingHub {
        fn new(catalog: Vec<CatalogVersion>, curated: Vec<CuratedRecord>) -> Self {
            Self {
                catalog,
                curated,
                added: RefCell::new(Vec::new()),
                removed: RefCell::new(Vec::new()),
                reviewed: RefCell::new(Vec::new()),
            }
        }
    }

    impl Hub for RecordingHub {
        fn curated_records(&self) -> std::result::Result<Vec<CuratedRecord>, RemoteError> {
            Ok(self.curated.clone())
        }

        fn search_catalog_versions(
            &self,
            id: &ComponentId,
            version: &str,
        ) -> std::result::Result<Vec<CatalogVersion>, RemoteError> {
            Ok(self
                .catalog
                .iter()
                .filter(|v| v.component_id == *id || v.version_name.contains(version))
                .cloned()
                .collect())
        }

        fn add_curated_version(&self, href: &str) -> std::result::Result<(), RemoteError> {
            self.added.borrow_mut().push(href.to_string());
            Ok(())
        }

        fn remove_curated_record(&self, href: &str) -> std::result::Result<(), RemoteError> {
            self.removed.borrow_mut().push(href.to_string());
            Ok(())
        }

        fn set_review_status(
            &self,
            record: &CuratedRecord,
            approved: bool,
        ) -> std::result::Result<(), RemoteError> {
            self.reviewed
                .borrow_mut()
                .push((record.href.clone(), approved));
            Ok(())
        }
    }

    fn catalog_version(id: &str, version: &str) -> CatalogVersion {
        CatalogVersion {
            href: format!("https://hub/api/components/{id}/versions/{version}"),
            component_id: ComponentId::new(id),
            version_name: version.to_string(),
        }
    }

    fn curated(id: &str, version: &str) -> CuratedRecord {
        CuratedRecord {
            href: format!("https://hub/api/pv/components/{id}-{version}"),
            component_url: format!("https://hub/api/components/{id}"),
            component_id: ComponentId::new(id),
            component_name: format!("name-{id}"),
            version_name: version.to_string(),
            reviewed: false,
            payload: serde_json::json!({}),
        }
    }

    fn add_op(id: &str, version: &str) -> ChangeOp {
        ChangeOp::AddVersion {
            id: ComponentId::new(id),
            display_name: format!("name-{id}"),
            version: version.to_string(),
        }
    }

    #[test]
    fn test_add_issues_mutation() {
        let hub = RecordingHub::new(vec![catalog_version("c1", "1.0")], vec![]);
        let alts = AltVersionIndex::new();
        let engine = ApplyEngine::new(&hub, &alts, &[], false);
        let outcome = engine.apply(&[add_op("c1", "1.0")]).unwrap();
        assert_eq!(outcome.ops_applied, 1);
        assert_eq!(outcome.id_mismatches, 0);
        assert_eq!(hub.added.borrow().len(), 1);
    }

    #[test]
    fn test_add_missing_from_catalog_is_fatal() {
        let hub = RecordingHub::new(vec![], vec![]);
        let alts = AltVersionIndex::new();
        let engine = ApplyEngine::new(&hub, &alts, &[], false);
        let err = engine.apply(&[add_op("c1", "1.0")]).unwrap_err();
        assert!(matches!(err, SyncError::CatalogMiss { .. }));
        assert!(hub.added.borrow().is_empty());
    }

    #[test]
    fn test_add_resolves_alternate_spelling() {
        let hub = RecordingHub::new(vec![catalog_version("c1", "v1.0")], vec![]);
        let mut alts = AltVersionIndex::new();
        alts.record(&ComponentId::new("c1"), "1.0", "v1.0");
        let engine = ApplyEngine::new(&hub, &alts, &[], false);
        let outcome = engine.apply(&[add_op("c1", "1.0")]).unwrap();
        assert_eq!(outcome.ops_applied, 1);
        assert_eq!(hub.added.borrow()[0], "https://hub/api/components/c1/versions/v1.0");
    }

    #[test]
    fn test_add_id_mismatch_warns_and_continues() {
        // Catalog answers with a renumbered component id.
        let hub = RecordingHub::new(vec![catalog_version("c1-new", "1.0")], vec![]);
        let alts = AltVersionIndex::new();
        let engine = ApplyEngine::new(&hub, &alts, &[], false);
        let outcome = engine.apply(&[add_op("c1", "1.0")]).unwrap();
        assert_eq!(outcome.ops_applied, 1);
        assert_eq!(outcome.id_mismatches, 1);
        assert_eq!(hub.added.borrow().len(), 1);
    }

    #[test]
    fn test_remove_locates_held_record() {
        let held = vec![curated("c1", "1.0")];
        let hub = RecordingHub::new(vec![], held.clone());
        let alts = AltVersionIndex::new();
        let engine = ApplyEngine::new(&hub, &alts, &held, false);
        let op = ChangeOp::RemoveVersion {
            id: ComponentId::new("c1"),
            display_name: "name-c1".to_string(),
            version: "1.0".to_string(),
        };
        let outcome = engine.apply(&[op]).unwrap();
        assert_eq!(outcome.ops_applied, 1);
        assert_eq!(hub.removed.borrow().len(), 1);
    }

    #[test]
    fn test_remove_not_found_is_fatal() {
        let hub = RecordingHub::new(vec![], vec![]);
        let alts = AltVersionIndex::new();
        let engine = ApplyEngine::new(&hub, &alts, &[], false);
        let op = ChangeOp::RemoveVersion {
            id: ComponentId::new("c1"),
            display_name: "name-c1".to_string(),
            version: "1.0".to_string(),
        };
        let err = engine.apply(&[op]).unwrap_err();
        assert!(matches!(err, SyncError::Inconsistency(_)));
    }

    #[test]
    fn test_set_license_updates_every_live_record() {
        let live = vec![curated("c1", "1.0"), curated("c1", "2.0"), curated("c2", "9.9")];
        let hub = RecordingHub::new(vec![], live);
        let alts = AltVersionIndex::new();
        let engine = ApplyEngine::new(&hub, &alts, &[], false);
        let op = ChangeOp::SetLicenseApproved {
            id: ComponentId::new("c1"),
            display_name: "name-c1".to_string(),
            approved: true,
        };
        engine.apply(&[op]).unwrap();
        let reviewed = hub.reviewed.borrow();
        // Both c1 records updated, c2 untouched
        assert_eq!(reviewed.len(), 2);
        assert!(reviewed.iter().all(|(_, approved)| *approved));
    }

    #[test]
    fn test_dry_run_runs_decision_path_without_mutations() {
        let held = vec![curated("c1", "1.0")];
        let hub = RecordingHub::new(vec![catalog_version("c2", "2.0")], held.clone());
        let alts = AltVersionIndex::new();
        let engine = ApplyEngine::new(&hub, &alts, &held, true);
        let ops = vec![
            add_op("c2", "2.0"),
            ChangeOp::RemoveVersion {
                id: ComponentId::new("c1"),
                display_name: "name-c1".to_string(),
                version: "1.0".to_string(),
            },
            ChangeOp::SetLicenseApproved {
                id: ComponentId::new("c1"),
                display_name: "name-c1".to_string(),
                approved: true,
            },
        ];
        let outcome = engine.apply(&ops).unwrap();
        assert_eq!(outcome.ops_applied, 3);
        assert!(hub.added.borrow().is_empty());
        assert!(hub.removed.borrow().is_empty());
        assert!(hub.reviewed.borrow().is_empty());
    }

    #[test]
    fn test_dry_run_still_detects_catalog_miss() {
        let hub = RecordingHub::new(vec![], vec![]);
        let alts = AltVersionIndex::new();
        let engine = ApplyEngine::new(&hub, &alts, &[], true);
        let err = engine.apply(&[add_op("c1", "1.0")]).unwrap_err();
        assert!(matches!(err, SyncError::CatalogMiss { .. }));
    }
}
