//! Inventory construction: both sides of the diff, in canonical form.
//!
//! The remote inventory comes from the hub's manually-curated record list;
//! the desired inventory is folded together from the manifest tree, with
//! alias resolution, canonicalization (recording alternate spellings), and
//! fallback-version substitution applied on the way in. Once both exist in
//! [`CanonicalInventory`] form the diff never needs to look anywhere else.

use crate::canon::{canonicalize_version, AltVersionIndex};
use crate::error::{Result, SyncError};
use crate::manifest::LoadedManifest;
use crate::model::{CanonicalInventory, ComponentId};
use crate::remote::{CuratedRecord, Hub};
use crate::resolve::{resolve_fallback, AliasTable};

/// Load the hub's curated records and canonicalize them into an inventory.
///
/// Returns the inventory plus the held records themselves: the apply stage
/// locates removal targets in them, so their version names are rewritten to
/// the canonical spelling here. Remote versions are canonicalized *without*
/// alternate recording — the hub's spellings must not pollute the index used
/// for desired-state lookups.
pub fn load_remote_inventory<H: Hub + ?Sized>(
    hub: &H,
) -> Result<(CanonicalInventory, Vec<CuratedRecord>)> {
    tracing::info!("Retrieving current curated component list");
    let mut records = hub.curated_records()?;
    tracing::debug!("Found {} curated records", records.len());

    let mut inventory = CanonicalInventory::new();
    for record in &mut records {
        let display_name = record.component_name.to_lowercase();
        let canonical = canonicalize_version(
            &display_name,
            &record.component_id,
            &record.version_name,
            None,
        );

        let entry = inventory.record_mut(&record.component_id, &display_name);
        entry.versions.insert(canonical.clone());
        // OR across versions: if any version of the component is reviewed,
        // the whole component counts as approved. License status is tracked
        // per component, not per version — a newer unapproved version of an
        // already-approved component is masked. Intentional simplification,
        // kept as specified.
        let approved = entry.license_approved.unwrap_or(false) || record.reviewed;
        entry.license_approved = Some(approved);

        record.version_name = canonical;
    }

    Ok((inventory, records))
}

/// Fold the manifest tree into the desired inventory.
///
/// Per entry: resolve the id through the alias table, canonicalize every
/// version with alternate recording, substitute fallback versions where
/// configured, and merge into the inventory — version sets union, the
/// last-specified `license-approved` wins, and an unspecified value never
/// overwrites a specified one.
pub fn build_desired_inventory<H: Hub + ?Sized>(
    hub: &H,
    aliases: &AliasTable,
    remote: &CanonicalInventory,
    manifests: &[LoadedManifest],
) -> Result<(CanonicalInventory, AltVersionIndex)> {
    let mut desired = CanonicalInventory::new();
    let mut alts = AltVersionIndex::new();

    for loaded in manifests {
        for (key, entry) in loaded.manifest.component_entries() {
            let display_name = entry.name.as_deref().unwrap_or(key).to_lowercase();
            let raw_id = entry.id.as_deref().ok_or_else(|| {
                SyncError::manifest(&loaded.path, format!("component '{key}' has no bd-id"))
            })?;
            let id = aliases.resolve_id(&ComponentId::new(raw_id));

            let mut versions = Vec::with_capacity(entry.versions.len());
            for raw in &entry.versions {
                let canonical =
                    canonicalize_version(&display_name, &id, &raw.to_string(), Some(&mut alts));
                let resolved = resolve_fallback(
                    hub,
                    aliases,
                    &mut alts,
                    remote,
                    &id,
                    &display_name,
                    &canonical,
                )?;
                versions.push(resolved);
            }

            tracing::debug!(
                "Adding component {display_name} ({id}) with versions {versions:?} to desired state"
            );
            let record = desired.record_mut(&id, &display_name);
            record.versions.extend(versions);
            if entry.license_approved.is_some() {
                record.license_approved = entry.license_approved;
            }
        }
    }

    tracing::debug!(
        "Desired inventory holds {} components; {} alternate-spelling keys recorded",
        desired.len(),
        alts.len()
    );
    Ok((desired, alts))
}
