//! Sync command handler.
//!
//! Wires the stages together: load configuration and manifests, pull the
//! remote state, diff, apply. The hub-facing part lives in [`reconcile`],
//! which is generic over [`Hub`] so the whole flow can run against an
//! in-memory fake in tests.

use crate::apply::ApplyEngine;
use crate::config::SyncConfig;
use crate::diff::diff;
use crate::error::{Result, SyncError};
use crate::inventory::{build_desired_inventory, load_remote_inventory};
use crate::manifest::{discover_manifests, LoadedManifest};
use crate::remote::{Hub, HubClient, HubClientConfig, HubCredentials};
use crate::resolve::AliasTable;

/// What a reconciliation run did.
#[derive(Debug, Default)]
pub struct SyncSummary {
    /// Components in the remote curated list before the run.
    pub remote_components: usize,
    /// Components the manifests declared.
    pub desired_components: usize,
    /// Change operations the diff produced.
    pub ops_planned: usize,
    /// Operations executed (or walked through, in dry-run).
    pub ops_applied: usize,
    /// Adds whose catalog handle reported an unexpected component id.
    pub id_mismatches: usize,
    pub dry_run: bool,
}

/// Full reconciliation against an already-connected hub.
pub fn reconcile<H: Hub + ?Sized>(
    hub: &H,
    aliases: &AliasTable,
    manifests: &[LoadedManifest],
    dry_run: bool,
) -> Result<SyncSummary> {
    let (remote, held_records) = load_remote_inventory(hub)?;
    let (desired, alts) = build_desired_inventory(hub, aliases, &remote, manifests)?;

    let ops = diff(&remote, &desired);
    let mut summary = SyncSummary {
        remote_components: remote.len(),
        desired_components: desired.len(),
        ops_planned: ops.len(),
        dry_run,
        ..SyncSummary::default()
    };

    if ops.is_empty() {
        tracing::info!("Remote curated list already matches the manifests; nothing to do");
        return Ok(summary);
    }

    tracing::info!("Computed {} change operations", ops.len());
    for op in &ops {
        tracing::debug!("Planned: {op}");
    }

    let engine = ApplyEngine::new(hub, &alts, &held_records, dry_run);
    let outcome = engine.apply(&ops)?;
    summary.ops_applied = outcome.ops_applied;
    summary.id_mismatches = outcome.id_mismatches;

    if outcome.id_mismatches > 0 {
        tracing::warn!(
            "{} component id mismatches encountered; the alias table likely needs updating",
            outcome.id_mismatches
        );
    }

    Ok(summary)
}

/// Run the sync command, returning the desired exit code.
pub fn run_sync(config: &SyncConfig) -> Result<i32> {
    tracing::info!(
        "Preparing to update components for {} {}",
        config.project,
        config.version
    );

    let aliases = match &config.aliases {
        Some(path) => AliasTable::load(path)?,
        None => AliasTable::new(),
    };

    let creds_path = config
        .credentials
        .as_ref()
        .ok_or_else(|| SyncError::config("a credentials file is required (--credentials)"))?;
    let creds = HubCredentials::load(creds_path)?;

    let client_config = HubClientConfig {
        timeout: config.timeout,
    };
    let hub = HubClient::connect(&creds, &config.project, &config.version, &client_config)?;

    let manifests = discover_manifests(&config.src_root, &config.project)?;

    let summary = reconcile(&hub, &aliases, &manifests, config.dry_run)?;

    if summary.ops_planned == 0 {
        tracing::info!("No changes needed");
    } else if summary.dry_run {
        tracing::info!(
            "Dry run complete: {} operations would be applied ({} remote components, {} desired)",
            summary.ops_planned,
            summary.remote_components,
            summary.desired_components
        );
    } else {
        tracing::info!(
            "Applied {} of {} operations ({} remote components, {} desired)",
            summary.ops_applied,
            summary.ops_planned,
            summary.remote_components,
            summary.desired_components
        );
    }

    Ok(0)
}
