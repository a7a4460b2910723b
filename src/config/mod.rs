//! Run configuration for a sync invocation.

use std::path::PathBuf;
use std::time::Duration;

/// Everything one sync run needs to know, assembled from CLI arguments.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Project name on the hub; also selects which manifests to load.
    pub project: String,
    /// Project version on the hub.
    pub version: String,
    /// Source tree searched recursively for manifest files.
    pub src_root: PathBuf,
    /// JSON credentials file for the hub.
    pub credentials: Option<PathBuf>,
    /// Alias/fallback configuration file. Missing file means empty table.
    pub aliases: Option<PathBuf>,
    /// HTTP request timeout
    pub timeout: Duration,
    /// Walk the full decision path but issue no mutations.
    pub dry_run: bool,
}

impl SyncConfig {
    /// Default HTTP timeout for hub requests.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
}
