//! Unified error types for manifest-sync.
//!
//! The taxonomy mirrors how a reconciliation run can fail: configuration
//! errors (bad manifest structure, missing credentials, a fallback version
//! the catalog has never heard of) abort immediately; inconsistency errors
//! mean the hub and our held state disagree; remote errors are transport or
//! API failures surfaced without retry.

use crate::model::ComponentId;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for manifest-sync operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SyncError {
    /// Configuration errors: bad manifest structure, missing credentials,
    /// unusable alias/fallback tables. Always fatal.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A manifest file could not be parsed or contained unrecognized keys.
    #[error("Manifest error in {path}: {message}")]
    Manifest { path: PathBuf, message: String },

    /// The hub and our view of it disagree (e.g. a record queued for removal
    /// cannot be located). Fatal.
    #[error("Inconsistency: {0}")]
    Inconsistency(String),

    /// A desired version (and every registered alternate spelling) is absent
    /// from the hub's catalog. Fatal only when an add actually needs it.
    #[error(
        "Could not find version {version} for {display_name} ({id}) \
         (or any alternate spelling) in the catalog"
    )]
    CatalogMiss {
        display_name: String,
        id: ComponentId,
        version: String,
    },

    /// Errors talking to the hub REST API.
    #[error("Hub request failed: {0}")]
    Remote(#[from] RemoteError),

    /// IO errors with path context.
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Specific remote-API error kinds.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RemoteError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("hub returned HTTP {status} for {url}")]
    Api { status: u16, url: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response shape: {0}")]
    InvalidResponse(String),

    #[error("not found on hub: {0}")]
    NotFound(String),
}

/// Convenient Result type for manifest-sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a manifest error with file context.
    pub fn manifest(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an inconsistency error.
    pub fn inconsistency(message: impl Into<String>) -> Self {
        Self::Inconsistency(message.into())
    }

    /// Create a catalog-miss error for a component-version.
    pub fn catalog_miss(
        display_name: impl Into<String>,
        id: &ComponentId,
        version: impl Into<String>,
    ) -> Self {
        Self::CatalogMiss {
            display_name: display_name.into(),
            id: id.clone(),
            version: version.into(),
        }
    }

    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        let message = format!("{source}");
        Self::Io {
            path: Some(path),
            message,
            source,
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}
