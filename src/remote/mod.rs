//! Hub abstractions: the trait the reconciliation core talks to, and the
//! record types it exchanges.
//!
//! The core never touches HTTP directly; it depends on the [`Hub`] trait so
//! the whole engine can run against an in-memory fake in tests. The blocking
//! REST implementation lives in [`client`].

pub mod client;

pub use client::{HubClient, HubClientConfig, HubCredentials};

use crate::error::RemoteError;
use crate::model::ComponentId;

/// One manually-curated component-version record on the hub.
#[derive(Debug, Clone)]
pub struct CuratedRecord {
    /// Self link for this record (deletion/update target).
    pub href: String,
    /// Catalog URL of the component this record points at.
    pub component_url: String,
    /// Component id extracted from `component_url`.
    pub component_id: ComponentId,
    /// Component name as reported by the hub.
    pub component_name: String,
    /// Version name. Raw as fetched; the inventory builder rewrites it to
    /// canonical form on the records it holds for removal lookups.
    pub version_name: String,
    /// Whether the record's review state marks the license approved.
    pub reviewed: bool,
    /// Full record body as fetched, round-tripped on review-state updates.
    pub payload: serde_json::Value,
}

/// A catalog entry discovered by version search: the handle used to add a
/// component-version to the curated list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogVersion {
    /// Catalog URL for this component-version.
    pub href: String,
    /// Component id the catalog reports for this version. May differ from
    /// the id that was searched when the hub has renumbered a component.
    pub component_id: ComponentId,
    /// Exact version name as the catalog spells it.
    pub version_name: String,
}

/// Remote inventory service operations the reconciliation core needs.
///
/// Single-writer, batch semantics: callers issue operations sequentially and
/// treat any error as fatal to the run. No retry happens at this layer.
pub trait Hub {
    /// Fetch all manually-curated component-version records for the
    /// project-version, paging through the full list.
    fn curated_records(&self) -> Result<Vec<CuratedRecord>, RemoteError>;

    /// Free-text search of the catalog for versions of `id` matching
    /// `version`. Matching is substring/wildcard-like on the hub side, so
    /// callers must filter for exact version names themselves.
    fn search_catalog_versions(
        &self,
        id: &ComponentId,
        version: &str,
    ) -> Result<Vec<CatalogVersion>, RemoteError>;

    /// Add a catalog component-version to the curated list.
    fn add_curated_version(&self, catalog_href: &str) -> Result<(), RemoteError>;

    /// Delete a curated record.
    fn remove_curated_record(&self, record_href: &str) -> Result<(), RemoteError>;

    /// Set the review state of one curated record.
    fn set_review_status(&self, record: &CuratedRecord, approved: bool)
        -> Result<(), RemoteError>;
}

/// Extract the trailing path segment of a catalog component URL, which is
/// the component id.
pub(crate) fn component_id_from_url(url: &str) -> ComponentId {
    let id = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url);
    ComponentId::new(id)
}
