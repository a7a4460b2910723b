//! Blocking REST client for the hub's project/catalog API.
//!
//! Authentication is cookie-session based: a form login against
//! `j_spring_security_check`, with the CSRF token from the login response
//! echoed on every mutating request. All calls are synchronous; the engine
//! issues operations one at a time and treats any failure as fatal, so there
//! is no retry or backoff here.

use super::{component_id_from_url, CatalogVersion, CuratedRecord, Hub};
use crate::error::RemoteError;
use crate::model::ComponentId;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Media type for bill-of-materials record reads and review-state updates.
const BOM_MEDIA_TYPE: &str = "application/vnd.blackducksoftware.bill-of-materials-6+json";
/// Media type for adding a catalog version to the curated list.
const BOM_COMPONENT_MEDIA_TYPE: &str = "application/vnd.blackducksoftware.bomcomponent-1+json";
/// Page size for the curated-record listing.
const PAGE_LIMIT: usize = 1000;
/// Result cap for catalog version searches.
const SEARCH_LIMIT: usize = 100;

// ============================================================================
// Credentials and configuration
// ============================================================================

/// Hub endpoint and login material, loaded from a JSON credentials file.
#[derive(Debug, Clone, Deserialize)]
pub struct HubCredentials {
    /// Base URL of the hub, e.g. `https://hub.example.com`.
    pub url: String,
    pub username: String,
    pub password: String,
    /// Skip TLS certificate verification. Some internal hubs run with
    /// self-signed certificates.
    #[serde(default)]
    pub insecure: bool,
}

impl HubCredentials {
    /// Load credentials from a JSON file.
    pub fn load(path: &Path) -> Result<Self, RemoteError> {
        let content = fs::read_to_string(path).map_err(|e| {
            RemoteError::Auth(format!("cannot read credentials file {}: {e}", path.display()))
        })?;
        let creds: Self = serde_json::from_str(&content).map_err(|e| {
            RemoteError::Auth(format!("malformed credentials file {}: {e}", path.display()))
        })?;
        Ok(creds)
    }
}

/// Configuration for the hub client.
#[derive(Debug, Clone)]
pub struct HubClientConfig {
    /// HTTP request timeout
    pub timeout: Duration,
}

impl Default for HubClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// A paged listing. Raw item values are kept for curated records, whose full
/// bodies round-trip on review-state updates.
#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    href: String,
}

/// The fields we read out of a curated bill-of-materials record.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BomComponentFields {
    component: String,
    component_name: String,
    #[serde(default)]
    component_version_name: String,
    #[serde(default)]
    review_status: String,
    #[serde(rename = "_meta")]
    meta: Meta,
}

#[derive(Debug, Deserialize)]
struct NamedPage {
    #[serde(default)]
    items: Vec<NamedItem>,
}

/// A project or project-version listing entry. Projects carry `name`,
/// versions carry `versionName`; only one is present at a time.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamedItem {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version_name: Option<String>,
    #[serde(rename = "_meta")]
    meta: Meta,
}

// ============================================================================
// Client
// ============================================================================

/// Authenticated blocking client bound to one project-version.
pub struct HubClient {
    http: reqwest::blocking::Client,
    /// CSRF token from the login response, echoed on mutations.
    csrf_token: Option<String>,
    /// `{base}/api/components/` prefix for catalog lookups.
    component_base: String,
    /// Curated-component listing URL for the bound project-version.
    pv_components_url: String,
}

impl HubClient {
    /// Log in to the hub and resolve `project`/`version` to their API URLs.
    pub fn connect(
        creds: &HubCredentials,
        project: &str,
        version: &str,
        config: &HubClientConfig,
    ) -> Result<Self, RemoteError> {
        let base = creds.url.trim_end_matches('/').to_string();
        let http = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .danger_accept_invalid_certs(creds.insecure)
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let csrf_token = login(&http, &base, creds)?;

        let mut client = Self {
            http,
            csrf_token,
            component_base: format!("{base}/api/components/"),
            pv_components_url: String::new(),
        };

        tracing::debug!("Looking up project {project}");
        let project_href = client.find_by_name(
            &format!("{base}/api/projects"),
            "name",
            project,
            |item| item.name.as_deref(),
        )?;
        tracing::debug!("Looking up project version {version}");
        let version_href = client.find_by_name(
            &format!("{project_href}/versions"),
            "versionName",
            version,
            |item| item.version_name.as_deref(),
        )?;
        client.pv_components_url = format!("{version_href}/components");

        Ok(client)
    }

    /// Search a named listing and return the href of the exact match.
    fn find_by_name(
        &self,
        url: &str,
        query_field: &str,
        wanted: &str,
        name_of: impl Fn(&NamedItem) -> Option<&str>,
    ) -> Result<String, RemoteError> {
        let response = self
            .http
            .get(url)
            .query(&[
                ("q", format!("{query_field}:{wanted}")),
                ("limit", SEARCH_LIMIT.to_string()),
            ])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let page: NamedPage = check(response)?
            .json()
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;

        // Listing queries are prefix searches; insist on an exact name.
        page.items
            .into_iter()
            .find(|item| name_of(item) == Some(wanted))
            .map(|item| item.meta.href)
            .ok_or_else(|| RemoteError::NotFound(format!("{query_field} {wanted} at {url}")))
    }

    /// Build a mutating request with the CSRF token attached.
    fn mutate(
        &self,
        method: reqwest::Method,
        url: &str,
    ) -> reqwest::blocking::RequestBuilder {
        let mut builder = self.http.request(method, url);
        if let Some(token) = &self.csrf_token {
            builder = builder.header("X-CSRF-TOKEN", token);
        }
        builder
    }
}

/// Form login. Returns the CSRF token when the hub hands one out.
fn login(
    http: &reqwest::blocking::Client,
    base: &str,
    creds: &HubCredentials,
) -> Result<Option<String>, RemoteError> {
    let url = format!("{base}/j_spring_security_check");
    let response = http
        .post(&url)
        .form(&[
            ("j_username", creds.username.as_str()),
            ("j_password", creds.password.as_str()),
        ])
        .send()
        .map_err(|e| RemoteError::Network(e.to_string()))?;

    if !response.status().is_success() {
        return Err(RemoteError::Auth(format!(
            "hub rejected login for {} with HTTP {}",
            creds.username,
            response.status()
        )));
    }

    let token = response
        .headers()
        .get("X-CSRF-TOKEN")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Ok(token)
}

/// Map a non-success status to an API error, otherwise pass the response on.
fn check(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(RemoteError::Api {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

/// The search endpoint rejects some legitimate version characters such as
/// `+`. Substitute the single-character wildcard; the exact-match filter on
/// the results keeps false positives out.
fn search_safe(version: &str) -> String {
    version.replace('+', "_")
}

/// Component id of the catalog version at `href`, which has the shape
/// `{base}/api/components/{component_id}/versions/{version_id}`.
fn component_id_from_version_href(href: &str) -> ComponentId {
    let id = href
        .split("/components/")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .unwrap_or(href);
    ComponentId::new(id)
}

impl Hub for HubClient {
    fn curated_records(&self) -> Result<Vec<CuratedRecord>, RemoteError> {
        let mut records = Vec::new();
        let mut offset = 0usize;
        loop {
            let response = self
                .http
                .get(&self.pv_components_url)
                .header(reqwest::header::ACCEPT, BOM_MEDIA_TYPE)
                .query(&[
                    ("limit", PAGE_LIMIT.to_string()),
                    ("offset", offset.to_string()),
                    ("filter", "bomMatchType:manually_added".to_string()),
                ])
                .send()
                .map_err(|e| RemoteError::Network(e.to_string()))?;
            let page: RawPage = check(response)?
                .json()
                .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;

            let count = page.items.len();
            for payload in page.items {
                let fields: BomComponentFields = serde_json::from_value(payload.clone())
                    .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
                records.push(CuratedRecord {
                    href: fields.meta.href,
                    component_id: component_id_from_url(&fields.component),
                    component_url: fields.component,
                    component_name: fields.component_name,
                    version_name: fields.component_version_name,
                    reviewed: fields.review_status == "REVIEWED",
                    payload,
                });
            }

            if count < PAGE_LIMIT {
                break;
            }
            offset += count;
        }
        Ok(records)
    }

    fn search_catalog_versions(
        &self,
        id: &ComponentId,
        version: &str,
    ) -> Result<Vec<CatalogVersion>, RemoteError> {
        let url = format!("{}{id}/versions", self.component_base);
        tracing::debug!("Searching for version {version} at {url}");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", format!("versionName:{}", search_safe(version))),
                ("limit", SEARCH_LIMIT.to_string()),
            ])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let page: NamedPage = check(response)?
            .json()
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        tracing::debug!("Found {} items", page.items.len());

        Ok(page
            .items
            .into_iter()
            .filter_map(|item| {
                let version_name = item.version_name?;
                let component_id = component_id_from_version_href(&item.meta.href);
                Some(CatalogVersion {
                    href: item.meta.href,
                    component_id,
                    version_name,
                })
            })
            .collect())
    }

    fn add_curated_version(&self, catalog_href: &str) -> Result<(), RemoteError> {
        let body = serde_json::json!({ "component": catalog_href });
        let response = self
            .mutate(reqwest::Method::POST, &self.pv_components_url)
            .header(reqwest::header::CONTENT_TYPE, BOM_COMPONENT_MEDIA_TYPE)
            .body(body.to_string())
            .send()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        check(response)?;
        Ok(())
    }

    fn remove_curated_record(&self, record_href: &str) -> Result<(), RemoteError> {
        let response = self
            .mutate(reqwest::Method::DELETE, record_href)
            .send()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        check(response)?;
        Ok(())
    }

    fn set_review_status(
        &self,
        record: &CuratedRecord,
        approved: bool,
    ) -> Result<(), RemoteError> {
        // The update is a full-body PUT: round-trip the fetched record with
        // only the review status changed.
        let mut payload = record.payload.clone();
        let status = if approved { "REVIEWED" } else { "NOT_REVIEWED" };
        match payload.as_object_mut() {
            Some(map) => {
                map.insert(
                    "reviewStatus".to_string(),
                    serde_json::Value::String(status.to_string()),
                );
            }
            None => {
                return Err(RemoteError::InvalidResponse(format!(
                    "curated record {} is not a JSON object",
                    record.href
                )));
            }
        }

        let response = self
            .mutate(reqwest::Method::PUT, &record.href)
            .header(reqwest::header::CONTENT_TYPE, BOM_MEDIA_TYPE)
            .header(reqwest::header::ACCEPT, BOM_MEDIA_TYPE)
            .body(payload.to_string())
            .send()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        check(response)?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
