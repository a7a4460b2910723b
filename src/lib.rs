//! **manifest-sync: reconcile declarative component manifests against a
//! compliance hub's manually-curated list.**
//!
//! Source trees declare their third-party components in
//! `<project>-component-manifest.yaml` files. The hub, meanwhile, carries a
//! manually-curated list of component-versions per project-version.
//! `manifest-sync` makes the hub match the manifests with the minimal set of
//! add, remove, and review-state operations.
//!
//! ## Pipeline
//!
//! A run flows through five stages:
//!
//! 1. **[`manifest`]**: discover and parse every manifest for the project,
//!    following `include-projects` references.
//! 2. **[`canon`]**: normalize version spellings (`v` prefixes, vendor
//!    decorations, date formats) so both sides compare in one vocabulary,
//!    while remembering the alternate spellings the hub's catalog may use.
//! 3. **[`resolve`]** and **[`inventory`]**: map unstable component ids
//!    through the alias table, substitute configured fallback versions, and
//!    fold everything into two [`model::CanonicalInventory`] values, one per
//!    side.
//! 4. **[`diff`]**: a typed structural comparison producing an ordered list
//!    of [`diff::ChangeOp`]s.
//! 5. **[`apply`]**: execute the operations against the hub, or log them in
//!    dry-run mode.
//!
//! The hub itself sits behind the [`remote::Hub`] trait; the blocking REST
//! implementation is [`remote::HubClient`], and tests drive the same pipeline
//! with in-memory fakes.

#![warn(clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

pub mod apply;
pub mod canon;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod inventory;
pub mod manifest;
pub mod model;
pub mod remote;
pub mod resolve;

pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use model::{CanonicalInventory, ComponentId};
