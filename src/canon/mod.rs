//! Version canonicalization.
//!
//! The hub's knowledgebase is inconsistent about version spellings: a leading
//! `v` comes and goes, Erlang releases are sometimes prefixed `OTP-`, Go
//! toolchains `go`, and date-style certifi versions appear both zero-padded
//! (`2023.05.07`) and bare (`2023.5.7`). All comparisons in this crate happen
//! on a single canonical spelling; the plausible non-canonical spellings are
//! remembered in an [`AltVersionIndex`] so the catalog can be probed for them
//! when the canonical one has not appeared yet.
//!
//! Canonicalization is a pure function of `(display_name, id, raw)` and is
//! idempotent; recording alternates is an explicit side channel scoped to one
//! run, requested only for desired-state (manifest) versions. Remote-reported
//! versions are canonicalized without it so they never pollute the index.

use crate::model::ComponentId;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

/// Matches a version that may start with `v`, followed by only digits and
/// dots. The whole string must match for the `v` to be stripped.
static V_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(v?)([.0-9]+)$").expect("static regex"));

/// Matches a date-style version: `YYYY.M.D` with 1-2 digit month/day.
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{4})\.([0-9]{1,2})\.([0-9]{1,2})$").expect("static regex")
});

/// Per-run index of alternate version spellings.
///
/// Keyed by `(component id, canonical version)`; values are spellings that
/// canonicalize to that version and may appear in the catalog before the
/// canonical one does. Populated only while canonicalizing desired-state
/// versions, consulted only during apply-stage catalog lookups.
#[derive(Debug, Default)]
pub struct AltVersionIndex {
    alternates: HashMap<(ComponentId, String), BTreeSet<String>>,
}

impl AltVersionIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `alternate` as a spelling of `canonical` for `id`.
    pub fn record(&mut self, id: &ComponentId, canonical: &str, alternate: &str) {
        tracing::trace!(
            "Saving '{alternate}' as an alternate spelling of '{canonical}' for component {id}"
        );
        self.alternates
            .entry((id.clone(), canonical.to_string()))
            .or_default()
            .insert(alternate.to_string());
    }

    /// Alternate spellings registered for `(id, canonical)`, if any.
    pub fn alternates(&self, id: &ComponentId, canonical: &str) -> Option<&BTreeSet<String>> {
        self.alternates.get(&(id.clone(), canonical.to_string()))
    }

    /// Number of `(id, version)` keys with at least one alternate.
    pub fn len(&self) -> usize {
        self.alternates.len()
    }

    /// Whether no alternates have been recorded.
    pub fn is_empty(&self) -> bool {
        self.alternates.is_empty()
    }
}

/// Canonicalize a raw version string for a component.
///
/// Rules, in order:
/// 1. Strip a leading `v` when the remainder is all digits and dots.
/// 2. Display-name-keyed heuristics: names starting with `erlang` drop a
///    leading `OTP-`; names starting with `go programming language` drop a
///    leading `go`; names containing `certifi` zero-pad date versions.
/// 3. When `alts` is given, register every distinct non-canonical spelling
///    computed above (including `v`-prefixed variants) for later catalog
///    probing.
pub fn canonicalize_version(
    display_name: &str,
    id: &ComponentId,
    raw: &str,
    alts: Option<&mut AltVersionIndex>,
) -> String {
    let name = display_name.to_lowercase();

    // Strip any leading "v" before other heuristics. Note the regex also
    // matches plain digits-and-dots versions; that match is remembered so a
    // v-prefixed spelling gets registered as an alternate either way.
    let v_captures = V_PREFIX_RE.captures(raw);
    let stripped = match &v_captures {
        Some(c) => c[2].to_string(),
        None => raw.to_string(),
    };

    // Component-specific heuristics compute the canonical spelling and, for
    // some, a likely alternate.
    let mut canonical = stripped.clone();
    let mut heuristic_alt = stripped.clone();
    if name.starts_with("erlang") {
        if let Some(rest) = stripped.strip_prefix("OTP-") {
            canonical = rest.to_string();
        }
    } else if name.starts_with("go programming language") {
        if let Some(rest) = stripped.strip_prefix("go") {
            canonical = rest.to_string();
        }
    } else if name.contains("certifi") {
        if let Some(m) = DATE_RE.captures(&stripped) {
            // Zero-padded month/day is canonical; conda-style unpadded
            // spellings show up in the catalog, so keep one as an alternate.
            canonical = format!("{}.{:0>2}.{:0>2}", &m[1], &m[2], &m[3]);
            heuristic_alt = format!("{}.{}.{}", dec(&m[1]), dec(&m[2]), dec(&m[3]));
        }
    }

    if let Some(index) = alts {
        for candidate in [heuristic_alt.as_str(), stripped.as_str()] {
            // If this looked like a digits-and-dots version, the v-prefixed
            // spelling is plausible too.
            if v_captures.is_some() {
                index.record(id, &canonical, &format!("v{candidate}"));
            }
            if candidate != canonical {
                index.record(id, &canonical, candidate);
            }
        }
    }

    canonical
}

/// Parse a digit capture, dropping leading zeros.
fn dec(digits: &str) -> u32 {
    digits.parse().expect("regex capture is all digits")
}
