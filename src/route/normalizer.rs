//! URL normalization and internal/external classification.
//!
//! Hrefs come straight out of the DOM, so anything is possible: relative
//! paths, absolute same-origin URLs, other domains, `mailto:` links and
//! bare fragments. Only same-origin paths are ever prefetched.

use url::Url;

use crate::error::{PrefetchError, Result};
use crate::route::NormalizedPath;

/// Schemes that never lead to an in-app page.
const NON_NAVIGABLE_PREFIXES: &[&str] = &["mailto:", "tel:", "javascript:"];

/// Canonicalizes hrefs relative to the current page origin.
#[derive(Debug, Clone)]
pub struct UrlNormalizer {
    origin: Url,
}

impl UrlNormalizer {
    /// Create a normalizer for the given page origin (e.g. `https://label.example`).
    pub fn new(origin: &str) -> Result<Self> {
        let origin = Url::parse(origin).map_err(|source| PrefetchError::InvalidOrigin {
            origin: origin.to_string(),
            source,
        })?;
        Ok(Self { origin })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Whether `raw` points at a page of this application.
    pub fn is_internal(&self, raw: &str) -> bool {
        if raw.is_empty() || raw.starts_with('#') {
            return false;
        }
        if NON_NAVIGABLE_PREFIXES
            .iter()
            .any(|prefix| starts_with_ignore_case(raw, prefix))
        {
            return false;
        }
        if is_root_relative(raw) {
            return true;
        }
        match self.origin.join(raw) {
            Ok(resolved) => resolved.origin() == self.origin.origin(),
            Err(_) => false,
        }
    }

    /// Strip query and fragment and resolve against the origin.
    ///
    /// Malformed input is returned unchanged.
    pub fn normalize(&self, raw: &str) -> NormalizedPath {
        if is_root_relative(raw) {
            let end = raw.find(['?', '#']).unwrap_or(raw.len());
            return NormalizedPath::from(&raw[..end]);
        }
        match self.origin.join(raw) {
            Ok(resolved) => NormalizedPath::from(resolved.path()),
            Err(_) => NormalizedPath::from(raw),
        }
    }

    /// The canonical path for `raw` if it is internal.
    pub fn internal_path(&self, raw: &str) -> Option<NormalizedPath> {
        if self.is_internal(raw) {
            Some(self.normalize(raw))
        } else {
            None
        }
    }
}

fn is_root_relative(raw: &str) -> bool {
    raw.starts_with('/') && !raw.starts_with("//")
}

fn starts_with_ignore_case(raw: &str, prefix: &str) -> bool {
    raw.len() >= prefix.len()
        && raw.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}
