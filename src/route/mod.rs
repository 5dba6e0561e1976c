//! Navigation targets and their canonical form.
//!
//! - [`NormalizedPath`]: a path with query and fragment removed, the key
//!   used for deduplication everywhere else in the crate
//! - [`LinkTarget`]: what a link points at, either a raw href or a router path object
//! - [`normalizer`]: internal/external classification and canonicalization

pub mod normalizer;

use std::borrow::{Borrow, Cow};
use std::fmt;

use serde::{Deserialize, Serialize};

pub use normalizer::UrlNormalizer;

/// A canonical in-app path such as `/cabinet/releases`.
///
/// Values built with `From` are taken verbatim; use
/// [`UrlNormalizer::normalize`] to canonicalize untrusted hrefs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedPath(String);

impl NormalizedPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NormalizedPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NormalizedPath {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NormalizedPath {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Router path object (`{ pathname, query, hash }`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlObject {
    #[serde(default)]
    pub pathname: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
}

/// The destination a link component was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkTarget {
    Href(String),
    Object(UrlObject),
}

impl LinkTarget {
    /// The string form used for prefetching.
    ///
    /// Path objects contribute only their pathname; query and hash never
    /// take part in prefetch keys. A path object without a pathname yields
    /// an empty string, which no detector treats as internal.
    pub fn href(&self) -> Cow<'_, str> {
        match self {
            LinkTarget::Href(href) => Cow::Borrowed(href.as_str()),
            LinkTarget::Object(obj) => match obj.pathname.as_deref() {
                Some(path) => Cow::Borrowed(path),
                None => Cow::Borrowed(""),
            },
        }
    }

    /// The string form used for navigation, query and hash included.
    pub fn full_href(&self) -> String {
        match self {
            LinkTarget::Href(href) => href.clone(),
            LinkTarget::Object(obj) => {
                let mut href = obj.pathname.clone().unwrap_or_default();
                if let Some(query) = obj.query.as_deref().filter(|q| !q.is_empty()) {
                    href.push('?');
                    href.push_str(query.trim_start_matches('?'));
                }
                if let Some(hash) = obj.hash.as_deref().filter(|h| !h.is_empty()) {
                    href.push('#');
                    href.push_str(hash.trim_start_matches('#'));
                }
                href
            }
        }
    }
}

impl From<&str> for LinkTarget {
    fn from(value: &str) -> Self {
        LinkTarget::Href(value.to_string())
    }
}
