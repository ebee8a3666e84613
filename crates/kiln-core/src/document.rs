//! Document model.
//!
//! A [`Document`] is created during the Load stage from one source file and
//! mutated in place by every later stage. Documents are never removed
//! mid-build: setting [`Document::skip`] excludes one from output while keeping
//! it available for cross-referencing.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::links::Link;

/// Stable identity of a document: its source path with `/` separators.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    /// Identity for a source path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self(path_key(path.as_ref()))
    }

    /// Identity as a string, suitable as a build cache key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn path_key(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// A single content unit flowing through the pipeline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Source path relative to the content directory.
    pub path: PathBuf,
    /// URL-safe identifier (derived from the path unless overridden).
    pub slug: String,
    /// Output path, e.g. `/posts/hello/`.
    pub href: String,
    /// Title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Short description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Publication date as an ISO 8601 string (e.g., "2024-01-15").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Excluded from output but kept for cross-referencing.
    #[serde(default)]
    pub skip: bool,
    /// Not published.
    #[serde(default)]
    pub draft: bool,
    /// Raw source body.
    pub content: String,
    /// Rendered HTML, populated during the Render stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Plugin-private attributes.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
    /// Raw outbound hrefs discovered in the rendered HTML.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hrefs: Vec<String>,
    /// Resolved inbound links (self-links excluded).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inlinks: Vec<Link>,
    /// Resolved outbound links (self-links excluded).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outlinks: Vec<Link>,
}

impl Document {
    /// Create a document for `path` with its slug and href derived from the path.
    ///
    /// `posts/Hello World.md` gets slug `posts/hello-world` and href
    /// `/posts/hello-world/`.
    pub fn from_source(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let path = path.into();
        let slug = slugify(&path_key(&path.with_extension("")));
        let mut document = Self {
            path,
            content: content.into(),
            ..Self::default()
        };
        document.set_slug(&slug);
        document
    }

    /// Stable identity of this document.
    #[must_use]
    pub fn id(&self) -> DocumentId {
        DocumentId::new(&self.path)
    }

    /// Override the slug and recompute the href from it.
    pub fn set_slug(&mut self, slug: &str) {
        self.slug = slug.trim_matches('/').to_owned();
        self.href = if self.slug.is_empty() {
            "/".to_owned()
        } else {
            format!("/{}/", self.slug)
        };
    }

    /// Absolute URL of the document under `base`.
    ///
    /// `base` is treated as a directory even without a trailing slash, so a
    /// site hosted at `https://example.test/docs` keeps its `/docs` prefix.
    #[must_use]
    pub fn url(&self, base: &Url) -> Option<Url> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(self.href.trim_start_matches('/')).ok()
    }

    /// Whether the document is neither skipped nor a draft.
    #[must_use]
    pub fn is_published(&self) -> bool {
        !self.skip && !self.draft
    }

    /// Read a plugin attribute from the attribute bag.
    ///
    /// Returns `None` when the key is missing or holds a different type.
    #[must_use]
    pub fn attr<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.extra.get(key)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Store a plugin attribute in the attribute bag.
    pub fn set_attr<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        self.extra.insert(key.to_owned(), value);
        Ok(())
    }
}

/// Convert text into a URL-safe slug.
///
/// Lowercases, keeps alphanumerics, collapses any run of other characters to a
/// single `-`, and preserves `/` as a path separator. Empty segments are dropped.
#[must_use]
pub fn slugify(text: &str) -> String {
    text.split(['/', '\\'])
        .map(slugify_segment)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn slugify_segment(segment: &str) -> String {
    let mut slug = String::with_capacity(segment.len());
    let mut pending_dash = false;
    for c in segment.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
