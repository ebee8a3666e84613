//! Point-in-time lookup of documents by slug and output path.

use std::collections::HashMap;
use std::sync::Arc;

use crate::document::{Document, DocumentId};
use crate::store::DocumentHandle;

/// Two documents claimed the same slug while building an index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlugConflict {
    /// Normalized slug both documents claimed.
    pub slug: String,
    /// Document that lost the slug.
    pub replaced: DocumentId,
    /// Document that now owns the slug.
    pub winner: DocumentId,
}

/// Slug and href lookup over the document store.
///
/// The keys reflect the store at the moment the index was built: a later
/// change to a slug or href is not picked up until
/// [`BuildContext::rebuild_index`](crate::BuildContext::rebuild_index). The
/// documents themselves are live, so a lookup returns the current version
/// including fields set by later stages.
///
/// Slug lookups are case-insensitive. When several documents share a slug the
/// one registered last wins and the collision is recorded in
/// [`conflicts`](Self::conflicts).
#[derive(Debug, Default)]
pub struct DocumentIndex {
    handles: Vec<DocumentHandle>,
    by_slug: HashMap<String, usize>,
    by_href: HashMap<String, usize>,
    conflicts: Vec<SlugConflict>,
}

impl DocumentIndex {
    /// Build an index with one pass over `handles`.
    #[must_use]
    pub fn build(handles: &[DocumentHandle]) -> Self {
        let documents: Vec<Arc<Document>> = handles.iter().map(DocumentHandle::load).collect();
        let mut by_slug = HashMap::with_capacity(documents.len());
        let mut by_href = HashMap::with_capacity(documents.len());
        let mut conflicts = Vec::new();

        for (i, doc) in documents.iter().enumerate() {
            let slug = normalize_slug(&doc.slug);
            if let Some(previous) = by_slug.insert(slug.clone(), i) {
                let previous = &documents[previous];
                tracing::warn!(
                    slug = %slug,
                    replaced = %previous.path.display(),
                    winner = %doc.path.display(),
                    "Duplicate slug, last document wins"
                );
                conflicts.push(SlugConflict {
                    slug,
                    replaced: previous.id(),
                    winner: doc.id(),
                });
            }
            by_href.insert(normalize_path(&doc.href).to_owned(), i);
        }

        tracing::debug!(
            documents = documents.len(),
            conflicts = conflicts.len(),
            "Built document index"
        );

        Self {
            handles: handles.to_vec(),
            by_slug,
            by_href,
            conflicts,
        }
    }

    /// Build an index over documents that are not part of a store.
    #[must_use]
    pub fn from_documents(documents: &[Document]) -> Self {
        let handles: Vec<DocumentHandle> =
            documents.iter().cloned().map(DocumentHandle::new).collect();
        Self::build(&handles)
    }

    /// Look up a document by slug, ignoring case and one leading/trailing slash.
    #[must_use]
    pub fn by_slug(&self, slug: &str) -> Option<Arc<Document>> {
        self.by_slug
            .get(&normalize_slug(slug))
            .map(|&i| self.handles[i].load())
    }

    /// Look up a document by output path, ignoring one leading/trailing slash.
    #[must_use]
    pub fn by_href(&self, href: &str) -> Option<Arc<Document>> {
        self.by_href
            .get(normalize_path(href))
            .map(|&i| self.handles[i].load())
    }

    /// Resolve a site-relative path to a document.
    ///
    /// Tries the slug first, then the output path with and without its
    /// trailing slash.
    #[must_use]
    pub fn resolve_path(&self, path: &str) -> Option<Arc<Document>> {
        let trimmed = path.strip_suffix('/').unwrap_or(path);
        self.by_slug(trimmed)
            .or_else(|| self.by_href(trimmed))
            .or_else(|| self.by_href(&format!("{trimmed}/")))
    }

    /// Slug collisions found while building.
    #[must_use]
    pub fn conflicts(&self) -> &[SlugConflict] {
        &self.conflicts
    }

    /// Normalized slugs with the document each resolves to.
    pub fn slugs(&self) -> impl Iterator<Item = (&str, Arc<Document>)> {
        self.by_slug
            .iter()
            .map(|(slug, &i)| (slug.as_str(), self.handles[i].load()))
    }

    /// Normalized output paths with the document each resolves to.
    pub fn hrefs(&self) -> impl Iterator<Item = (&str, Arc<Document>)> {
        self.by_href
            .iter()
            .map(|(href, &i)| (href.as_str(), self.handles[i].load()))
    }

    /// Handles of the indexed documents, in store order.
    #[must_use]
    pub fn handles(&self) -> &[DocumentHandle] {
        &self.handles
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Strip a single leading and a single trailing slash.
fn normalize_path(path: &str) -> &str {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.strip_suffix('/').unwrap_or(path)
}

fn normalize_slug(slug: &str) -> String {
    normalize_path(slug).to_lowercase()
}
