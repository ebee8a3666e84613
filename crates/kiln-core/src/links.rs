//! Link resolution and the inbound/outbound link graph.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::document::{Document, DocumentId};
use crate::index::DocumentIndex;

/// A directed edge from one document to a link target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Document containing the link.
    pub source: DocumentId,
    /// Absolute URL of the source document.
    pub source_url: String,
    /// Link target as written in the document.
    pub raw: String,
    /// Absolute target URL, without fragment.
    pub target_url: String,
    /// Resolved document, for internal links that matched the index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<DocumentId>,
    /// Whether the target lives on the site.
    pub internal: bool,
    /// Whether the link points back at its own document.
    pub self_link: bool,
}

/// Resolves raw link targets against the site URL and a [`DocumentIndex`].
#[derive(Clone, Debug)]
pub struct LinkResolver {
    base: Url,
    host: Option<String>,
}

impl LinkResolver {
    /// Create a resolver for a site published at `base`.
    ///
    /// `base` is treated as a directory, so `https://example.test/docs` and
    /// `https://example.test/docs/` behave the same.
    #[must_use]
    pub fn new(base: &Url) -> Self {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let host = base.host_str().map(str::to_ascii_lowercase);
        Self { base, host }
    }

    /// Site base URL.
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve `raw`, found in `source`, into a [`Link`].
    ///
    /// Relative and protocol-relative targets are resolved against the source
    /// document's absolute URL. Returns `None` when `raw` is not a valid URL
    /// reference. An internal target that matches no document, or that lies
    /// outside the site's base path, still yields a link with `target` set to
    /// `None`.
    #[must_use]
    pub fn resolve(&self, index: &DocumentIndex, source: &Document, raw: &str) -> Option<Link> {
        let source_url = source.url(&self.base)?;
        let mut resolved = source_url.join(raw.trim()).ok()?;
        resolved.set_fragment(None);

        let internal = self.is_internal(&resolved);
        let target = if internal {
            self.site_path(&resolved)
                .and_then(|path| index.resolve_path(path))
                .map(|doc| doc.id())
        } else {
            None
        };

        let source_id = source.id();
        let self_link = target.as_ref() == Some(&source_id) || resolved == source_url;

        Some(Link {
            source: source_id,
            source_url: source_url.to_string(),
            raw: raw.to_owned(),
            target_url: resolved.to_string(),
            target,
            internal,
            self_link,
        })
    }

    /// Resolve every href of `source`, dropping targets that are not valid URLs.
    pub fn resolve_all<'a>(
        &self,
        index: &DocumentIndex,
        source: &Document,
        hrefs: impl IntoIterator<Item = &'a str>,
    ) -> Vec<Link> {
        hrefs
            .into_iter()
            .filter_map(|raw| {
                let link = self.resolve(index, source, raw);
                if link.is_none() {
                    tracing::debug!(source = %source.path.display(), raw, "Ignoring invalid link target");
                }
                link
            })
            .collect()
    }

    fn is_internal(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        match url.host_str() {
            None => true,
            Some(host) => self
                .host
                .as_deref()
                .is_some_and(|site| site.eq_ignore_ascii_case(host)),
        }
    }

    /// Path of `url` relative to the site root, or `None` outside of it.
    fn site_path<'u>(&self, url: &'u Url) -> Option<&'u str> {
        let path = url.path();
        path.strip_prefix(self.base.path())
            .or_else(|| (path == self.base.path().trim_end_matches('/')).then_some(""))
    }
}

/// Replace every document's inlinks and outlinks from one pass over `links`.
///
/// Self-links are dropped. Outlinks are deduplicated by target URL and inlinks
/// by source URL, so linking to the same target repeatedly yields one edge on
/// each side. Edges whose source or target is not in `documents` are ignored.
pub fn assign_links(documents: &mut [Document], links: impl IntoIterator<Item = Link>) {
    let position: HashMap<DocumentId, usize> = documents
        .iter()
        .enumerate()
        .map(|(i, doc)| (doc.id(), i))
        .collect();

    let mut inlinks: Vec<Vec<Link>> = vec![Vec::new(); documents.len()];
    let mut outlinks: Vec<Vec<Link>> = vec![Vec::new(); documents.len()];
    let mut seen_out: HashSet<(usize, String)> = HashSet::new();
    let mut seen_in: HashSet<(usize, String)> = HashSet::new();

    for link in links {
        if link.self_link {
            continue;
        }
        let target = link.target.as_ref().and_then(|id| position.get(id)).copied();
        if let Some(target) = target
            && seen_in.insert((target, link.source_url.clone()))
        {
            inlinks[target].push(link.clone());
        }
        if let Some(&source) = position.get(&link.source)
            && seen_out.insert((source, link.target_url.clone()))
        {
            outlinks[source].push(link);
        }
    }

    for ((doc, ins), outs) in documents.iter_mut().zip(inlinks).zip(outlinks) {
        doc.inlinks = ins;
        doc.outlinks = outs;
    }
}
