//! Link graph construction from rendered HTML.

use std::sync::LazyLock;

use kiln_cache::{CacheBucketExt, content_hash};
use kiln_core::{BuildContext, Plugin, PluginError, RenderPlugin, Stage, assign_links, priority};
use regex::Regex;

/// Cache namespace for hrefs extracted from rendered HTML.
const NAMESPACE: &str = "link_hrefs";

static HREF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a\s[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// Fills `hrefs` from rendered HTML and assigns inlinks and outlinks.
///
/// Runs after rendering so every document's HTML exists. Targets are resolved
/// through the document index, so links to skipped documents still resolve.
pub struct LinkGraph;

impl Plugin for LinkGraph {
    fn name(&self) -> &str {
        "links"
    }

    fn priority(&self, _stage: Stage) -> i32 {
        priority::LATE
    }

    fn as_render(&self) -> Option<&dyn RenderPlugin> {
        Some(self)
    }
}

impl RenderPlugin for LinkGraph {
    fn render(&self, ctx: &BuildContext) -> Result<(), PluginError> {
        let bucket = ctx.cache_bucket(NAMESPACE);

        ctx.process_where(
            |doc| doc.html.is_some(),
            |doc| {
                let html = doc.html.as_deref().unwrap_or_default();
                let id = doc.id();
                let hash = content_hash(html.as_bytes());
                doc.hrefs = match bucket.get_json::<Vec<String>>(id.as_str(), &hash) {
                    Some(hrefs) => hrefs,
                    None => {
                        let hrefs = extract_hrefs(html);
                        bucket.set_json(id.as_str(), &hash, &hrefs);
                        hrefs
                    }
                };
                Ok(())
            },
        )?;

        let index = ctx.index();
        let resolver = ctx.link_resolver();
        let links = ctx.map_documents(|doc| {
            Ok(resolver.resolve_all(&index, doc, doc.hrefs.iter().map(String::as_str)))
        })?;

        let edges: usize = links.iter().map(Vec::len).sum();
        let unresolved = links
            .iter()
            .flatten()
            .filter(|link| link.internal && link.target.is_none())
            .count();
        tracing::debug!(edges, unresolved, "Resolved links");

        ctx.documents()
            .update(|docs| assign_links(docs, links.into_iter().flatten()));
        Ok(())
    }
}

/// Every `href` of an `<a>` element in `html`, in document order.
///
/// Empty values are dropped and `&amp;` is decoded.
#[must_use]
pub fn extract_hrefs(html: &str) -> Vec<String> {
    HREF_PATTERN
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim().replace("&amp;", "&"))
        .filter(|href| !href.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_hrefs() {
        let html = r#"<p><a href="/a/">A</a> <A class="x" HREF='/b/?x=1&amp;y=2'>B</A>
            <a name="anchor">no href</a> <a href="">empty</a> <link href="/style.css"></p>"#;

        assert_eq!(extract_hrefs(html), ["/a/", "/b/?x=1&y=2"]);
    }

    #[test]
    fn test_extract_hrefs_none() {
        assert!(extract_hrefs("<p>plain</p>").is_empty());
    }
}
