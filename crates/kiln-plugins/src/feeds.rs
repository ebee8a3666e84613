//! The `all` feed.

use std::cmp::Ordering;

use kiln_core::{BuildContext, CollectPlugin, Document, Feed, Plugin, PluginError};
use serde::Deserialize;

/// `[plugins.feeds]` settings.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FeedsConfig {
    /// Documents per feed page. `0` puts everything on one page.
    pub items_per_page: usize,
    /// Feed title. Falls back to the site title.
    pub title: Option<String>,
}

/// Collects every published document into the `all` feed.
///
/// Newest first by date; undated documents come last. Ties are ordered by
/// title, then slug.
pub struct FeedCollector;

impl Plugin for FeedCollector {
    fn name(&self) -> &str {
        "feeds"
    }

    fn as_collect(&self) -> Option<&dyn CollectPlugin> {
        Some(self)
    }
}

impl CollectPlugin for FeedCollector {
    fn collect(&self, ctx: &BuildContext) -> Result<(), PluginError> {
        let settings: FeedsConfig = ctx.config().plugin("feeds")?;

        let mut documents = ctx.documents().filter(Document::is_published);
        documents.sort_by(feed_order);

        let title = settings
            .title
            .unwrap_or_else(|| ctx.config().site.title.clone());
        let feed = Feed {
            documents: documents.iter().map(Document::id).collect(),
            items_per_page: settings.items_per_page,
            ..Feed::new("all", title)
        };
        tracing::debug!(documents = feed.documents.len(), "Collected feed `all`");
        ctx.feeds().push(feed);
        Ok(())
    }
}

fn feed_order(a: &Document, b: &Document) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| display_title(a).cmp(display_title(b)))
        .then_with(|| a.slug.cmp(&b.slug))
}

fn display_title(doc: &Document) -> &str {
    doc.title.as_deref().unwrap_or(&doc.slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(slug: &str, title: Option<&str>, date: Option<&str>) -> Document {
        let mut doc = Document::from_source(format!("{slug}.md"), "");
        doc.title = title.map(str::to_owned);
        doc.date = date.map(str::to_owned);
        doc
    }

    #[test]
    fn test_feed_order_newest_first_then_title() {
        let mut docs = vec![
            doc("undated", Some("Zed"), None),
            doc("old", Some("Old"), Some("2023-01-01")),
            doc("new-b", Some("B"), Some("2024-06-01")),
            doc("new-a", Some("A"), Some("2024-06-01")),
        ];
        docs.sort_by(feed_order);

        let slugs: Vec<_> = docs.iter().map(|d| d.slug.as_str()).collect();
        assert_eq!(slugs, ["new-a", "new-b", "old", "undated"]);
    }
}
