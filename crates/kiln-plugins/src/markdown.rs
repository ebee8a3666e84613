//! Markdown to HTML.

use kiln_cache::{CacheBucketExt, content_hash};
use kiln_core::{BuildContext, Plugin, PluginError, RenderPlugin};
use pulldown_cmark::{Options, Parser, html};

/// Cache namespace for rendered HTML.
const NAMESPACE: &str = "markdown";

/// Renders the content of every non-skipped document into `html`.
///
/// Results are cached per document, keyed by the hash of the raw body.
pub struct MarkdownRenderer;

impl Plugin for MarkdownRenderer {
    fn name(&self) -> &str {
        "markdown"
    }

    fn as_render(&self) -> Option<&dyn RenderPlugin> {
        Some(self)
    }
}

impl RenderPlugin for MarkdownRenderer {
    fn render(&self, ctx: &BuildContext) -> Result<(), PluginError> {
        let bucket = ctx.cache_bucket(NAMESPACE);

        ctx.process_where(
            |doc| !doc.skip,
            |doc| {
                let id = doc.id();
                let hash = content_hash(doc.content.as_bytes());
                if let Some(html) = bucket.get_string(id.as_str(), &hash) {
                    tracing::trace!(path = %id, "Markdown cache hit");
                    doc.html = Some(html);
                    return Ok(());
                }

                let html = render_markdown(&doc.content);
                bucket.set_string(id.as_str(), &hash, &html);
                doc.html = Some(html);
                Ok(())
            },
        )
    }
}

/// Render GitHub-flavored Markdown to HTML.
#[must_use]
pub fn render_markdown(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_GFM;
    let parser = Parser::new_ext(markdown, options);

    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_markdown_basics() {
        let html = render_markdown("# Title\n\nSee [about](/about/).");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains(r#"<a href="/about/">about</a>"#));
    }

    #[test]
    fn test_render_markdown_tables() {
        let html = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
    }
}
