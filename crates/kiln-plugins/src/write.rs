//! Output writer.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Component, Path, PathBuf};

use kiln_core::{BuildContext, Document, DocumentId, Feed, FeedPage, Plugin, PluginError, WritePlugin};

/// Writes one HTML file per rendered document and per feed page.
///
/// Documents go to `{output_dir}/{href}/index.html` (or to `href` itself when
/// it names an `.html` file). Feed pages go to
/// `{output_dir}/{feed}/page/{n}/index.html`. Every written file is
/// fingerprinted in the asset registry under its output-relative path.
pub struct SiteWriter;

impl Plugin for SiteWriter {
    fn name(&self) -> &str {
        "write"
    }

    fn as_write(&self) -> Option<&dyn WritePlugin> {
        Some(self)
    }
}

impl WritePlugin for SiteWriter {
    fn write(&self, ctx: &BuildContext) -> Result<(), PluginError> {
        let output_dir = &ctx.config().build_resolved.output_dir;
        let site_title = &ctx.config().site.title;

        let written = ctx.map_documents(|doc| {
            let Some(body) = doc.html.as_deref().filter(|_| !doc.skip) else {
                return Ok(false);
            };
            let relative = page_path(&doc.href)
                .ok_or_else(|| PluginError::document(&doc.path, format!("Unsafe href `{}`", doc.href)))?;
            let html = render_page(doc, body, site_title);
            write_file(ctx, output_dir, &relative, &html)
                .map_err(|e| PluginError::document(&doc.path, e.to_string()))?;
            Ok(true)
        })?;
        let pages = written.iter().filter(|&&w| w).count();

        let feeds = ctx.feeds().all();
        let mut feed_pages = 0;
        let snapshot = ctx.documents().snapshot();
        let by_id: HashMap<DocumentId, &Document> =
            snapshot.iter().map(|d| (d.id(), &**d)).collect();
        for feed in &feeds {
            for page in feed.pages() {
                let relative = feed_page_path(feed, &page)
                    .ok_or_else(|| PluginError::msg(format!("Unsafe feed name `{}`", feed.name)))?;
                let html = render_feed_page(feed, &page, &by_id);
                write_file(ctx, output_dir, &relative, &html)?;
                feed_pages += 1;
            }
        }

        tracing::info!(pages, feed_pages, dir = %output_dir.display(), "Wrote site");
        Ok(())
    }
}

fn write_file(ctx: &BuildContext, output_dir: &Path, relative: &Path, html: &str) -> std::io::Result<()> {
    let path = output_dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, html)?;

    let key = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    ctx.assets().register(key, html.as_bytes());
    Ok(())
}

/// Output-relative file for a document href, or `None` if it escapes the
/// output directory.
fn page_path(href: &str) -> Option<PathBuf> {
    let relative = safe_relative(href.trim_matches('/'))?;
    if relative.extension().is_some_and(|ext| ext == "html") {
        Some(relative)
    } else {
        Some(relative.join("index.html"))
    }
}

fn feed_page_path(feed: &Feed, page: &FeedPage<'_>) -> Option<PathBuf> {
    let dir = safe_relative(feed.name.trim_matches('/'))?;
    Some(
        dir.join("page")
            .join(page.number.to_string())
            .join("index.html"),
    )
}

fn safe_relative(path: &str) -> Option<PathBuf> {
    let path = Path::new(path);
    path.components()
        .all(|c| matches!(c, Component::Normal(_)))
        .then(|| path.to_path_buf())
}

fn render_page(doc: &Document, body: &str, site_title: &str) -> String {
    let title = doc.title.as_deref().unwrap_or(&doc.slug);
    let mut html = String::with_capacity(body.len() + 512);
    let _ = write!(
        html,
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n<main>\n{body}</main>\n",
        escape_html(&page_title(title, site_title)),
    );

    if !doc.inlinks.is_empty() {
        html.push_str("<aside class=\"backlinks\">\n<ul>\n");
        for link in &doc.inlinks {
            let _ = writeln!(
                html,
                "<li><a href=\"{}\">{}</a></li>",
                escape_html(&link.source_url),
                escape_html(link.source.as_str()),
            );
        }
        html.push_str("</ul>\n</aside>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_feed_page(feed: &Feed, page: &FeedPage<'_>, by_id: &HashMap<DocumentId, &Document>) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{} ({}/{})</title>\n</head>\n<body>\n<ul>\n",
        escape_html(&feed.title),
        page.number,
        page.total,
    );
    for doc in page.documents.iter().filter_map(|id| by_id.get(id)) {
        let _ = writeln!(
            html,
            "<li><a href=\"{}\">{}</a></li>",
            escape_html(&doc.href),
            escape_html(doc.title.as_deref().unwrap_or(&doc.slug)),
        );
    }
    html.push_str("</ul>\n</body>\n</html>\n");
    html
}

fn page_title(title: &str, site_title: &str) -> String {
    if site_title.is_empty() {
        title.to_owned()
    } else {
        format!("{title} | {site_title}")
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
