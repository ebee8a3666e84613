//! Reference plugins for kiln.
//!
//! Together these turn a directory of Markdown files into a site:
//!
//! | Plugin | Stage | Priority |
//! |--------|-------|----------|
//! | [`SourceLoader`] (`load`) | Load | `FIRST` |
//! | [`DraftFilter`] (`drafts`) | Load | `LATE` |
//! | [`FeedCollector`] (`feeds`) | Collect | `DEFAULT` |
//! | [`MarkdownRenderer`] (`markdown`) | Render | `DEFAULT` |
//! | [`LinkGraph`] (`links`) | Render | `LATE` |
//! | [`SiteWriter`] (`write`) | Write | `DEFAULT` |
//!
//! [`register_defaults`] registers all of them on an [`Engine`].

mod drafts;
mod feeds;
mod links;
mod load;
mod markdown;
mod write;

pub use drafts::DraftFilter;
pub use feeds::{FeedCollector, FeedsConfig};
pub use links::{LinkGraph, extract_hrefs};
pub use load::SourceLoader;
pub use markdown::{MarkdownRenderer, render_markdown};
pub use write::SiteWriter;

use kiln_core::Engine;

/// Register every reference plugin on `engine`.
pub fn register_defaults(engine: &mut Engine) {
    engine
        .register(SourceLoader)
        .register(DraftFilter)
        .register(FeedCollector)
        .register(MarkdownRenderer)
        .register(LinkGraph)
        .register(SiteWriter);
}
