//! Orchestration core for kiln.
//!
//! This crate provides:
//! - [`Engine`]: runs the fixed stage sequence, invoking registered plugins by priority
//! - [`Plugin`] and the per-stage capability traits ([`LoadPlugin`], [`RenderPlugin`], ...)
//! - [`BuildContext`]: the shared state every plugin receives (documents, feeds,
//!   scratch state, asset hashes, build cache, executor, document index)
//! - [`DocumentIndex`] and [`LinkResolver`] for slug/href resolution and the link graph
//! - [`Executor`]: bounded worker pool for per-document work
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use kiln_cache::NullCache;
//! use kiln_config::Config;
//! use kiln_core::{BuildContext, Document, Engine, LoadPlugin, Plugin, PluginError};
//!
//! struct Hello;
//!
//! impl Plugin for Hello {
//!     fn name(&self) -> &str {
//!         "hello"
//!     }
//!
//!     fn as_load(&self) -> Option<&dyn LoadPlugin> {
//!         Some(self)
//!     }
//! }
//!
//! impl LoadPlugin for Hello {
//!     fn load(&self, ctx: &BuildContext) -> Result<(), PluginError> {
//!         ctx.documents().append(Document::from_source("hello.md", "# Hello"));
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut engine = Engine::new(Config::default(), Arc::new(NullCache))?;
//! engine.register(Hello);
//! let report = engine.run()?;
//! assert_eq!(report.documents, 1);
//! assert!(engine.context().index().by_slug("hello").is_some());
//! # Ok(())
//! # }
//! ```

mod assets;
mod context;
mod document;
mod engine;
mod error;
mod executor;
mod feed;
mod index;
mod links;
mod plugin;
mod scratch;
mod stage;
mod store;

pub use assets::{AssetHashes, fingerprint};
pub use context::BuildContext;
pub use document::{Document, DocumentId, slugify};
pub use engine::{BuildReport, Engine, PluginRegistry, PluginTiming, StageReport};
pub use error::{BuildError, PluginError};
pub use executor::{Executor, available_workers, effective_workers};
pub use feed::{Feed, FeedPage};
pub use index::{DocumentIndex, SlugConflict};
pub use links::{Link, LinkResolver, assign_links};
pub use plugin::{
    CollectPlugin, ConfigurePlugin, LoadPlugin, Plugin, RenderPlugin, TransformPlugin,
    WritePlugin,
};
pub use scratch::ScratchState;
pub use stage::{Stage, priority};
pub use store::{DocumentHandle, DocumentStore, FeedStore};
