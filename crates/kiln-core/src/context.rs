//! Shared state handed to every plugin.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use kiln_cache::{Cache, CacheBucket};
use kiln_config::Config;

use crate::assets::AssetHashes;
use crate::document::{Document, DocumentId};
use crate::error::{BuildError, PluginError};
use crate::executor::Executor;
use crate::index::DocumentIndex;
use crate::links::LinkResolver;
use crate::scratch::ScratchState;
use crate::store::{DocumentStore, FeedStore};

/// Everything a plugin can see and touch during one build.
///
/// The context is owned by the [`Engine`](crate::Engine) and passed by
/// reference into every stage handler. All shared collections are internally
/// synchronized, so handlers and the callbacks they dispatch may use them
/// concurrently.
///
/// # Dispatch
///
/// The `process_*` methods hand each callback its own copy of a document and
/// store the copy back once the callback returns. No store lock is held while
/// a callback runs, so callbacks may read the store, append to it, or look
/// documents up through [`index`](Self::index). Other callbacks see a
/// document's previous version until its own callback has finished.
pub struct BuildContext {
    config: Config,
    cache: Arc<dyn Cache>,
    documents: DocumentStore,
    feeds: FeedStore,
    scratch: ScratchState,
    assets: AssetHashes,
    executor: Executor,
    resolver: LinkResolver,
    index: RwLock<Option<Arc<DocumentIndex>>>,
}

impl BuildContext {
    /// Create a context for `config`, backed by `cache`.
    ///
    /// # Errors
    ///
    /// Returns an error if `site.url` is not an absolute URL or the worker
    /// pool cannot be started.
    pub fn new(config: Config, cache: Arc<dyn Cache>) -> Result<Self, BuildError> {
        let base = config
            .site
            .base_url()
            .ok_or_else(|| BuildError::SiteUrl(config.site.url.clone()))?;
        let executor = Executor::from_config(&config)?;
        tracing::debug!(workers = executor.workers(), site = %base, "Created build context");

        Ok(Self {
            resolver: LinkResolver::new(&base),
            config,
            cache,
            documents: DocumentStore::new(),
            feeds: FeedStore::new(),
            scratch: ScratchState::new(),
            assets: AssetHashes::new(),
            executor,
            index: RwLock::new(None),
        })
    }

    /// Build configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build cache.
    #[must_use]
    pub fn cache(&self) -> &dyn Cache {
        self.cache.as_ref()
    }

    /// Shortcut for `cache().bucket(namespace)`.
    #[must_use]
    pub fn cache_bucket(&self, namespace: &str) -> Box<dyn CacheBucket> {
        self.cache.bucket(namespace)
    }

    /// Document store.
    #[must_use]
    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    /// Feed store.
    #[must_use]
    pub fn feeds(&self) -> &FeedStore {
        &self.feeds
    }

    /// Scratch state shared between plugins.
    #[must_use]
    pub fn scratch(&self) -> &ScratchState {
        &self.scratch
    }

    /// Asset fingerprint registry.
    #[must_use]
    pub fn assets(&self) -> &AssetHashes {
        &self.assets
    }

    /// Worker pool.
    #[must_use]
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Resolver for links found in documents, bound to the site URL.
    #[must_use]
    pub fn link_resolver(&self) -> &LinkResolver {
        &self.resolver
    }

    /// Current document index, built from the store on first use.
    ///
    /// The engine rebuilds the index right after the Load stage. Lookups
    /// return the current version of each document, but later changes to
    /// slugs or hrefs and documents appended later are not reflected until
    /// [`rebuild_index`](Self::rebuild_index) is called.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn index(&self) -> Arc<DocumentIndex> {
        if let Some(index) = self.index.read().unwrap().as_ref() {
            return Arc::clone(index);
        }
        let built = Arc::new(DocumentIndex::build(&self.documents.handles()));
        let mut slot = self.index.write().unwrap();
        Arc::clone(slot.get_or_insert(built))
    }

    /// Rebuild the document index from the current store.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn rebuild_index(&self) -> Arc<DocumentIndex> {
        let built = Arc::new(DocumentIndex::build(&self.documents.handles()));
        *self.index.write().unwrap() = Some(Arc::clone(&built));
        built
    }

    /// Apply `f` to every document on the worker pool.
    ///
    /// A document is only updated when its callback succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error returned by `f`.
    pub fn process_all<F>(&self, f: F) -> Result<(), PluginError>
    where
        F: Fn(&mut Document) -> Result<(), PluginError> + Sync + Send,
    {
        self.process_where(|_| true, f)
    }

    /// Apply `f` to the documents matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns an error returned by `f`.
    pub fn process_where<P, F>(&self, predicate: P, f: F) -> Result<(), PluginError>
    where
        P: Fn(&Document) -> bool + Sync + Send,
        F: Fn(&mut Document) -> Result<(), PluginError> + Sync + Send,
    {
        let _ = self.index();
        let handles = self.documents.handles();
        self.executor.for_each(&handles, |handle| {
            let current = handle.load();
            if !predicate(&*current) {
                return Ok(());
            }
            let mut document = Document::clone(&current);
            drop(current);
            f(&mut document)?;
            handle.store(document);
            Ok(())
        })
    }

    /// Apply `f` to the documents whose identity is in `ids`.
    ///
    /// Unknown identities are ignored; duplicates are processed once.
    ///
    /// # Errors
    ///
    /// Returns an error returned by `f`.
    pub fn process_subset<F>(&self, ids: &[DocumentId], f: F) -> Result<(), PluginError>
    where
        F: Fn(&mut Document) -> Result<(), PluginError> + Sync + Send,
    {
        let wanted: HashSet<&DocumentId> = ids.iter().collect();
        self.process_where(|doc| wanted.contains(&doc.id()), f)
    }

    /// Map every document through `f` without mutating it.
    ///
    /// Results keep store order.
    ///
    /// # Errors
    ///
    /// Returns an error returned by `f`.
    pub fn map_documents<R, F>(&self, f: F) -> Result<Vec<R>, PluginError>
    where
        R: Send,
        F: Fn(&Document) -> Result<R, PluginError> + Sync + Send,
    {
        let _ = self.index();
        let handles = self.documents.handles();
        self.executor.map(&handles, |handle| f(&*handle.load()))
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::new(Config::default(), Arc::new(kiln_cache::NullCache)).unwrap()
    }
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("documents", &self.documents.len())
            .field("feeds", &self.feeds.len())
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(BuildContext: Send, Sync);
    assert_impl_all!(DocumentIndex: Send, Sync);

    fn context_with(paths: &[&str]) -> BuildContext {
        let ctx = BuildContext::for_tests();
        for path in paths {
            ctx.documents().append(Document::from_source(*path, ""));
        }
        ctx
    }

    #[test]
    fn test_rejects_invalid_site_url() {
        let mut config = Config::default();
        config.site.url = "not a url".to_owned();

        let err = BuildContext::new(config, Arc::new(kiln_cache::NullCache)).unwrap_err();
        assert!(matches!(err, BuildError::SiteUrl(_)));
    }

    #[test]
    fn test_process_all_visits_each_document_once() {
        let ctx = context_with(&["a.md", "b.md", "c.md"]);
        let calls = AtomicUsize::new(0);

        ctx.process_all(|doc| {
            calls.fetch_add(1, Ordering::Relaxed);
            doc.title = Some(doc.slug.to_uppercase());
            Ok(())
        })
        .unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 3);
        assert!(ctx.documents().all().iter().all(|d| d.title.is_some()));
    }

    #[test]
    fn test_process_subset() {
        let ctx = context_with(&["a.md", "b.md", "c.md"]);
        let ids = [DocumentId::new("b.md"), DocumentId::new("b.md"), DocumentId::new("zzz.md")];

        ctx.process_subset(&ids, |doc| {
            doc.tags.push("picked".to_owned());
            Ok(())
        })
        .unwrap();

        let tagged: Vec<_> = ctx
            .documents()
            .filter(|d| !d.tags.is_empty())
            .into_iter()
            .map(|d| d.slug)
            .collect();
        assert_eq!(tagged, ["b"]);
        assert_eq!(ctx.documents().get(&DocumentId::new("b.md")).unwrap().tags.len(), 1);
    }

    #[test]
    fn test_callbacks_can_use_index() {
        let ctx = context_with(&["a.md", "b.md"]);

        ctx.process_all(|doc| {
            let index = ctx.index();
            let other = if doc.slug == "a" { "b" } else { "a" };
            doc.description = index.by_slug(other).map(|d| d.slug.clone());
            Ok(())
        })
        .unwrap();

        let a = ctx.documents().get(&DocumentId::new("a.md")).unwrap();
        assert_eq!(a.description.as_deref(), Some("b"));
    }

    #[test]
    fn test_callbacks_can_use_store() {
        let ctx = context_with(&["a.md", "b.md", "c.md"]);

        ctx.process_all(|doc| {
            doc.description = Some(ctx.documents().len().to_string());
            if doc.slug == "a" {
                ctx.documents().append(Document::from_source("late.md", ""));
            }
            let others = ctx.documents().filter(|d| d.slug != doc.slug);
            doc.tags = others.into_iter().map(|d| d.slug).collect();
            Ok(())
        })
        .unwrap();

        let documents = ctx.documents().all();
        assert_eq!(documents.len(), 4);
        let late = &documents[3];
        assert_eq!(late.slug, "late");
        assert_eq!(late.description, None);
        assert!(documents[..3].iter().all(|d| d.description.is_some()));
    }

    #[test]
    fn test_failed_callback_keeps_previous_version() {
        let ctx = context_with(&["a.md"]);

        let result = ctx.process_all(|doc| {
            doc.title = Some("half done".to_owned());
            Err(PluginError::Message("boom".to_owned()))
        });

        assert!(result.is_err());
        assert_eq!(ctx.documents().all()[0].title, None);
    }

    #[test]
    fn test_index_sees_fields_set_after_rebuild() {
        let ctx = context_with(&["a.md"]);
        ctx.rebuild_index();

        ctx.process_all(|doc| {
            doc.title = Some("Set in Transform".to_owned());
            doc.html = Some("<p>a</p>".to_owned());
            Ok(())
        })
        .unwrap();

        let found = ctx.index().by_slug("a").unwrap();
        assert_eq!(found.title.as_deref(), Some("Set in Transform"));
        assert_eq!(found.html.as_deref(), Some("<p>a</p>"));
    }

    #[test]
    fn test_map_documents_keeps_order() {
        let ctx = context_with(&["1.md", "2.md", "3.md", "4.md"]);
        let slugs = ctx.map_documents(|doc| Ok(doc.slug.clone())).unwrap();
        assert_eq!(slugs, ["1", "2", "3", "4"]);
    }

    #[test]
    fn test_index_is_a_snapshot_until_rebuilt() {
        let ctx = context_with(&["a.md"]);
        assert_eq!(ctx.index().len(), 1);

        ctx.documents().append(Document::from_source("b.md", ""));
        assert!(ctx.index().by_slug("b").is_none());

        ctx.rebuild_index();
        assert!(ctx.index().by_slug("b").is_some());
    }
}
