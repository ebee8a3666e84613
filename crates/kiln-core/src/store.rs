//! Thread-safe document and feed collections.

use std::sync::{Arc, RwLock};

use crate::document::{Document, DocumentId};
use crate::feed::Feed;

/// Shared, swappable slot holding the current version of one document.
///
/// Readers get an immutable [`Arc<Document>`] and never block writers for
/// longer than it takes to clone that `Arc`. Writers replace the whole
/// document, so a reader always sees a complete version.
#[derive(Clone, Debug)]
pub struct DocumentHandle(Arc<RwLock<Arc<Document>>>);

impl DocumentHandle {
    /// Wrap `document` in a new handle.
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self(Arc::new(RwLock::new(Arc::new(document))))
    }

    /// Current version of the document.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn load(&self) -> Arc<Document> {
        Arc::clone(&self.0.read().unwrap())
    }

    /// Replace the document.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn store(&self, document: Document) {
        *self.0.write().unwrap() = Arc::new(document);
    }

    /// Apply `f` to a copy of the current version, then store the copy.
    ///
    /// No lock is held while `f` runs. A write made to the same document by
    /// someone else in the meantime is overwritten.
    pub fn modify<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let mut document = Document::clone(&self.load());
        let result = f(&mut document);
        self.store(document);
        result
    }

    /// Whether both handles refer to the same slot.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// The build's document collection.
///
/// The store is a list of [`DocumentHandle`]s. The list lock is only held
/// while the list itself is read or changed, never while caller code runs,
/// so every accessor is safe to call from inside a dispatch callback.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: RwLock<Vec<DocumentHandle>>,
}

impl DocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles of every document, in store order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn handles(&self) -> Vec<DocumentHandle> {
        self.documents.read().unwrap().clone()
    }

    /// Current version of every document, in store order, without copying.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Document>> {
        self.handles().iter().map(DocumentHandle::load).collect()
    }

    /// Clone of every document, in store order.
    #[must_use]
    pub fn all(&self) -> Vec<Document> {
        self.snapshot()
            .iter()
            .map(|doc| Document::clone(doc))
            .collect()
    }

    /// Replace the whole collection.
    ///
    /// Handles taken before the call keep pointing at the old documents.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn replace_all(&self, documents: Vec<Document>) {
        let handles = documents.into_iter().map(DocumentHandle::new).collect();
        *self.documents.write().unwrap() = handles;
    }

    /// Append one document.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn append(&self, document: Document) {
        self.documents
            .write()
            .unwrap()
            .push(DocumentHandle::new(document));
    }

    /// Append several documents, keeping their order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn extend(&self, documents: impl IntoIterator<Item = Document>) {
        self.documents
            .write()
            .unwrap()
            .extend(documents.into_iter().map(DocumentHandle::new));
    }

    /// Clones of the documents matching `predicate`, in store order.
    pub fn filter(&self, predicate: impl Fn(&Document) -> bool) -> Vec<Document> {
        self.snapshot()
            .iter()
            .filter(|doc| predicate(doc))
            .map(|doc| Document::clone(doc))
            .collect()
    }

    /// Clone of the document with identity `id`.
    #[must_use]
    pub fn get(&self, id: &DocumentId) -> Option<Document> {
        self.handle(id).map(|handle| Document::clone(&handle.load()))
    }

    /// Handle of the document with identity `id`.
    #[must_use]
    pub fn handle(&self, id: &DocumentId) -> Option<DocumentHandle> {
        self.handles()
            .into_iter()
            .find(|handle| handle.load().id() == *id)
    }

    /// Number of documents.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().unwrap().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` over copies of every document, then store the copies back.
    ///
    /// Documents appended while `f` runs are kept untouched. Each copy is
    /// written back to the handle it came from, so the index keeps seeing the
    /// updated documents.
    pub fn update<R>(&self, f: impl FnOnce(&mut [Document]) -> R) -> R {
        let handles = self.handles();
        let mut documents: Vec<Document> = handles
            .iter()
            .map(|handle| Document::clone(&handle.load()))
            .collect();
        let result = f(&mut documents);
        for (handle, document) in handles.iter().zip(documents) {
            handle.store(document);
        }
        result
    }
}

/// The build's named feeds.
#[derive(Debug, Default)]
pub struct FeedStore {
    feeds: RwLock<Vec<Feed>>,
}

impl FeedStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of every feed.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn all(&self) -> Vec<Feed> {
        self.feeds.read().unwrap().clone()
    }

    /// Replace every feed.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn replace_all(&self, feeds: Vec<Feed>) {
        *self.feeds.write().unwrap() = feeds;
    }

    /// Add a feed, replacing an existing feed with the same name in place.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn push(&self, feed: Feed) {
        let mut feeds = self.feeds.write().unwrap();
        if let Some(existing) = feeds.iter_mut().find(|f| f.name == feed.name) {
            tracing::debug!(feed = %feed.name, "Replacing feed");
            *existing = feed;
        } else {
            feeds.push(feed);
        }
    }

    /// Clone of the feed named `name`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Feed> {
        self.feeds
            .read()
            .unwrap()
            .iter()
            .find(|f| f.name == name)
            .cloned()
    }

    /// Number of feeds.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.feeds.read().unwrap().len()
    }

    /// Whether there are no feeds.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
