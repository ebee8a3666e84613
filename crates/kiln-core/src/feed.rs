//! Named, paginated document collections.

use serde::{Deserialize, Serialize};

use crate::document::DocumentId;

/// A named, titled collection of documents.
///
/// Feeds are built during the Collect stage and consumed by the Write stage.
/// They hold document identities rather than copies, so later stages see the
/// current state of each document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    /// Unique feed name, also used as its output directory.
    pub name: String,
    /// Human-readable title.
    pub title: String,
    /// Member documents, in feed order.
    pub documents: Vec<DocumentId>,
    /// Page size. `0` disables pagination.
    #[serde(default)]
    pub items_per_page: usize,
}

/// One page of a [`Feed`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedPage<'a> {
    /// 1-based page number.
    pub number: usize,
    /// Total number of pages.
    pub total: usize,
    /// Documents on this page.
    pub documents: &'a [DocumentId],
}

impl Feed {
    /// Create an empty, unpaginated feed.
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Split the feed into pages.
    ///
    /// Always yields at least one page, so an empty feed still gets an index.
    #[must_use]
    pub fn pages(&self) -> Vec<FeedPage<'_>> {
        if self.items_per_page == 0 || self.documents.is_empty() {
            return vec![FeedPage {
                number: 1,
                total: 1,
                documents: &self.documents,
            }];
        }

        let total = self.documents.len().div_ceil(self.items_per_page);
        self.documents
            .chunks(self.items_per_page)
            .enumerate()
            .map(|(i, documents)| FeedPage {
                number: i + 1,
                total,
                documents,
            })
            .collect()
    }
}
