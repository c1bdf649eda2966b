//! Page-by-page traversal of a secret listing

use crate::{PageStream, SecretStore, StoreError};
use futures::StreamExt;

/// Walks every page of a [`SecretStore`] listing in store order.
///
/// A fresh pager starts from the first page. After the last page, or after
/// any error, [`next_page`](SecretPager::next_page) returns `None`.
pub struct SecretPager<'a> {
    pages: PageStream<'a>,
    provider: &'static str,
    fetched: usize,
    done: bool,
}

impl<'a> SecretPager<'a> {
    /// Create a pager positioned before the first page
    #[must_use]
    pub fn new<S: SecretStore + ?Sized>(store: &'a S) -> Self {
        Self {
            pages: store.list_secret_pages(),
            provider: store.provider_name(),
            fetched: 0,
            done: false,
        }
    }

    /// Number of pages fetched successfully so far
    #[must_use]
    pub const fn pages_fetched(&self) -> usize {
        self.fetched
    }

    /// Fetch the next page of identifiers.
    ///
    /// Returns `None` once the listing is exhausted. An error ends the
    /// traversal: the following call returns `None`.
    pub async fn next_page(&mut self) -> Option<Result<Vec<String>, StoreError>> {
        if self.done {
            return None;
        }

        match self.pages.next().await {
            Some(Ok(ids)) => {
                self.fetched += 1;
                tracing::debug!(
                    provider = self.provider,
                    page = self.fetched,
                    ids = ids.len(),
                    "Fetched secret listing page"
                );
                Some(Ok(ids))
            }
            Some(Err(err)) => {
                self.done = true;
                Some(Err(err))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}
