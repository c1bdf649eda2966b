//! In-memory secret store

use crate::{PageStream, SecretBundle, SecretStore, StoreError};
use async_trait::async_trait;
use futures::{StreamExt, stream};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
enum Entry {
    Value(String),
    Status(u16),
    Transport(String),
    Credential(String),
}

#[derive(Debug, Clone)]
enum Page {
    Ids(Vec<String>),
    Fail(u16),
}

/// Serves secrets from memory.
///
/// Each secret name maps either to a value or to a scripted failure, which
/// makes the store usable as a stand-in for a remote vault. Listing returns
/// the pages registered with [`with_page`](Self::with_page) in order, or a
/// single page of all secret names when none were registered.
///
/// Every call is counted so callers can assert on how the store was used.
#[derive(Debug, Default)]
pub struct StaticSecretStore {
    entries: BTreeMap<String, Entry>,
    pages: Vec<Page>,
    get_calls: AtomicUsize,
    pages_served: AtomicUsize,
    requested_versions: Mutex<Vec<Option<String>>>,
}

impl StaticSecretStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret value
    #[must_use]
    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(name.into(), Entry::Value(value.into()));
        self
    }

    /// Make fetching `name` fail with an HTTP status
    #[must_use]
    pub fn with_status(mut self, name: impl Into<String>, status: u16) -> Self {
        self.entries.insert(name.into(), Entry::Status(status));
        self
    }

    /// Make fetching `name` fail before any response arrives
    #[must_use]
    pub fn with_transport_error(
        mut self,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.entries
            .insert(name.into(), Entry::Transport(message.into()));
        self
    }

    /// Make fetching `name` fail while acquiring a credential
    #[must_use]
    pub fn with_credential_error(
        mut self,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.entries
            .insert(name.into(), Entry::Credential(message.into()));
        self
    }

    /// Append a listing page
    #[must_use]
    pub fn with_page<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.pages
            .push(Page::Ids(ids.into_iter().map(Into::into).collect()));
        self
    }

    /// Append a listing page that fails with an HTTP status
    #[must_use]
    pub fn with_failing_page(mut self, status: u16) -> Self {
        self.pages.push(Page::Fail(status));
        self
    }

    /// Number of `get_secret` calls served
    #[must_use]
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of listing pages handed out, failed pages included
    #[must_use]
    pub fn pages_served(&self) -> usize {
        self.pages_served.load(Ordering::SeqCst)
    }

    /// Versions passed to `get_secret`, in call order
    #[must_use]
    pub fn requested_versions(&self) -> Vec<Option<String>> {
        self.requested_versions
            .lock()
            .map(|versions| versions.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    fn provider_name(&self) -> &'static str {
        "static"
    }

    async fn get_secret(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<SecretBundle, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut versions) = self.requested_versions.lock() {
            versions.push(version.map(str::to_owned));
        }

        match self.entries.get(name) {
            Some(Entry::Value(value)) => Ok(SecretBundle::new(name, value.clone())),
            Some(Entry::Status(status)) => Err(StoreError::status(
                *status,
                format!("scripted failure for '{name}'"),
            )),
            Some(Entry::Transport(message)) => Err(StoreError::transport(message.clone())),
            Some(Entry::Credential(message)) => Err(StoreError::Credential {
                message: message.clone(),
            }),
            None => Err(StoreError::Status {
                status: crate::STATUS_NOT_FOUND,
                code: Some("SecretNotFound".to_string()),
                message: format!("secret '{name}' not found"),
            }),
        }
    }

    fn list_secret_pages(&self) -> PageStream<'_> {
        let pages = if self.pages.is_empty() {
            vec![Page::Ids(self.entries.keys().cloned().collect())]
        } else {
            self.pages.clone()
        };

        stream::iter(pages.into_iter().enumerate())
            .map(move |(index, page)| {
                self.pages_served.fetch_add(1, Ordering::SeqCst);
                match page {
                    Page::Ids(ids) => Ok(ids),
                    Page::Fail(status) => Err(StoreError::status(
                        status,
                        format!("scripted failure for listing page {index}"),
                    )),
                }
            })
            .boxed()
    }
}
