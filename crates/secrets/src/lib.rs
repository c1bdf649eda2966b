//! Secret store abstraction for azkv
//!
//! Provides the [`SecretStore`] trait that the CLI dispatches against, the
//! error type every store reports through, and the value types that travel
//! between them. Concrete stores live elsewhere:
//!
//! - `StaticSecretStore` - in-memory store (this crate, `test-util` feature)
//! - `azkv-azure`: `KeyVaultClient` for Azure Key Vault
//!
//! # Listing
//!
//! Stores expose listing as a stream of pages. Use [`SecretPager`] to walk
//! every page in order:
//!
//! ```ignore
//! use azkv_secrets::SecretPager;
//!
//! let mut pager = SecretPager::new(&store);
//! while let Some(page) = pager.next_page().await {
//!     for id in page? {
//!         println!("{id}");
//!     }
//! }
//! ```

mod pager;
#[cfg(any(test, feature = "test-util"))]
pub mod stores;
mod types;

pub use pager::SecretPager;
#[cfg(any(test, feature = "test-util"))]
pub use stores::StaticSecretStore;
pub use types::{SecretBundle, SecureSecret};

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

/// Pages of secret identifiers, in store order
pub type PageStream<'a> = BoxStream<'a, Result<Vec<String>, StoreError>>;

/// HTTP status reported when a secret does not exist
pub const STATUS_NOT_FOUND: u16 = 404;

/// HTTP status reported when the caller may not read a secret
pub const STATUS_FORBIDDEN: u16 = 403;

/// Error types reported by secret stores
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store answered with a non-success status
    #[error("secret store returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Service-specific error code (e.g. `SecretNotFound`)
        code: Option<String>,
        /// Human readable message from the service
        message: String,
    },

    /// No credential could be obtained to authorize the request
    #[error("failed to obtain a credential: {message}")]
    Credential {
        /// Description of the credential failure
        message: String,
    },

    /// The configured endpoint cannot be used to build requests
    #[error("invalid vault endpoint '{endpoint}': {message}")]
    InvalidEndpoint {
        /// The endpoint as configured
        endpoint: String,
        /// Why it was rejected
        message: String,
    },

    /// The request never produced a response
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transport failure
        message: String,
    },

    /// A response arrived but could not be understood
    #[error("unexpected response from secret store: {message}")]
    Decode {
        /// Description of the decoding failure
        message: String,
    },
}

impl StoreError {
    /// Create a status error without a service code
    #[must_use]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// Create a transport error
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a decode error
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// The HTTP status carried by this error, if any.
    ///
    /// Only [`StoreError::Status`] carries one; transport, credential and
    /// decoding failures never reached a classifiable response.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the store reported that the secret does not exist
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.status_code(), Some(STATUS_NOT_FOUND))
    }
}

/// Trait for stores that hold named, versioned secrets.
///
/// Implementors must provide:
/// - [`get_secret`](SecretStore::get_secret) - Fetch one secret value
/// - [`list_secret_pages`](SecretStore::list_secret_pages) - Identifiers, page by page
/// - [`provider_name`](SecretStore::provider_name) - Provider identifier for logs
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch a secret by name.
    ///
    /// `version` of `None` selects the latest version.
    async fn get_secret(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<SecretBundle, StoreError>;

    /// Start a listing of every secret identifier.
    ///
    /// Nothing is requested until the stream is polled. Each item is one
    /// page; the store follows its own continuation between pages.
    fn list_secret_pages(&self) -> PageStream<'_>;

    /// Get the provider name for this store.
    ///
    /// Examples: `"static"`, `"azure-keyvault"`
    fn provider_name(&self) -> &'static str;
}
