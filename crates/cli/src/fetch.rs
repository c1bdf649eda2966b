//! Fetch one secret, falling back to a listing when it does not exist
//!
//! [`fetch_secret`] issues a single `get` and branches on the outcome:
//!
//! | store result | action |
//! |--------------|--------|
//! | value | write `<name>: <value>` |
//! | HTTP 404 | write `Secret ID: <id>` for every secret in the vault |
//! | HTTP 403 | [`FetchError::PermissionDenied`] |
//! | other status | [`FetchError::UnrecognizedStatus`] |
//! | no status | [`FetchError::Credential`] or [`FetchError::Store`] |

use crate::config::Config;
use azkv_secrets::{STATUS_FORBIDDEN, SecretPager, SecretStore, StoreError};
use miette::Diagnostic;
use std::io::{self, Write};
use thiserror::Error;
use tracing::instrument;

/// What a successful run printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The secret value was printed
    Printed,
    /// The secret was absent; this many identifiers were listed instead
    Listed {
        /// Number of identifiers written
        count: usize,
    },
}

/// Fatal fetch errors
#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    /// The store refused access (HTTP 403)
    #[error("No permission to access this secret")]
    #[diagnostic(
        code(azkv::fetch::forbidden),
        help("Grant the signed-in identity 'get' and 'list' permissions on secrets in this vault")
    )]
    PermissionDenied {
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// The store answered with a status this tool does not handle
    #[error("Unrecognized HTTP error code {status}")]
    #[diagnostic(code(azkv::fetch::unrecognized_status))]
    UnrecognizedStatus {
        /// HTTP status code
        status: u16,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// No credential could authorize the request
    #[error("Failed to obtain an Azure credential")]
    #[diagnostic(
        code(azkv::fetch::credential),
        help(
            "Sign in with 'az login', run on an Azure host with a managed identity, or set AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_FEDERATED_TOKEN_FILE for workload identity"
        )
    )]
    Credential {
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// The request failed without a classifiable response
    #[error("Failed to fetch secret '{name}'")]
    #[diagnostic(code(azkv::fetch::store))]
    Store {
        /// Secret that was requested
        name: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// A page of the listing could not be fetched
    #[error("Failed to list secrets after {listed} identifiers")]
    #[diagnostic(code(azkv::fetch::listing))]
    Listing {
        /// Identifiers already written before the failure
        listed: usize,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// Writing to the output failed
    #[error("Failed to write output")]
    #[diagnostic(code(azkv::fetch::output))]
    Output {
        /// Underlying I/O error
        #[from]
        source: io::Error,
    },
}

impl FetchError {
    /// Classify a failed `get` that did not report 404
    fn classify(name: &str, source: StoreError) -> Self {
        match source.status_code() {
            Some(STATUS_FORBIDDEN) => Self::PermissionDenied { source },
            Some(status) => Self::UnrecognizedStatus { status, source },
            None => match source {
                StoreError::Credential { .. } => Self::Credential { source },
                source => Self::Store {
                    name: name.to_string(),
                    source,
                },
            },
        }
    }
}

/// Fetch the configured secret and write the result to `out`.
///
/// # Errors
///
/// Returns a [`FetchError`] for every fatal condition. A missing secret is
/// not an error unless the listing that replaces it fails.
#[instrument(
    skip_all,
    fields(provider = store.provider_name(), secret = %config.secret_name)
)]
pub async fn fetch_secret<S, W>(
    store: &S,
    config: &Config,
    out: &mut W,
) -> Result<Outcome, FetchError>
where
    S: SecretStore + ?Sized,
    W: Write,
{
    let result = store
        .get_secret(&config.secret_name, config.secret_version.as_deref())
        .await;

    match result {
        Ok(bundle) => {
            writeln!(out, "{}: {}", config.secret_name, bundle.value.expose())?;
            out.flush()?;
            tracing::debug!(id = ?bundle.id, "Printed secret");
            Ok(Outcome::Printed)
        }
        Err(err) if err.is_not_found() => {
            tracing::warn!(error = %err, "Secret not found");
            let count = list_secrets(store, out).await?;
            Ok(Outcome::Listed { count })
        }
        Err(err) => {
            tracing::debug!(error = ?err, "Secret request failed");
            Err(FetchError::classify(&config.secret_name, err))
        }
    }
}

/// Write `Secret ID: <id>` for every secret in the store, page by page.
///
/// Lines from pages fetched before a failure stay written.
///
/// # Errors
///
/// Returns [`FetchError::Listing`] if any page fails, or
/// [`FetchError::Output`] if writing fails.
pub async fn list_secrets<S, W>(store: &S, out: &mut W) -> Result<usize, FetchError>
where
    S: SecretStore + ?Sized,
    W: Write,
{
    let mut pager = SecretPager::new(store);
    let mut listed = 0;

    while let Some(page) = pager.next_page().await {
        let ids = page.map_err(|source| FetchError::Listing { listed, source })?;
        for id in ids {
            writeln!(out, "Secret ID: {id}")?;
            listed += 1;
        }
        out.flush()?;
    }

    tracing::debug!(listed, pages = pager.pages_fetched(), "Listed secrets");
    Ok(listed)
}
