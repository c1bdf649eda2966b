//! azkv: query a secret from Azure Key Vault
//!
//! The `azkvquery` binary resolves a [`Config`] from flags and environment,
//! authenticates with the ambient Azure identity and runs [`fetch_secret`]
//! against a [`KeyVaultClient`](azkv_azure::KeyVaultClient).
//!
//! ```ignore
//! let config = Config::resolve(&cli, |key| std::env::var(key).ok())?;
//! match azkv::run(&config).await {
//!     Ok(_) => std::process::exit(EXIT_OK),
//!     Err(err) => std::process::exit(exit_code_for(&err)),
//! }
//! ```

/// CLI argument parsing, errors and exit codes.
pub mod cli;
/// Configuration resolution.
pub mod config;
/// Secret retrieval and the listing fallback.
pub mod fetch;
/// Tracing and logging configuration.
pub mod tracing;

pub use config::{Config, ConfigError};
pub use fetch::{FetchError, Outcome, fetch_secret, list_secrets};

use azkv_azure::{DefaultCredential, KeyVaultClient};
use cli::CliError;
use std::io;
use std::sync::Arc;

/// Fetch the configured secret from Azure Key Vault and print it to stdout.
///
/// # Errors
///
/// Returns a [`CliError`] if the credential chain cannot be built, the vault
/// endpoint is unusable, or the fetch fails.
pub async fn run(config: &Config) -> Result<Outcome, CliError> {
    let credential =
        DefaultCredential::new().map_err(|source| CliError::CredentialSetup { source })?;
    let client = KeyVaultClient::new(&config.vault_endpoint, Arc::new(credential)).map_err(
        |source| FetchError::Store {
            name: config.secret_name.clone(),
            source,
        },
    )?;

    let mut out = io::stdout();
    Ok(fetch_secret(&client, config, &mut out).await?)
}
