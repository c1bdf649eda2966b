//! Resolve the vault endpoint and secret name from flags and environment

use crate::cli::Cli;
use miette::Diagnostic;
use thiserror::Error;

/// Environment variable holding the vault URI
pub const VAULT_URI_ENV: &str = "AZURE_KEY_VAULT_URI";
/// Environment variable holding the secret name
pub const SECRET_NAME_ENV: &str = "AZURE_SECRET_NAME";

/// What to fetch, and from where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Vault URI, never empty
    pub vault_endpoint: String,
    /// Secret name, never empty
    pub secret_name: String,
    /// Specific version to fetch; `None` is the latest
    pub secret_version: Option<String>,
}

/// Configuration errors
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither the flag nor the environment supplied a value
    #[error("missing {field}: pass {flag} or set {env_var}")]
    #[diagnostic(code(azkv::config::missing), help("Run 'azkvquery --help' for usage"))]
    Missing {
        /// Human readable field name
        field: &'static str,
        /// Flag that sets it
        flag: &'static str,
        /// Environment variable that sets it
        env_var: &'static str,
    },
}

impl Config {
    /// Resolve configuration from parsed flags and an environment lookup.
    ///
    /// A non-empty flag wins over the environment. Empty values count as
    /// absent on both sides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for the first required field with no
    /// value.
    pub fn resolve<F>(cli: &Cli, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vault_endpoint = pick(cli.keyvault.as_deref(), env(VAULT_URI_ENV)).ok_or(
            ConfigError::Missing {
                field: "vault URI",
                flag: "--keyvault",
                env_var: VAULT_URI_ENV,
            },
        )?;
        let secret_name = pick(cli.secret.as_deref(), env(SECRET_NAME_ENV)).ok_or(
            ConfigError::Missing {
                field: "secret name",
                flag: "--secret",
                env_var: SECRET_NAME_ENV,
            },
        )?;
        let secret_version = cli
            .secret_version
            .clone()
            .filter(|version| !version.is_empty());

        Ok(Self {
            vault_endpoint,
            secret_name,
            secret_version,
        })
    }

    /// Resolve configuration against the process environment
    ///
    /// # Errors
    ///
    /// See [`Config::resolve`].
    pub fn from_env(cli: &Cli) -> Result<Self, ConfigError> {
        Self::resolve(cli, |key| std::env::var(key).ok())
    }
}

fn pick(flag: Option<&str>, env_value: Option<String>) -> Option<String> {
    flag.filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| env_value.filter(|value| !value.is_empty()))
}
