use crate::fetch::FetchError;
use azkv_azure::CredentialError;
use clap::{CommandFactory, Parser};
use miette::{Diagnostic, Report};
use std::io::{self, Write};
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// Fatal runtime error exit code (credential, forbidden, listing, transport)
pub const EXIT_FAILURE: i32 = 1;
/// Invalid command line usage exit code (reported by clap)
pub const EXIT_CLI: i32 = 2;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Fetching or listing secrets failed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),

    /// The credential chain could not be built
    #[error("Failed to set up Azure credentials")]
    #[diagnostic(
        code(azkv::cli::credential_setup),
        help("Run with --level debug for details")
    )]
    CredentialSetup {
        /// Underlying credential error
        #[source]
        source: CredentialError,
    },
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Fetch(_) | CliError::CredentialSetup { .. } => EXIT_FAILURE,
    }
}

/// Render an error as a miette report on stderr
pub fn render_error(err: CliError) {
    let report = Report::new(err);
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "{report:?}");
    let _ = stderr.flush();
}

/// Query a secret from Azure Key Vault.
///
/// Prints `<name>: <value>` when the secret exists. When it does not, prints
/// the identifier of every secret in the vault instead.
#[derive(Parser, Debug)]
#[command(name = "azkvquery")]
#[command(about = "Query a secret from Azure Key Vault")]
#[command(
    after_help = "Environment:\n  AZURE_KEY_VAULT_URI  Vault URI used when --keyvault is not given\n  AZURE_SECRET_NAME    Secret name used when --secret is not given"
)]
#[command(version)]
pub struct Cli {
    /// Key Vault URI, e.g. https://myvault.vault.azure.net
    #[arg(short = 'v', long = "keyvault", value_name = "URI")]
    pub keyvault: Option<String>,

    /// Name of the secret to fetch
    #[arg(short = 's', long = "secret", value_name = "NAME")]
    pub secret: Option<String>,

    /// Secret version to fetch (latest when omitted)
    #[arg(long = "secret-version", value_name = "VERSION")]
    pub secret_version: Option<String>,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: crate::tracing::LogLevel,

    /// Emit logs as JSON.
    #[arg(long, help = "Emit logs as JSON")]
    pub json: bool,
}

/// Parse the process arguments, exiting on invalid usage
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

/// Full usage text, as printed by `--help`
#[must_use]
pub fn usage() -> String {
    Cli::command().render_help().to_string()
}
