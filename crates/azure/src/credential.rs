//! Ambient Azure identity
//!
//! [`DefaultCredential`] asks each identity source the environment offers
//! for a token, in order:
//!
//! 1. Workload identity: `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and
//!    `AZURE_FEDERATED_TOKEN_FILE` (or `AZURE_FEDERATED_TOKEN`)
//! 2. App Service managed identity: `IDENTITY_ENDPOINT`, `IDENTITY_HEADER`
//! 3. Virtual machine managed identity through IMDS
//! 4. The signed-in Azure CLI account
//!
//! Every source is an `azure_identity` credential. A failing source never
//! ends the chain: the next one is asked, and the final error lists what
//! each source reported.

use async_trait::async_trait;
use azure_core::HttpClient;
use azure_core::credentials::{AccessToken, TokenCredential};
use azure_core::error::ErrorKind;
use azure_identity::{
    AppServiceManagedIdentityCredential, AzureCliCredential, ImdsId, TokenCredentialOptions,
    VirtualMachineManagedIdentityCredential, WorkloadIdentityCredential,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// OAuth2 scope for the Azure Key Vault data plane
pub const KEY_VAULT_SCOPE: &str = "https://vault.azure.net/.default";

/// IMDS only answers on Azure hosts; elsewhere the connect must fail fast
const IMDS_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Error types for building the credential chain
#[derive(Debug, Error)]
pub enum CredentialError {
    /// A credential source could not be constructed
    #[error("failed to set up {credential}: {message}")]
    Setup {
        /// Credential that failed
        credential: &'static str,
        /// Description of the failure
        message: String,
    },
}

#[derive(Debug)]
struct Source {
    name: &'static str,
    credential: Arc<dyn TokenCredential>,
}

/// Tries each identity source in order until one yields a token.
#[derive(Debug)]
pub struct DefaultCredential {
    sources: Vec<Source>,
}

impl DefaultCredential {
    /// Build the chain from the process environment.
    ///
    /// Workload identity and App Service identity join the chain only when
    /// their variables are set. IMDS uses the user-assigned identity named by
    /// `AZURE_CLIENT_ID` when present.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Setup`] if a source that is always present
    /// cannot be constructed.
    pub fn new() -> Result<Self, CredentialError> {
        let mut chain = Self::empty();

        match WorkloadIdentityCredential::from_env(TokenCredentialOptions::default()) {
            Ok(credential) => chain.push("WorkloadIdentityCredential", credential),
            Err(err) => tracing::debug!(error = %err, "Workload identity not configured"),
        }

        if std::env::var_os("IDENTITY_ENDPOINT").is_some() {
            match AppServiceManagedIdentityCredential::new(TokenCredentialOptions::default()) {
                Ok(credential) => chain.push("AppServiceManagedIdentityCredential", credential),
                Err(err) => tracing::debug!(error = %err, "App Service identity unusable"),
            }
        }

        let imds_http = reqwest::Client::builder()
            .connect_timeout(IMDS_CONNECT_TIMEOUT)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| CredentialError::Setup {
                credential: "VirtualMachineManagedIdentityCredential",
                message: format!("failed to create HTTP client: {e}"),
            })?;
        let imds_http: Arc<dyn HttpClient> = Arc::new(imds_http);
        let id = std::env::var("AZURE_CLIENT_ID").map_or(ImdsId::SystemAssigned, ImdsId::ClientId);
        let imds = VirtualMachineManagedIdentityCredential::new(id, imds_http).map_err(|e| {
            CredentialError::Setup {
                credential: "VirtualMachineManagedIdentityCredential",
                message: e.to_string(),
            }
        })?;
        chain.push("VirtualMachineManagedIdentityCredential", imds);

        let cli = AzureCliCredential::new().map_err(|e| CredentialError::Setup {
            credential: "AzureCliCredential",
            message: e.to_string(),
        })?;
        chain.push("AzureCliCredential", cli);

        tracing::debug!(sources = ?chain.source_names(), "Built default credential chain");
        Ok(chain)
    }

    /// A chain with no sources
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Append a named source to the chain
    #[must_use]
    pub fn with_source(mut self, name: &'static str, credential: Arc<dyn TokenCredential>) -> Self {
        self.push(name, credential);
        self
    }

    /// Names of the sources, in the order they are tried
    #[must_use]
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.name).collect()
    }

    fn push(&mut self, name: &'static str, credential: Arc<dyn TokenCredential>) {
        self.sources.push(Source { name, credential });
    }
}

#[async_trait]
impl TokenCredential for DefaultCredential {
    async fn get_token(&self, scopes: &[&str]) -> azure_core::Result<AccessToken> {
        let mut failures = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            match source.credential.get_token(scopes).await {
                Ok(token) => {
                    tracing::debug!(credential = source.name, "Acquired access token");
                    return Ok(token);
                }
                Err(err) => {
                    tracing::debug!(
                        credential = source.name,
                        error = %err,
                        "Credential failed, trying next"
                    );
                    failures.push(format!("{}: {err}", source.name));
                }
            }
        }

        Err(azure_core::Error::with_message(ErrorKind::Credential, || {
            if failures.is_empty() {
                "no credential sources are configured".to_string()
            } else {
                format!(
                    "no credential source produced a token\n{}",
                    failures.join("\n")
                )
            }
        }))
    }

    async fn clear_cache(&self) -> azure_core::Result<()> {
        for source in &self.sources {
            source.credential.clear_cache().await?;
        }
        Ok(())
    }
}
