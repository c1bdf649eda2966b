//! Azure integration for azkv
//!
//! This crate provides the Azure collaborators used by the `azkvquery` CLI:
//! - Ambient identity via the [`credential`] module ([`DefaultCredential`]),
//!   a chain of `azure_identity` credentials
//! - Azure Key Vault secrets via the [`keyvault`] module ([`KeyVaultClient`]),
//!   a [`SecretStore`](azkv_secrets::SecretStore) over the Key Vault SDK

pub mod credential;
pub mod keyvault;

// Re-export main types for convenience
pub use credential::{CredentialError, DefaultCredential, KEY_VAULT_SCOPE};
pub use keyvault::{API_VERSION, KeyVaultClient};
