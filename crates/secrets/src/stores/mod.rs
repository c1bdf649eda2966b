//! Secret store implementations
//!
//! Compiled for this crate's tests and behind the `test-util` feature.
//!
//! This module provides stores that require no external dependencies:
//!
//! - [`StaticSecretStore`] - In-memory secrets and scripted listing pages
//!
//! Network-backed stores are available via separate crates:
//!
//! - `azure-keyvault` - Azure Key Vault (azkv-azure crate)

mod memory;

pub use memory::StaticSecretStore;
