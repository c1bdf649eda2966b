//! Value types exchanged with secret stores
//!
//! - [`SecureSecret`]: A wrapper around `secrecy::SecretString` that auto-zeros on drop
//! - [`SecretBundle`]: A fetched secret with its identifier

use secrecy::{ExposeSecret, SecretString};

/// A secret value with automatic memory zeroing on drop.
///
/// This type wraps `secrecy::SecretString` to ensure:
/// - Secret values are zeroed from memory when dropped
/// - Debug output shows `[REDACTED]` instead of the actual value
/// - Explicit `.expose()` call required to access the value
#[derive(Clone)]
pub struct SecureSecret {
    inner: SecretString,
}

impl SecureSecret {
    /// Create a new secure secret from a string.
    #[must_use]
    pub fn new(value: String) -> Self {
        Self {
            inner: SecretString::from(value),
        }
    }

    /// Expose the secret value for use.
    ///
    /// The caller must not log the exposed value.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }

    /// Get the length of the secret value without exposing it.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.expose_secret().len()
    }

    /// Check if the secret value is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl std::fmt::Display for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// A secret returned by [`SecretStore::get_secret`](crate::SecretStore::get_secret)
#[derive(Debug, Clone)]
pub struct SecretBundle {
    /// Name the secret was requested under
    pub name: String,
    /// The secret value
    pub value: SecureSecret,
    /// Store-specific identifier of the returned version, when known
    pub id: Option<String>,
}

impl SecretBundle {
    /// Create a bundle without a store identifier
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: SecureSecret::new(value.into()),
            id: None,
        }
    }

    /// Attach the store identifier
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_secret_redacts_debug_and_display() {
        let secret = SecureSecret::new("hunter22".to_string());
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(format!("{secret}"), "[REDACTED]");
        assert_eq!(secret.expose(), "hunter22");
        assert_eq!(secret.len(), 8);
        assert!(!secret.is_empty());
    }

    #[test]
    fn test_bundle_debug_hides_value() {
        let bundle = SecretBundle::new("db-password", "s3cr3t-value")
            .with_id("https://example.vault.azure.net/secrets/db-password/abc");
        let debug = format!("{bundle:?}");
        assert!(debug.contains("db-password"));
        assert!(!debug.contains("s3cr3t-value"));
        assert_eq!(bundle.value.expose(), "s3cr3t-value");
    }
}
