//! Azure Key Vault secret store over the Key Vault secrets SDK

use async_trait::async_trait;
use azkv_secrets::{PageStream, SecretBundle, SecretStore, StoreError};
use azure_core::credentials::TokenCredential;
use azure_core::error::{ErrorKind, HttpError};
use azure_core::{ClientOptions, Context, Policy, PolicyResult, Request, Url};
use azure_security_keyvault_secrets::models::SecretListResult;
use azure_security_keyvault_secrets::{SecretClient, SecretClientOptions};
use futures::{StreamExt, stream};
use std::sync::Arc;

/// Key Vault data-plane API version
pub const API_VERSION: &str = "7.5";

/// Refuses requests that leave the vault's origin.
///
/// Listing follows the service's `nextLink`; this runs ahead of the bearer
/// token policy so a foreign link never sees the token.
#[derive(Debug)]
struct VaultOriginPolicy {
    vault: Url,
}

#[async_trait]
impl Policy for VaultOriginPolicy {
    async fn send(
        &self,
        ctx: &Context,
        request: &mut Request,
        next: &[Arc<dyn Policy>],
    ) -> PolicyResult {
        if request.url().origin() != self.vault.origin() {
            let url = request.url().to_string();
            return Err(azure_core::Error::with_message(
                ErrorKind::DataConversion,
                || format!("link '{url}' points outside the vault"),
            ));
        }
        next[0].send(ctx, request, &next[1..]).await
    }
}

/// Reads secrets from one Azure Key Vault.
///
/// Tokens come from the credential through the SDK's bearer token policy,
/// which reuses a token until it is about to expire.
pub struct KeyVaultClient {
    client: SecretClient,
    endpoint: Url,
}

impl std::fmt::Debug for KeyVaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVaultClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl KeyVaultClient {
    /// Create a client for the vault at `vault_uri`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidEndpoint`] if `vault_uri` is not an
    /// absolute `http` or `https` URL with a host.
    pub fn new(vault_uri: &str, credential: Arc<dyn TokenCredential>) -> Result<Self, StoreError> {
        let invalid = |message: String| StoreError::InvalidEndpoint {
            endpoint: vault_uri.to_string(),
            message,
        };

        let endpoint = Url::parse(vault_uri.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(endpoint.scheme(), "https" | "http") || endpoint.host_str().is_none() {
            return Err(invalid("expected an http(s) URL with a host".to_string()));
        }

        let options = SecretClientOptions {
            api_version: API_VERSION.to_string(),
            client_options: ClientOptions {
                per_call_policies: vec![Arc::new(VaultOriginPolicy {
                    vault: endpoint.clone(),
                })],
                ..ClientOptions::default()
            },
        };
        let client = SecretClient::new(endpoint.as_str(), credential, Some(options))
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    /// The vault endpoint requests are sent to
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Map an SDK error onto the store error taxonomy.
///
/// An HTTP response keeps its status, service code and message; everything
/// else is classified by the SDK's error kind.
fn store_error(err: &azure_core::Error) -> StoreError {
    if let Some(status) = err.http_status() {
        let code = match err.kind() {
            ErrorKind::HttpResponse { error_code, .. } => error_code.clone(),
            _ => None,
        };
        let message = HttpError::try_from(err)
            .and_then(HttpError::error_message)
            .unwrap_or_else(|| status.canonical_reason())
            .to_string();

        tracing::debug!(status = u16::from(status), code = ?code, "Key Vault returned an error");
        return StoreError::Status {
            status: u16::from(status),
            code,
            message,
        };
    }

    let message = describe(err);
    match err.kind() {
        ErrorKind::Credential => StoreError::Credential { message },
        ErrorKind::DataConversion => StoreError::decode(message),
        _ => StoreError::transport(message),
    }
}

/// The error and its causes, outermost first
fn describe(err: &azure_core::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

fn page_ids(page: SecretListResult) -> Vec<String> {
    page.value
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| item.id)
        .collect()
}

#[async_trait]
impl SecretStore for KeyVaultClient {
    fn provider_name(&self) -> &'static str {
        "azure-keyvault"
    }

    async fn get_secret(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<SecretBundle, StoreError> {
        let version = version.unwrap_or_default();
        tracing::debug!(vault = %self.endpoint, name, version, "Fetching secret");

        let bundle = self
            .client
            .get_secret(name, version, None)
            .await
            .map_err(|e| store_error(&e))?
            .into_body()
            .await
            .map_err(|e| store_error(&e))?;

        let value = bundle
            .value
            .ok_or_else(|| StoreError::decode(format!("secret '{name}' has no value")))?;
        let secret = SecretBundle::new(name, value);
        Ok(match bundle.id {
            Some(id) => secret.with_id(id),
            None => secret,
        })
    }

    fn list_secret_pages(&self) -> PageStream<'_> {
        let pager = match self.client.get_secrets(None) {
            Ok(pager) => pager,
            Err(err) => {
                return stream::once(async move { Err::<Vec<String>, _>(store_error(&err)) })
                    .boxed();
            }
        };

        pager
            .then(|page| async move {
                let page = page.map_err(|e| store_error(&e))?;
                let body = page.into_body().await.map_err(|e| store_error(&e))?;
                Ok::<_, StoreError>(page_ids(body))
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azkv_secrets::SecretPager;
    use azure_core::credentials::AccessToken;
    use azure_core::date::OffsetDateTime;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Default)]
    struct FixedCredential {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TokenCredential for FixedCredential {
        async fn get_token(&self, scopes: &[&str]) -> azure_core::Result<AccessToken> {
            assert_eq!(scopes, [crate::KEY_VAULT_SCOPE]);
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(azure_core::Error::message(
                    ErrorKind::Credential,
                    "AzureCliCredential: not signed in",
                ));
            }
            Ok(AccessToken::new(
                "test-token",
                OffsetDateTime::now_utc() + Duration::from_secs(3600),
            ))
        }

        async fn clear_cache(&self) -> azure_core::Result<()> {
            Ok(())
        }
    }

    fn client(server: &MockServer) -> (KeyVaultClient, Arc<FixedCredential>) {
        let credential = Arc::new(FixedCredential::default());
        let client = KeyVaultClient::new(&server.uri(), credential.clone()).unwrap();
        (client, credential)
    }

    async fn all_ids(client: &KeyVaultClient) -> Result<Vec<String>, StoreError> {
        let mut pager = SecretPager::new(client);
        let mut ids = Vec::new();
        while let Some(page) = pager.next_page().await {
            ids.extend(page?);
        }
        Ok(ids)
    }

    #[tokio::test]
    async fn test_get_latest_secret() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/secrets/foo/"))
            .and(query_param("api-version", API_VERSION))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": "bar",
                "id": format!("{}/secrets/foo/0123456789abcdef", server.uri()),
                "attributes": { "enabled": true }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = client(&server);
        let bundle = client.get_secret("foo", None).await.unwrap();
        assert_eq!(bundle.name, "foo");
        assert_eq!(bundle.value.expose(), "bar");
        assert!(bundle.id.unwrap().ends_with("/secrets/foo/0123456789abcdef"));
    }

    #[tokio::test]
    async fn test_get_specific_version() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/secrets/foo/v2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": "older" })))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = client(&server);
        let bundle = client.get_secret("foo", Some("v2")).await.unwrap();
        assert_eq!(bundle.value.expose(), "older");
        assert!(bundle.id.is_none());
    }

    #[tokio::test]
    async fn test_empty_version_means_latest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/secrets/foo/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": "latest" })))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = client(&server);
        let bundle = client.get_secret("foo", Some("")).await.unwrap();
        assert_eq!(bundle.value.expose(), "latest");
    }

    #[tokio::test]
    async fn test_not_found_maps_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/secrets/missing/"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {
                    "code": "SecretNotFound",
                    "message": "A secret with (name/id) missing was not found in this key vault."
                }
            })))
            .mount(&server)
            .await;

        let (client, _) = client(&server);
        let err = client.get_secret("missing", None).await.unwrap_err();
        assert!(err.is_not_found());
        match err {
            StoreError::Status { code, message, .. } => {
                assert_eq!(code.as_deref(), Some("SecretNotFound"));
                assert!(message.contains("was not found"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_forbidden_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/secrets/foo/"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": "Forbidden", "message": "caller is not authorized" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = client(&server);
        let err = client.get_secret("foo", None).await.unwrap_err();
        assert_eq!(err.status_code(), Some(403));
    }

    #[tokio::test]
    async fn test_error_without_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/secrets/foo/"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let (client, _) = client(&server);
        let err = client.get_secret("foo", None).await.unwrap_err();
        assert_eq!(err.status_code(), Some(409));
        assert!(err.to_string().contains("Conflict"));
    }

    #[tokio::test]
    async fn test_missing_value_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/secrets/foo/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "x" })))
            .mount(&server)
            .await;

        let (client, _) = client(&server);
        let err = client.get_secret("foo", None).await.unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
        assert_eq!(err.status_code(), None);
    }

    #[tokio::test]
    async fn test_credential_failure_sends_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let credential = Arc::new(FixedCredential {
            fail: true,
            ..FixedCredential::default()
        });
        let client = KeyVaultClient::new(&server.uri(), credential).unwrap();
        let err = client.get_secret("foo", None).await.unwrap_err();
        assert!(matches!(err, StoreError::Credential { .. }));
        assert!(err.to_string().contains("not signed in"));
    }

    #[tokio::test]
    async fn test_token_is_reused() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/secrets/foo/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": "bar" })))
            .expect(2)
            .mount(&server)
            .await;

        let (client, credential) = client(&server);
        client.get_secret("foo", None).await.unwrap();
        client.get_secret("foo", None).await.unwrap();
        assert_eq!(credential.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_list_follows_next_link() {
        let server = MockServer::start().await;
        let next_link = format!(
            "{}/secrets?api-version={API_VERSION}&$skiptoken=page2",
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/secrets"))
            .and(query_param("$skiptoken", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{ "id": "https://vault/secrets/s3" }],
                "nextLink": null
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/secrets"))
            .and(query_param("api-version", API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    { "id": "https://vault/secrets/s1" },
                    { "id": "https://vault/secrets/s2" }
                ],
                "nextLink": next_link
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let (client, _) = client(&server);
        assert_eq!(
            all_ids(&client).await.unwrap(),
            vec![
                "https://vault/secrets/s1",
                "https://vault/secrets/s2",
                "https://vault/secrets/s3"
            ]
        );
    }

    #[tokio::test]
    async fn test_list_failure_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/secrets"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let (client, _) = client(&server);
        let err = all_ids(&client).await.unwrap_err();
        assert_eq!(err.status_code(), Some(403));
    }

    #[tokio::test]
    async fn test_list_rejects_foreign_next_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/secrets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{ "id": "https://vault/secrets/s1" }],
                "nextLink": "https://attacker.example/secrets?$skiptoken=x"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = client(&server);
        let mut pager = SecretPager::new(&client);
        assert_eq!(
            pager.next_page().await.unwrap().unwrap(),
            vec!["https://vault/secrets/s1"]
        );
        let err = pager.next_page().await.unwrap().unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
        assert!(err.to_string().contains("outside the vault"));
    }

    #[test]
    fn test_invalid_endpoint() {
        let credential = Arc::new(FixedCredential::default());
        let err = KeyVaultClient::new("not a url", credential.clone()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidEndpoint { .. }));

        let err = KeyVaultClient::new("mailto:vault@example.com", credential.clone()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidEndpoint { .. }));

        let client = KeyVaultClient::new(" https://myvault.vault.azure.net/ ", credential).unwrap();
        assert_eq!(client.endpoint().as_str(), "https://myvault.vault.azure.net/");
    }
}
