use crate::auth::{resolve_api_key, ApiKeyAuth, BearerTokenAuth, CredentialProvider, OAuth2Auth};
use crate::client::blocking::BlockingClient;
use crate::client::core::Client;
use crate::transport::{http_transport_factory, TransportFactory};
use crate::{ClientConfig, Error, ErrorContext, Result};
use std::sync::Arc;

/// Builder for [`Client`] and [`BlockingClient`].
///
/// Credentials are required: pass an API key, a bearer token, an OAuth2
/// provider, or any [`CredentialProvider`].
pub struct ClientBuilder {
    config: Option<ClientConfig>,
    credentials: Option<Result<Arc<dyn CredentialProvider>>>,
    transport_factory: Option<TransportFactory>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            credentials: None,
            transport_factory: None,
        }
    }

    /// Builder seeded from `DATAAPI_*` variables. The API key is looked up in
    /// the keyring, then in `DATAAPI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::new().config(ClientConfig::from_env()?);
        if let Some(key) = resolve_api_key(None) {
            builder = builder.credentials_result(ApiKeyAuth::from_secret(key).map(into_provider));
        }
        Ok(builder)
    }

    /// Defaults to [`ClientConfig::default`].
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn api_key(self, api_key: impl Into<String>) -> Self {
        self.credentials_result(ApiKeyAuth::new(api_key).map(into_provider))
    }

    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.credentials_result(BearerTokenAuth::new(token).map(into_provider))
    }

    pub fn oauth2(self, auth: OAuth2Auth) -> Self {
        self.credentials(Arc::new(auth))
    }

    pub fn credentials(self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials_result(Ok(provider))
    }

    fn credentials_result(mut self, provider: Result<Arc<dyn CredentialProvider>>) -> Self {
        self.credentials = Some(provider);
        self
    }

    /// Replaces the reqwest transport, e.g. with a scripted one in tests.
    pub fn transport_factory(mut self, factory: TransportFactory) -> Self {
        self.transport_factory = Some(factory);
        self
    }

    pub fn build(self) -> Result<Client> {
        let credentials = match self.credentials {
            Some(provider) => provider?,
            None => {
                return Err(Error::validation_with_context(
                    "Either an API key or a credential provider must be supplied",
                    ErrorContext::new().with_source("client_builder"),
                ))
            }
        };
        Ok(Client::from_parts(
            Arc::new(self.config.unwrap_or_default()),
            credentials,
            self.transport_factory.unwrap_or_else(http_transport_factory),
        ))
    }

    pub fn build_blocking(self) -> Result<BlockingClient> {
        self.build().map(BlockingClient::from_client)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn into_provider<P: CredentialProvider + 'static>(provider: P) -> Arc<dyn CredentialProvider> {
    Arc::new(provider)
}
