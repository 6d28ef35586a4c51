use crate::auth::{ApiKeyAuth, BearerTokenAuth, CredentialProvider, OAuth2Auth};
use crate::client::blocking::BlockingClient;
use crate::client::builder::ClientBuilder;
use crate::services::{AiService, DatabaseService, WorkflowService};
use crate::transport::{Transport, TransportFactory};
use crate::{ClientConfig, Result};
use serde_json::Value;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Asynchronous DataAPI client.
///
/// Cheap to share behind an `Arc`; many calls may be in flight at once. The
/// network transport is created on first use and released by [`close`](Self::close),
/// by a [`Session`] guard, or when the client is dropped.
pub struct Client {
    pub(crate) config: Arc<ClientConfig>,
    pub(crate) credentials: Arc<dyn CredentialProvider>,
    pub(crate) transport_factory: TransportFactory,
    transport: Mutex<Option<Arc<dyn Transport>>>,
}

impl Client {
    pub(crate) fn from_parts(
        config: Arc<ClientConfig>,
        credentials: Arc<dyn CredentialProvider>,
        transport_factory: TransportFactory,
    ) -> Self {
        Self {
            config,
            credentials,
            transport_factory,
            transport: Mutex::new(None),
        }
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Client authenticating with an `X-API-Key` header.
    pub fn with_api_key(api_key: impl Into<String>, config: ClientConfig) -> Result<Self> {
        ClientBuilder::new()
            .config(config)
            .credentials(Arc::new(ApiKeyAuth::new(api_key)?))
            .build()
    }

    /// Client authenticating with `Authorization: Bearer <token>`.
    pub fn with_bearer_token(token: impl Into<String>, config: ClientConfig) -> Result<Self> {
        ClientBuilder::new()
            .config(config)
            .credentials(Arc::new(BearerTokenAuth::new(token)?))
            .build()
    }

    /// Client using the OAuth2 client-credentials flow.
    pub fn with_oauth2(auth: OAuth2Auth, config: ClientConfig) -> Result<Self> {
        ClientBuilder::new()
            .config(config)
            .credentials(Arc::new(auth))
            .build()
    }

    /// Configuration from `DATAAPI_*` variables and the API key from the
    /// keyring or `DATAAPI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        ClientBuilder::from_env()?.build()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.credentials
    }

    /// Blocking client sharing this client's configuration and credentials.
    ///
    /// The blocking client owns its own transport and runtime.
    pub fn to_blocking(&self) -> BlockingClient {
        BlockingClient::from_client(Client::from_parts(
            self.config.clone(),
            self.credentials.clone(),
            self.transport_factory.clone(),
        ))
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<dyn Transport>>> {
        self.transport.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the transport, creating it on first use.
    pub(crate) fn transport(&self) -> Result<Arc<dyn Transport>> {
        let mut slot = self.slot();
        if let Some(transport) = slot.as_ref() {
            return Ok(transport.clone());
        }
        debug!(base_url = self.config.base_url().as_str(), "creating transport");
        let transport = (self.transport_factory)(&self.config)?;
        *slot = Some(transport.clone());
        Ok(transport)
    }

    /// Whether a transport is currently held.
    pub fn is_open(&self) -> bool {
        self.slot().is_some()
    }

    /// Releases the transport. Idempotent; the next call opens a fresh one.
    pub fn close(&self) {
        if self.slot().take().is_some() {
            debug!("transport released");
        }
    }

    /// Scoped use of the client: the transport is released when the guard drops.
    pub fn session(&self) -> Session<'_> {
        Session { client: self }
    }

    pub fn databases(&self) -> DatabaseService<'_, Client> {
        DatabaseService::new(self)
    }

    pub fn ai(&self) -> AiService<'_, Client> {
        AiService::new(self)
    }

    pub fn workflows(&self) -> WorkflowService<'_, Client> {
        WorkflowService::new(self)
    }

    /// `GET /health`
    pub async fn health_check(&self) -> Result<Value> {
        self.get("/health").await
    }

    /// `GET /user`
    pub async fn user_info(&self) -> Result<Value> {
        self.get("/user").await
    }

    /// `GET /info`
    pub async fn api_info(&self) -> Result<Value> {
        self.get("/info").await
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("credentials", &self.credentials)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Guard returned by [`Client::session`]. Dereferences to the client and
/// closes it on drop, including on early return and unwinding.
pub struct Session<'a> {
    client: &'a Client,
}

impl Deref for Session<'_> {
    type Target = Client;

    fn deref(&self) -> &Client {
        self.client
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.client.close();
    }
}
