//! Model gateway: one `chat(system, user)` primitive over several provider wire formats.
//!
//! Provider settings are read from the store on every call so a settings change applies to
//! the very next request. The adapter is picked per call from [`AdapterRegistry`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::store::ContentStore;

pub mod adapters;
pub mod error;
pub mod settings;

pub use adapters::AdapterRegistry;
pub use error::GatewayError;
pub use settings::ProviderConfig;

/// Anything that can answer a system+user chat turn with text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, system: &str, user: &str) -> Result<String, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct ModelsEnvelope {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Clone)]
pub struct ModelGateway {
    store: Arc<dyn ContentStore>,
    http: HttpClient,
    registry: AdapterRegistry,
}

impl ModelGateway {
    pub fn new(store: Arc<dyn ContentStore>, timeout: Duration) -> Result<Self, GatewayError> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(GatewayError::from_reqwest)?;
        Ok(Self { store, http, registry: AdapterRegistry::default() })
    }

    pub async fn provider_config(&self) -> Result<ProviderConfig, GatewayError> {
        let all = self.store.settings().await.map_err(GatewayError::Store)?;
        Ok(ProviderConfig::from_settings(&all))
    }

    /// `GET <base>/models`, OpenAI-style `{data:[{id}]}` envelope.
    pub async fn list_models(&self) -> Result<Vec<String>, GatewayError> {
        let cfg = self.provider_config().await?;
        if cfg.api_url.is_empty() {
            return Err(GatewayError::MissingConfig("api url"));
        }

        let mut req = self.http.get(format!("{}/models", cfg.api_url));
        if !cfg.api_key.is_empty() {
            req = req.bearer_auth(&cfg.api_key);
        }
        let response = req.send().await.map_err(GatewayError::from_reqwest)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(GatewayError::from_reqwest)?;
        if status != reqwest::StatusCode::OK {
            return Err(GatewayError::status(status, &bytes));
        }

        let parsed: ModelsEnvelope =
            serde_json::from_slice(&bytes).map_err(|e| GatewayError::decode(e, &bytes))?;
        Ok(parsed.data.into_iter().map(|m| m.id).collect())
    }

    /// Validate the three connection fields, then send one live probe.
    pub async fn test_connection(&self) -> Result<String, GatewayError> {
        let cfg = self.provider_config().await?;
        if cfg.api_url.is_empty() {
            return Err(GatewayError::MissingConfig("api url"));
        }
        if cfg.api_key.is_empty() {
            return Err(GatewayError::MissingConfig("api key"));
        }
        if cfg.model.is_empty() {
            return Err(GatewayError::MissingConfig("model"));
        }
        self.chat_with(&cfg, "", "Hi").await
    }

    async fn chat_with(&self, cfg: &ProviderConfig, system: &str, user: &str) -> Result<String, GatewayError> {
        if cfg.api_url.is_empty() {
            return Err(GatewayError::MissingConfig("api url"));
        }
        if cfg.model.is_empty() {
            return Err(GatewayError::MissingConfig("model"));
        }

        let adapter = self.registry.resolve(&cfg.provider);
        let wire = adapter.request(cfg, system, user)?;
        tracing::debug!(adapter = adapter.name(), model = %cfg.model, "model call");

        let mut req = self.http.post(&wire.url).json(&wire.body);
        if let Some(token) = &wire.bearer {
            req = req.bearer_auth(token);
        }
        let response = req.send().await.map_err(GatewayError::from_reqwest)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(GatewayError::from_reqwest)?;
        if !status.is_success() {
            return Err(GatewayError::status(status, &bytes));
        }
        adapter.parse_reply(&bytes)
    }
}

#[async_trait]
impl ChatModel for ModelGateway {
    async fn chat(&self, system: &str, user: &str) -> Result<String, GatewayError> {
        let cfg = self.provider_config().await?;
        self.chat_with(&cfg, system, user).await
    }
}
