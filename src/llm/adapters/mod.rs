use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::error::GatewayError;
use super::settings::ProviderConfig;

mod chat_completions;
mod generative;

pub use chat_completions::ChatCompletions;
pub use generative::GenerativeContent;

/// A provider-ready HTTP call: where to POST, how to authenticate, what to send.
#[derive(Clone, Debug, PartialEq)]
pub struct WireRequest {
    pub url: String,
    pub bearer: Option<String>,
    pub body: Value,
}

/// Translates one chat turn into a provider wire format and back.
pub trait WireAdapter: Send + Sync {
    fn name(&self) -> &'static str;
    fn request(&self, cfg: &ProviderConfig, system: &str, user: &str) -> Result<WireRequest, GatewayError>;
    fn parse_reply(&self, body: &[u8]) -> Result<String, GatewayError>;
}

/// Provider id → adapter. Unknown ids use the fallback (chat-completions).
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn WireAdapter>>,
    fallback: Arc<dyn WireAdapter>,
}

impl AdapterRegistry {
    pub fn new(fallback: Arc<dyn WireAdapter>) -> Self {
        Self { adapters: HashMap::new(), fallback }
    }

    pub fn register(&mut self, provider: &str, adapter: Arc<dyn WireAdapter>) {
        self.adapters.insert(provider.to_ascii_lowercase(), adapter);
    }

    pub fn resolve(&self, provider: &str) -> &dyn WireAdapter {
        self.adapters
            .get(&provider.to_ascii_lowercase())
            .unwrap_or(&self.fallback)
            .as_ref()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        let chat: Arc<dyn WireAdapter> = Arc::new(ChatCompletions);
        let generative: Arc<dyn WireAdapter> = Arc::new(GenerativeContent);
        let mut registry = Self::new(chat.clone());
        for id in ["openai", "ollama", "deepseek", "openrouter"] {
            registry.register(id, chat.clone());
        }
        for id in ["google", "gemini"] {
            registry.register(id, generative.clone());
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_selects_by_provider_id() {
        let reg = AdapterRegistry::default();
        assert_eq!(reg.resolve("google").name(), "generative-content");
        assert_eq!(reg.resolve("Gemini").name(), "generative-content");
        assert_eq!(reg.resolve("openai").name(), "chat-completions");
        assert_eq!(reg.resolve("some-new-vendor").name(), "chat-completions");
        assert_eq!(reg.resolve("").name(), "chat-completions");
    }
}
