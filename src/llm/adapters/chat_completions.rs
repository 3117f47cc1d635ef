use serde::{Deserialize, Serialize};

use super::{WireAdapter, WireRequest};
use crate::llm::error::GatewayError;
use crate::llm::settings::ProviderConfig;

/// OpenAI-compatible `/chat/completions` (OpenAI, Ollama, most hosted gateways).
pub struct ChatCompletions;

#[derive(Debug, Clone, Serialize)]
struct ApiChatCompletionRequest {
    model: String,
    messages: Vec<ApiChatMessage>,
}

#[derive(Debug, Clone, Serialize)]
struct ApiChatMessage {
    role: String,
    content: Option<String>,
}

// Replies only need the text; `role` is optional on many compatible servers.
#[derive(Debug, Clone, Deserialize)]
struct ApiReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ApiChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiChatChoice {
    message: ApiReplyMessage,
}

impl WireAdapter for ChatCompletions {
    fn name(&self) -> &'static str { "chat-completions" }

    fn request(&self, cfg: &ProviderConfig, system: &str, user: &str) -> Result<WireRequest, GatewayError> {
        let body = ApiChatCompletionRequest {
            model: cfg.model.clone(),
            messages: vec![
                ApiChatMessage { role: "system".into(), content: Some(system.to_string()) },
                ApiChatMessage { role: "user".into(), content: Some(user.to_string()) },
            ],
        };
        Ok(WireRequest {
            url: format!("{}/chat/completions", cfg.api_url),
            bearer: (!cfg.api_key.is_empty()).then(|| cfg.api_key.clone()),
            body: serde_json::to_value(&body).map_err(|e| GatewayError::InvalidConfig(e.to_string()))?,
        })
    }

    fn parse_reply(&self, body: &[u8]) -> Result<String, GatewayError> {
        let parsed: ApiChatCompletionResponse =
            serde_json::from_slice(body).map_err(|e| GatewayError::decode(e, body))?;
        let first = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(GatewayError::EmptyReply("no response from model"))?;
        Ok(first.message.content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ProviderConfig {
        ProviderConfig {
            provider: "openai".into(),
            api_url: "https://api.openai.com/v1".into(),
            api_key: "sk-test".into(),
            model: "gpt-4o-mini".into(),
        }
    }

    #[test]
    fn request_serializes_system_then_user() {
        let req = ChatCompletions.request(&cfg(), "You are helpful.", "Hello").unwrap();
        assert_eq!(req.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(req.bearer.as_deref(), Some("sk-test"));
        assert_eq!(req.body["model"], "gpt-4o-mini");
        assert_eq!(req.body["messages"][0]["role"], "system");
        assert_eq!(req.body["messages"][0]["content"], "You are helpful.");
        assert_eq!(req.body["messages"][1]["role"], "user");
        assert_eq!(req.body["messages"][1]["content"], "Hello");
    }

    #[test]
    fn keyless_provider_sends_no_bearer() {
        let mut c = cfg();
        c.api_key.clear();
        assert!(ChatCompletions.request(&c, "", "hi").unwrap().bearer.is_none());
    }

    #[test]
    fn parse_takes_first_choice() {
        let body = br#"{"choices":[{"message":{"role":"assistant","content":"first"}},{"message":{"role":"assistant","content":"second"}}]}"#;
        assert_eq!(ChatCompletions.parse_reply(body).unwrap(), "first");
    }

    #[test]
    fn reply_without_role_is_accepted() {
        let body = br#"{"choices":[{"message":{"content":"Hello!"}}]}"#;
        assert_eq!(ChatCompletions.parse_reply(body).unwrap(), "Hello!");
    }

    #[test]
    fn empty_choices_is_an_error() {
        let err = ChatCompletions.parse_reply(br#"{"choices":[]}"#).unwrap_err();
        assert_eq!(err.to_string(), "no response from model");
    }

    #[test]
    fn garbage_body_reports_decode_error_with_body() {
        let err = ChatCompletions.parse_reply(b"<html>oops</html>").unwrap_err();
        assert!(matches!(err, GatewayError::Decode { .. }));
        assert!(err.to_string().contains("<html>oops</html>"));
    }
}
