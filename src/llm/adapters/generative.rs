use serde::{Deserialize, Serialize};
use url::Url;

use super::{WireAdapter, WireRequest};
use crate::llm::error::GatewayError;
use crate::llm::settings::ProviderConfig;

/// Google-style `models/<model>:generateContent`, key passed as a query parameter.
pub struct GenerativeContent;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Instruction>,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Instruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl WireAdapter for GenerativeContent {
    fn name(&self) -> &'static str { "generative-content" }

    fn request(&self, cfg: &ProviderConfig, system: &str, user: &str) -> Result<WireRequest, GatewayError> {
        let body = GenerateRequest {
            system_instruction: (!system.is_empty()).then(|| Instruction {
                parts: vec![Part { text: system.to_string() }],
            }),
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part { text: user.to_string() }],
            }],
        };

        let raw = format!("{}/v1beta/models/{}:generateContent", cfg.api_url, cfg.model);
        let mut url = Url::parse(&raw).map_err(|e| GatewayError::InvalidConfig(format!("{raw}: {e}")))?;
        url.query_pairs_mut().append_pair("key", &cfg.api_key);

        Ok(WireRequest {
            url: url.into(),
            bearer: None,
            body: serde_json::to_value(&body).map_err(|e| GatewayError::InvalidConfig(e.to_string()))?,
        })
    }

    fn parse_reply(&self, body: &[u8]) -> Result<String, GatewayError> {
        let parsed: GenerateResponse =
            serde_json::from_slice(body).map_err(|e| GatewayError::decode(e, body))?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or(GatewayError::EmptyReply("no response from generative model"))
    }
}
