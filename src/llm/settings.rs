use std::collections::HashMap;

pub const PROVIDER: &str = "llm_provider";
pub const API_URL: &str = "llm_api_url";
pub const API_KEY: &str = "llm_api_key";
pub const MODEL: &str = "llm_model";
pub const PROMPT_FILTER: &str = "prompt_filter";
pub const PROMPT_SUMMARY: &str = "prompt_summary";
pub const FILTER_REJECT_MARKER: &str = "filter_reject_marker";

/// Every key the settings command accepts.
pub const KEYS: [&str; 7] = [PROVIDER, API_URL, API_KEY, MODEL, PROMPT_FILTER, PROMPT_SUMMARY, FILTER_REJECT_MARKER];

pub const DEFAULT_REJECT_MARKER: &str = "not worth";

const DEFAULT_FILTER_PROMPT: &str = r#"You are a news screening assistant. Decide whether the following article is worth reading.
Reply with JSON only: {"worth": true/false, "reason": "one short sentence"}
Only significant technology news and industry developments are worth reading; adverts, job postings and filler are not worth reading."#;

const DEFAULT_SUMMARY_PROMPT: &str = r#"Summarize the core content of the following article:
1. Keep it under 200 words
2. Lead with the key facts
3. Use plain, concise language"#;

/// Values seeded by `init` when a key has never been written.
pub fn defaults() -> [(&'static str, &'static str); 6] {
    [
        (PROVIDER, "openai"),
        (API_URL, "https://api.openai.com/v1"),
        (MODEL, "gpt-4o-mini"),
        (PROMPT_FILTER, DEFAULT_FILTER_PROMPT),
        (PROMPT_SUMMARY, DEFAULT_SUMMARY_PROMPT),
        (FILTER_REJECT_MARKER, DEFAULT_REJECT_MARKER),
    ]
}

/// Connection settings for the active provider, read fresh for every call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProviderConfig {
    pub provider: String,
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

impl ProviderConfig {
    pub fn from_settings(settings: &HashMap<String, String>) -> Self {
        let get = |k: &str| settings.get(k).map(|v| v.trim().to_string()).unwrap_or_default();
        Self {
            provider: get(PROVIDER),
            api_url: get(API_URL).trim_end_matches('/').to_string(),
            api_key: get(API_KEY),
            model: get(MODEL),
        }
    }
}

/// Mask a secret for display, keeping a short recognizable tail.
pub fn mask_secret(value: &str) -> String {
    let n = value.chars().count();
    if n <= 4 {
        return "*".repeat(n);
    }
    let tail: String = value.chars().skip(n - 4).collect();
    format!("{}{}", "*".repeat(n - 4), tail)
}
