use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::Instrument;

use crate::llm::settings::{DEFAULT_REJECT_MARKER, FILTER_REJECT_MARKER, PROMPT_FILTER, PROMPT_SUMMARY};
use crate::llm::ChatModel;
use crate::store::{Article, ArticleStatus, ContentStore};
use crate::telemetry::{self};
use crate::telemetry::ops::process::Phase as ProcessPhase;

use super::verdict::decode_verdict;

/// Filter, then summarize if worth reading, then persist the terminal state.
///
/// Any model or store error is returned and the article stays Pending in the store.
pub async fn process_article(
    store: &dyn ContentStore,
    model: &dyn ChatModel,
    mut article: Article,
) -> Result<ArticleStatus> {
    let log = telemetry::process();
    let settings = store.settings().await?;
    let input = article.model_input();

    let reply = model
        .chat(setting(&settings, PROMPT_FILTER), &input)
        .instrument(log.span(&ProcessPhase::Filter))
        .await
        .context("filter call")?;
    // absent means default; an explicit empty value disables the marker
    let marker = settings.get(FILTER_REJECT_MARKER).map(String::as_str).unwrap_or(DEFAULT_REJECT_MARKER);
    let verdict = decode_verdict(&reply, marker);

    if !verdict.worth {
        article.settle(ArticleStatus::Filtered, verdict.reason, Utc::now());
        store.save_article(&article).instrument(log.span(&ProcessPhase::Persist)).await?;
        log.debug_kv("🚫 filtered", [("article_id", article.article_id.to_string())]);
        return Ok(ArticleStatus::Filtered);
    }

    let summary = model
        .chat(setting(&settings, PROMPT_SUMMARY), &input)
        .instrument(log.span(&ProcessPhase::Summarize))
        .await
        .context("summary call")?;
    article.settle(ArticleStatus::Processed, summary, Utc::now());
    store.save_article(&article).instrument(log.span(&ProcessPhase::Persist)).await?;
    log.debug_kv("✅ processed", [("article_id", article.article_id.to_string())]);
    Ok(ArticleStatus::Processed)
}

fn setting<'a>(settings: &'a HashMap<String, String>, key: &str) -> &'a str {
    settings.get(key).map(String::as_str).unwrap_or_default()
}
