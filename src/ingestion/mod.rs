use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::app::App;
use crate::store::{ContentStore, Source};
use crate::telemetry::{self};
use crate::telemetry::ops::ingest::Phase as IngestPhase;

mod fetch;
mod parse;
pub mod types;

use types::{IngestApply, SourceSummary};

#[derive(Args)]
pub struct IngestCmd {
    /// Only this source (by id); default is every enabled source
    #[arg(long)] pub source: Option<i64>,
    #[arg(long, default_value_t=false)] pub apply: bool,
    #[arg(long, default_value_t=10)] pub plan_limit: usize,
}

/// Fetches feeds and records unseen items as pending articles.
#[derive(Clone)]
pub struct Ingestor {
    http: Client,
    store: Arc<dyn ContentStore>,
}

impl Ingestor {
    pub fn new(store: Arc<dyn ContentStore>, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, store })
    }

    /// Fetch one source and insert the items whose link has never been seen.
    /// A store error on one item is logged and counted; the rest of the feed still lands.
    pub async fn fetch_source(&self, source: &Source, cancel: &CancellationToken) -> Result<SourceSummary> {
        let log = telemetry::ingest();

        let xml = fetch::fetch_feed(&self.http, &source.url, cancel)
            .instrument(log.span(&IngestPhase::FetchFeed))
            .await?;
        let items = { let _s = log.span(&IngestPhase::ParseFeed).entered(); parse::parse_items(&xml)? };

        let fetched_at = Utc::now();
        let mut summary = SourceSummary { source_id: source.source_id, ..Default::default() };
        for item in &items {
            let Some(new) = parse::to_new_article(source.source_id, item, fetched_at) else {
                summary.skipped += 1;
                log.debug_kv("↩️ skip", [("reason", "no-link".to_string())]);
                continue;
            };
            let written = self
                .store
                .find_or_create_article(&new)
                .instrument(log.span(&IngestPhase::WriteArticle))
                .await;
            let (article, created) = match written {
                Ok(pair) => pair,
                Err(e) => {
                    summary.failed += 1;
                    log.warn(format!("⚠️ Item {} not stored: {e:#}", new.link));
                    continue;
                }
            };
            if created {
                summary.inserted += 1;
                log.info_kv("➕ insert", [("article_id", article.article_id.to_string()), ("title", article.title.clone())]);
            } else {
                summary.skipped += 1;
            }
        }

        log.source_summary(source.source_id, summary.inserted, summary.skipped);
        Ok(summary)
    }

    /// Fetch every enabled source in turn. A failing source is logged and recorded, never fatal.
    pub async fn fetch_all_enabled(&self, cancel: &CancellationToken) -> Result<IngestApply> {
        let sources = self.store.list_sources(Some(true)).await?;
        Ok(self.fetch_each(&sources, cancel).await)
    }

    pub async fn fetch_each(&self, sources: &[Source], cancel: &CancellationToken) -> IngestApply {
        let log = telemetry::ingest();
        let mut out = IngestApply::default();

        for source in sources {
            if cancel.is_cancelled() {
                log.warn("⏹️ ingest cancelled");
                break;
            }
            let span = log.span_kv(&IngestPhase::Source, [("source_id", source.source_id.to_string()), ("url", source.url.clone())]);
            match self.fetch_source(source, cancel).instrument(span).await {
                Ok(summary) => {
                    out.totals.inserted += summary.inserted;
                    out.per_source.push(summary);
                }
                Err(e) => {
                    log.warn(format!("⚠️ Source {} failed: {e:#}", source.source_id));
                    out.totals.failed_sources += 1;
                    out.per_source.push(SourceSummary { source_id: source.source_id, error: Some(format!("{e:#}")), ..Default::default() });
                }
            }
            out.totals.sources += 1;
        }

        log.totals(out.totals.sources, out.totals.inserted, out.totals.failed_sources);
        out
    }
}

pub async fn run(app: &App, args: IngestCmd) -> Result<()> {
    let log = telemetry::ingest();
    let _g = log.root_span_kv([
        ("apply", args.apply.to_string()),
        ("source", format!("{:?}", args.source)),
    ]).entered();

    let sources = match args.source {
        Some(id) => {
            let source = app.store.get_source(id).await?.with_context(|| format!("source {id} not found"))?;
            vec![source]
        }
        None => app.store.list_sources(Some(true)).await?,
    };

    if !args.apply {
        if telemetry::config::json_mode() {
            use types::{IngestPlan, SourceSample};
            let samples: Vec<SourceSample> = sources.iter().take(args.plan_limit)
                .map(|s| SourceSample { source_id: s.source_id, url: s.url.clone(), name: s.name.clone() })
                .collect();
            log.plan(&IngestPlan { sources: sources.len(), sample_sources: samples })?;
        } else {
            log.info(format!("📝 Ingest plan — sources={}", sources.len()));
            for s in sources.iter().take(args.plan_limit) { log.info(format!("  source_id={} url={} name={:?}", s.source_id, s.url, s.name)); }
            if sources.len() > args.plan_limit { log.info(format!("  ... ({} more)", sources.len() - args.plan_limit)); }
            log.info("   Use --apply to execute.");
        }
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let result = app.ingestor.fetch_each(&sources, &cancel).await;

    if telemetry::config::json_mode() {
        log.result(&result)?;
    }
    Ok(())
}
