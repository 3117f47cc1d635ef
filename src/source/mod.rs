use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use url::Url;

use crate::app::App;
use crate::store::{ContentStore, NewSource};
use crate::telemetry::{self};
use crate::telemetry::ops::source::Phase as SourcePhase;

pub mod types;

/// digest source add/ls/rm
#[derive(Args)]
pub struct SourceCmd {
    #[command(subcommand)]
    pub cmd: SourceSub,
}

#[derive(Subcommand)]
pub enum SourceSub {
    // add a feed source (plan-only by default; use --apply to write)
    Add {
        url: String,
        #[arg(long)]
        name: Option<String>,
        /// Register the source without fetching it
        #[arg(long, default_value_t = false)]
        disabled: bool,
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
    // list sources
    Ls {
        /// Filter by enabled flag: true/false. Omit to show all.
        #[arg(long)]
        enabled: Option<bool>,
    },
    // remove a source
    Rm {
        id: i64,
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
}

pub async fn run(app: &App, args: SourceCmd) -> Result<()> {
    let log = telemetry::source();
    let _g = log.root_span().entered();
    let store = app.store.as_ref();
    match args.cmd {
        SourceSub::Add { url, name, disabled, apply } => add_source(store, url, name, !disabled, apply).await?,
        SourceSub::Ls { enabled } => ls_sources(store, enabled).await?,
        SourceSub::Rm { id, apply } => rm_source(store, id, apply).await?,
    }
    Ok(())
}

/// Only absolute http(s) URLs can be fetched.
pub fn validate_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("Invalid URL: {raw}"))?;
    if !matches!(url.scheme(), "http" | "https") { bail!("Invalid URL scheme (expected http/https): {raw}"); }
    Ok(url)
}

async fn add_source(store: &dyn ContentStore, url: String, name: Option<String>, enabled: bool, apply: bool) -> Result<()> {
    let log = telemetry::source();
    let _g = log.root_span_kv([
        ("mode", if apply { "apply".to_string() } else { "plan".to_string() }),
        ("url", url.clone()),
        ("name", format!("{:?}", name)),
        ("enabled", enabled.to_string()),
    ]).entered();

    let url = validate_url(&url)?.to_string();

    if !apply {
        log.info(format!("📝 Source plan — add url={} name={:?} enabled={}", url, name, enabled));
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() {
            log.plan(&types::SourceAddPlan { action: "add", url, name, enabled })?;
        }
        return Ok(());
    }
    let _s = log.span(&SourcePhase::Add).entered();
    let (source, inserted) = store.add_source(&NewSource { url, name, enabled }).await?;
    if inserted { log.info(format!("➕ Source {} added", source.source_id)); } else { log.info(format!("♻️ Source {} updated", source.source_id)); }
    if telemetry::config::json_mode() {
        log.result(&types::SourceAddResult { inserted, source })?;
    }
    Ok(())
}

async fn ls_sources(store: &dyn ContentStore, enabled: Option<bool>) -> Result<()> {
    let log = telemetry::source();
    let _s = log.span(&SourcePhase::List).entered();
    let sources = store.list_sources(enabled).await?;
    log.info("📡 Sources:");
    for s in &sources {
        log.info(format!("[{}] {} ({:?}) enabled={} created_at={}", s.source_id, s.url, s.name, s.enabled, s.created_at.to_rfc3339()));
    }
    if telemetry::config::json_mode() {
        log.result(&types::SourceList { sources })?;
    }
    Ok(())
}

async fn rm_source(store: &dyn ContentStore, id: i64, apply: bool) -> Result<()> {
    let log = telemetry::source();
    let source = store.get_source(id).await?.with_context(|| format!("source {id} not found"))?;
    if !apply {
        log.info(format!("📝 Would remove source {} ({})", source.source_id, source.url));
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() {
            log.plan(&types::SourceList { sources: vec![source] })?;
        }
        return Ok(());
    }
    let _s = log.span(&SourcePhase::Remove).entered();
    let removed = store.delete_source(id).await?;
    log.info(format!("🗑️ Source {} removed", id));
    if telemetry::config::json_mode() {
        log.result(&types::SourceRemoveResult { source_id: id, removed })?;
    }
    Ok(())
}
