use anyhow::Result;
use clap::{Args, Subcommand};

use crate::app::App;
use crate::store::{ArticleQuery, ArticleStatus};
use crate::telemetry::{self};
use crate::telemetry::ops::stats::Phase as StatsPhase;

pub mod summary;
pub mod types;

pub const PAGE_SIZE: i64 = 20;

#[derive(Args, Debug)]
pub struct StatusCmd {}

pub async fn status(app: &App, _args: StatusCmd) -> Result<()> {
    let log = telemetry::stats();
    let _g = log.root_span().entered();
    let _s = log.span(&StatsPhase::Summary).entered();

    let snap = app.status().await?;
    if telemetry::config::json_mode() {
        return log.result(&snap);
    }
    log.info("📄 Articles:");
    log.info(format!("  total={} pending={} processed={} filtered={}",
        snap.articles.total, snap.articles.pending, snap.articles.processed, snap.articles.filtered));
    log.info(format!("📡 Sources: total={} enabled={}", snap.sources.total, snap.sources.enabled));
    match snap.last_ingested_at {
        Some(ts) => log.info(format!("🕒 Last ingested: {}", ts.to_rfc3339())),
        None => log.info("🕒 Last ingested: never"),
    }
    Ok(())
}

/// `digest articles ...`
#[derive(Args, Debug)]
pub struct ArticlesCmd {
    #[command(subcommand)]
    pub cmd: ArticlesSub,
}

#[derive(Subcommand, Debug)]
pub enum ArticlesSub {
    /// List articles, newest publication first
    Ls {
        #[arg(long, value_enum)]
        status: Option<ArticleStatus>,
        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: i64,
    },
    /// Delete one article
    Rm {
        id: i64,
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
}

pub async fn articles(app: &App, args: ArticlesCmd) -> Result<()> {
    let log = telemetry::stats();
    let _g = log.root_span_kv([("cmd", format!("{:?}", args.cmd))]).entered();

    match args.cmd {
        ArticlesSub::Ls { status, page } => {
            let _s = log.span(&StatsPhase::ListArticles).entered();
            let page = page.max(1);
            let query = ArticleQuery { status, offset: (page - 1) * PAGE_SIZE, limit: PAGE_SIZE };
            let total = app.store.count_articles(status).await?;
            let rows = app.store.query_articles(&query).await?;

            if telemetry::config::json_mode() {
                let articles = rows.into_iter().map(types::ArticleRow::from).collect();
                return log.result(&types::ArticlePage { page, page_size: PAGE_SIZE, total, articles });
            }
            let pages = (total + PAGE_SIZE - 1) / PAGE_SIZE;
            log.info(format!("📄 Articles — page {}/{} total={}", page, pages.max(1), total));
            for a in &rows {
                log.info(format!("  #{} [{}] {} {}", a.article_id, a.status, a.pub_date.format("%Y-%m-%d %H:%M"), a.title));
                if !a.summary.is_empty() { log.info(format!("      {}", a.summary.lines().next().unwrap_or_default())); }
            }
        }
        ArticlesSub::Rm { id, apply } => {
            if !apply {
                if telemetry::config::json_mode() {
                    #[derive(serde::Serialize)]
                    struct RemovePlan { article_id: i64 }
                    return log.plan(&RemovePlan { article_id: id });
                }
                log.info(format!("📝 Would delete article {id}. Use --apply to execute."));
                return Ok(());
            }
            let removed = app.store.delete_article(id).await?;
            if telemetry::config::json_mode() {
                return log.result(&types::ArticleRemoved { article_id: id, removed });
            }
            if removed { log.info(format!("🗑️ Article {id} deleted")); } else { log.warn(format!("⚠️ Article {id} not found")); }
        }
    }
    Ok(())
}
