use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::app::App;
use crate::store::{ArticleQuery, ArticleStatus};
use crate::telemetry::{self};

mod article;
mod r#loop;
mod tally;
mod verdict;

pub use r#loop::Processor;
pub use tally::{DrainError, DrainReport};

#[derive(Args, Debug)]
pub struct ProcessCmd {
    /// Articles fetched per batch (default: DIGEST_BATCH_SIZE)
    #[arg(long)] batch: Option<i64>,
    /// Concurrent workers (default: DIGEST_CONCURRENCY)
    #[arg(long)] width: Option<usize>,
    #[arg(long, default_value_t = false)] apply: bool,
    #[arg(long, default_value_t = 10)] plan_limit: usize,
}

#[derive(Serialize)]
struct ProcessPlan { pending: i64, batch: i64, width: usize, sample_article_ids: Vec<i64> }

#[derive(Serialize)]
struct ProcessResult { cancelled: bool, #[serde(flatten)] report: DrainReport }

pub async fn run(app: &App, args: ProcessCmd) -> Result<()> {
    let log = telemetry::process();
    let batch = args.batch.unwrap_or(app.config.batch_size).max(1);
    let width = args.width.unwrap_or(app.config.concurrency).max(1);
    let _g = log
        .root_span_kv([
            ("batch", batch.to_string()),
            ("width", width.to_string()),
            ("apply", args.apply.to_string()),
        ])
        .entered();

    if !args.apply {
        let pending = app.store.count_articles(Some(ArticleStatus::Pending)).await?;
        let sample = app.store.query_articles(&ArticleQuery::pending(args.plan_limit as i64)).await?;
        if telemetry::config::json_mode() {
            let ids = sample.iter().map(|a| a.article_id).collect();
            log.plan(&ProcessPlan { pending, batch, width, sample_article_ids: ids })?;
        } else {
            log.info(format!("📝 Process plan — pending={} batch={} width={}", pending, batch, width));
            for a in &sample { log.info(format!("  article_id={} pub_date={} title={}", a.article_id, a.pub_date, a.title)); }
            if (args.plan_limit as i64) < pending { log.info(format!("  ... ({} more)", pending - args.plan_limit as i64)); }
            log.info("   Use --apply to run the model over pending articles.");
        }
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let (cancelled, report) = match app.processor().with_width(width).drain(&cancel, batch).await {
        Ok(report) => (false, report),
        Err(DrainError::Cancelled(report)) => (true, report),
        Err(DrainError::Store(e)) => return Err(e),
    };

    if telemetry::config::json_mode() {
        log.result(&ProcessResult { cancelled, report })?;
    }
    Ok(())
}
