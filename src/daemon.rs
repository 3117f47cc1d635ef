use anyhow::Result;
use clap::Args;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::app::App;
use crate::telemetry::{self};
use crate::telemetry::ops::daemon::Phase as DaemonPhase;

#[derive(Args, Debug)]
pub struct DaemonCmd {
    /// Fire both jobs once at startup instead of waiting a full interval
    #[arg(long, default_value_t = false)]
    pub run_now: bool,
}

pub async fn run(app: &App, args: DaemonCmd) -> Result<()> {
    let log = telemetry::daemon();
    let _g = log.root_span_kv([
        ("fetch_every_secs", app.config.fetch_interval.as_secs().to_string()),
        ("process_every_secs", app.config.process_interval.as_secs().to_string()),
        ("run_now", args.run_now.to_string()),
    ]).entered();

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    schedule(app, &shutdown, args.run_now).await
}

/// Interval loop for fetching and processing until `shutdown` fires. A process tick is skipped
/// while the previous drain is still running.
pub async fn schedule(app: &App, shutdown: &CancellationToken, run_now: bool) -> Result<()> {
    let log = telemetry::daemon();
    let start = if run_now { Instant::now() } else { Instant::now() + app.config.fetch_interval };
    let mut fetch_tick = interval_at(start, app.config.fetch_interval);
    let start = if run_now { Instant::now() } else { Instant::now() + app.config.process_interval };
    let mut process_tick = interval_at(start, app.config.process_interval);
    fetch_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    process_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    log.info(format!(
        "⏰ Scheduler started — fetch every {}s, process every {}s (batch={})",
        app.config.fetch_interval.as_secs(), app.config.process_interval.as_secs(), app.config.scheduled_batch_size
    ));

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = fetch_tick.tick() => {
                let _s = log.span(&DaemonPhase::FetchTick).entered();
                log.info("📡 Fetching feeds...");
                drop(_s);
                match app.ingestor.fetch_all_enabled(shutdown).await {
                    Ok(r) => log.info(format!("📡 Fetch done — new={} failed_sources={}", r.totals.inserted, r.totals.failed_sources)),
                    Err(e) => log.error(format!("❌ Fetch tick failed: {e:#}")),
                }
            }
            _ = process_tick.tick() => {
                let _s = log.span(&DaemonPhase::ProcessTick).entered();
                if app.run_processing(app.config.scheduled_batch_size) {
                    log.info("🧠 Processing articles...");
                } else {
                    log.info("⏭️ Previous processing still running, skipping tick");
                }
            }
        }
    }

    let _s = log.span(&DaemonPhase::Shutdown).entered();
    log.info("🛑 Shutting down — waiting for running job");
    drop(_s);
    app.jobs.shutdown().await;
    log.info("👋 Scheduler stopped");
    Ok(())
}
