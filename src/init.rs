use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::llm::settings;
use crate::store::pg::PgStore;
use crate::store::ContentStore;
use crate::telemetry::{self};
use crate::telemetry::ops::init::Phase as InitPhase;

#[derive(Args, Debug)]
pub struct InitCmd {}

#[derive(Serialize)]
struct InitResult { migrated: bool, seeded: Vec<&'static str> }

pub async fn run(pg: &PgStore, _args: InitCmd) -> Result<()> {
    let log = telemetry::init();
    let _g = log.root_span().entered();

    {
        let _s = log.span(&InitPhase::Migrate).entered();
        // Apply any pending migrations (idempotent)
        pg.migrate().await?;
    }
    log.info("✅ Database schema up to date");

    let seeded = seed_defaults(pg).await?;
    if seeded.is_empty() {
        log.info("ℹ️  Settings already present");
    } else {
        log.info(format!("🌱 Seeded default settings: {}", seeded.join(", ")));
    }

    if telemetry::config::json_mode() {
        log.result(&InitResult { migrated: true, seeded })?;
    }
    Ok(())
}

/// Write each default setting whose key has never been set. Returns the keys written.
pub async fn seed_defaults(store: &dyn ContentStore) -> Result<Vec<&'static str>> {
    let log = telemetry::init();
    let _s = log.span(&InitPhase::SeedSettings).entered();
    let mut seeded = Vec::new();
    for (key, value) in settings::defaults() {
        if store.put_setting_if_absent(key, value).await? {
            seeded.push(key);
        }
    }
    Ok(seeded)
}
