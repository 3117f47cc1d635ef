use std::collections::BTreeMap;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use crate::app::App;
use crate::llm::settings::{mask_secret, API_KEY, KEYS};
use crate::store::ContentStore;
use crate::telemetry::{self};
use crate::telemetry::ops::settings::Phase as SettingsPhase;

/// digest settings get/set
#[derive(Args)]
pub struct SettingsCmd {
    #[command(subcommand)]
    pub cmd: SettingsSub,
}

#[derive(Subcommand)]
pub enum SettingsSub {
    /// Print all settings (API key masked)
    Get,
    /// Upsert one or more `key=value` pairs
    Set {
        #[arg(required = true)]
        pairs: Vec<String>,
    },
}

pub async fn run(app: &App, args: SettingsCmd) -> Result<()> {
    let log = telemetry::settings();
    let _g = log.root_span().entered();
    match args.cmd {
        SettingsSub::Get => {
            let _s = log.span(&SettingsPhase::Read).entered();
            let shown = masked_settings(app.store.as_ref()).await?;
            if telemetry::config::json_mode() {
                return log.result(&shown);
            }
            log.info("⚙️ Settings:");
            for (k, v) in &shown {
                let first = v.lines().next().unwrap_or_default();
                let more = if v.lines().count() > 1 { " …" } else { "" };
                log.info(format!("  {k} = {first}{more}"));
            }
        }
        SettingsSub::Set { pairs } => {
            let _s = log.span(&SettingsPhase::Write).entered();
            let parsed = parse_pairs(&pairs)?;
            for (k, v) in &parsed {
                app.store.put_setting(k, v).await?;
                log.info_kv("✏️ set", [("key", k.clone())]);
            }
            log.info(format!("✅ Updated {} setting(s)", parsed.len()));
            if telemetry::config::json_mode() {
                let keys: Vec<&str> = parsed.iter().map(|(k, _)| k.as_str()).collect();
                log.result(&keys)?;
            }
        }
    }
    Ok(())
}

async fn masked_settings(store: &dyn ContentStore) -> Result<BTreeMap<String, String>> {
    let mut all: BTreeMap<String, String> = store.settings().await?.into_iter().collect();
    if let Some(key) = all.get_mut(API_KEY) {
        *key = mask_secret(key);
    }
    Ok(all)
}

/// Split `key=value` arguments. Values may contain `=`; keys must be known.
fn parse_pairs(pairs: &[String]) -> Result<Vec<(String, String)>> {
    let mut out = Vec::with_capacity(pairs.len());
    for p in pairs {
        let Some((k, v)) = p.split_once('=') else { bail!("expected key=value, got {p:?}") };
        let k = k.trim();
        if !KEYS.contains(&k) { bail!("unknown setting {k:?} (known: {})", KEYS.join(", ")); }
        out.push((k.to_string(), v.to_string()));
    }
    Ok(out)
}
