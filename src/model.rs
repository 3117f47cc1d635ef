use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use tracing::Instrument;

use crate::app::App;
use crate::telemetry::{self};
use crate::telemetry::ops::model::Phase as ModelPhase;

/// digest model ls/test
#[derive(Args)]
pub struct ModelCmd {
    #[command(subcommand)]
    pub cmd: ModelSub,
}

#[derive(Subcommand)]
pub enum ModelSub {
    /// List model ids offered by the configured provider
    Ls,
    /// Validate provider settings and send one probe message
    Test,
}

#[derive(Serialize)]
struct ModelList { models: Vec<String> }

#[derive(Serialize)]
struct ConnectionResult { ok: bool, reply: String }

pub async fn run(app: &App, args: ModelCmd) -> Result<()> {
    let log = telemetry::model();
    let _g = log.root_span().entered();
    match args.cmd {
        ModelSub::Ls => {
            let models = app.model_list().instrument(log.span(&ModelPhase::ListModels)).await?;
            if telemetry::config::json_mode() {
                return log.result(&ModelList { models });
            }
            log.info(format!("🧠 {} model(s):", models.len()));
            for m in &models { log.info(format!("  {m}")); }
        }
        ModelSub::Test => {
            let reply = app.test_model_connection().instrument(log.span(&ModelPhase::TestConnection)).await?;
            log.info(format!("✅ Connection ok — reply: {}", reply.trim()));
            if telemetry::config::json_mode() {
                log.result(&ConnectionResult { ok: true, reply })?;
            }
        }
    }
    Ok(())
}
