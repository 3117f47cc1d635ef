use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

mod app;
mod config;
mod daemon;
mod ingestion;
mod init;
mod jobs;
mod llm;
mod model;
mod pipeline;
mod settings;
mod source;
mod stats;
mod store;
mod telemetry;

use app::App;
use config::AppConfig;
use store::pg::PgStore;

#[derive(Parser)]
#[command(name = "digest", about = "Feed ingestion and AI digest pipeline")]
struct Cli {
    #[arg(global = true, short, long)]
    dsn: Option<String>,
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run migrations and seed default settings
    Init(init::InitCmd),
    Source(source::SourceCmd),
    Ingest(ingestion::IngestCmd),
    Process(pipeline::process::ProcessCmd),
    Articles(stats::ArticlesCmd),
    Settings(settings::SettingsCmd),
    Model(model::ModelCmd),
    Status(stats::StatusCmd),
    /// Fetch and process on fixed intervals until Ctrl-C
    Daemon(daemon::DaemonCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // initialize logging/tracing (stderr). Respect RUST_LOG and DIGEST_LOG_FORMAT
    telemetry::config::init_tracing();

    let config = AppConfig::from_env();
    let dsn = cli
        .dsn
        .or_else(|| config.database_url.clone())
        .context("Please provide --dsn or set DATABASE_URL in .env")?;

    let pg = Arc::new(PgStore::connect(&dsn).await?);
    let app = App::new(config, pg.clone())?;

    match cli.command {
        Commands::Init(args) => init::run(&pg, args).await?,
        Commands::Source(args) => source::run(&app, args).await?,
        Commands::Ingest(args) => ingestion::run(&app, args).await?,
        Commands::Process(args) => pipeline::process::run(&app, args).await?,
        Commands::Articles(args) => stats::articles(&app, args).await?,
        Commands::Settings(args) => settings::run(&app, args).await?,
        Commands::Model(args) => model::run(&app, args).await?,
        Commands::Status(args) => stats::status(&app, args).await?,
        Commands::Daemon(args) => daemon::run(&app, args).await?,
    }

    Ok(())
}
