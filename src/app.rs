use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::ingestion::Ingestor;
use crate::jobs::Supervisor;
use crate::llm::{GatewayError, ModelGateway};
use crate::pipeline::process::{DrainError, Processor};
use crate::stats::{summary, types::StatusSnapshot};
use crate::store::ContentStore;
use crate::telemetry::{self};

/// Everything the commands and the scheduler share: store, gateway, ingestor and the job slot.
pub struct App {
    pub config: AppConfig,
    pub store: Arc<dyn ContentStore>,
    pub gateway: Arc<ModelGateway>,
    pub ingestor: Ingestor,
    pub jobs: Supervisor,
}

impl App {
    pub fn new(config: AppConfig, store: Arc<dyn ContentStore>) -> Result<Self> {
        let gateway = ModelGateway::new(store.clone(), config.http_timeout).context("building model gateway")?;
        let ingestor = Ingestor::new(store.clone(), config.http_timeout)?;
        Ok(Self { config, store, gateway: Arc::new(gateway), ingestor, jobs: Supervisor::new() })
    }

    /// Ingest one source, or every enabled one. Returns the number of new articles.
    pub async fn ingest(&self, source_id: Option<i64>, cancel: &CancellationToken) -> Result<usize> {
        match source_id {
            Some(id) => {
                let source = self.store.get_source(id).await?.with_context(|| format!("source {id} not found"))?;
                Ok(self.ingestor.fetch_source(&source, cancel).await?.inserted)
            }
            None => Ok(self.ingestor.fetch_all_enabled(cancel).await?.totals.inserted),
        }
    }

    pub fn processor(&self) -> Processor {
        Processor::new(self.store.clone(), self.gateway.clone()).with_width(self.config.concurrency)
    }

    /// Start a background drain. Returns false when one is already running.
    pub fn run_processing(&self, batch_size: i64) -> bool {
        let processor = self.processor();
        self.jobs.start("process", move |cancel| async move {
            let log = telemetry::process();
            match processor.drain(&cancel, batch_size).await {
                Ok(_) => {}
                Err(DrainError::Cancelled(r)) => log.warn(format!("⏹️ Background processing stopped after {} article(s)", r.completed())),
                Err(e) => log.error(format!("❌ Background processing failed: {e}")),
            }
        })
    }

    pub async fn model_list(&self) -> Result<Vec<String>, GatewayError> {
        self.gateway.list_models().await
    }

    pub async fn test_model_connection(&self) -> Result<String, GatewayError> {
        self.gateway.test_connection().await
    }

    pub async fn status(&self) -> Result<StatusSnapshot> {
        let mut snap = summary::snapshot(self.store.as_ref()).await?;
        snap.processing = self.jobs.is_running();
        Ok(snap)
    }
}
