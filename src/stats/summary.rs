use anyhow::Result;

use crate::store::{ArticleStatus, ContentStore};

use super::types::{ArticleCounts, SourceCounts, StatusSnapshot};

pub async fn snapshot(store: &dyn ContentStore) -> Result<StatusSnapshot> {
    let articles = ArticleCounts {
        total: store.count_articles(None).await?,
        pending: store.count_articles(Some(ArticleStatus::Pending)).await?,
        processed: store.count_articles(Some(ArticleStatus::Processed)).await?,
        filtered: store.count_articles(Some(ArticleStatus::Filtered)).await?,
    };
    let sources = SourceCounts {
        total: store.count_sources(None).await?,
        enabled: store.count_sources(Some(true)).await?,
    };
    Ok(StatusSnapshot { articles, sources, last_ingested_at: store.last_ingested_at().await?, processing: false })
}
