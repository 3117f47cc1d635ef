use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod pg;
pub mod types;
#[cfg(test)]
pub mod memory;

pub use types::{Article, ArticleQuery, ArticleStatus, NewArticle, NewSource, Source};

/// Durable storage for sources, articles and provider settings.
///
/// Every operation is atomic at single-row granularity. `find_or_create_article` must stay
/// atomic with respect to the unique link so concurrent ingestion never yields two rows.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Insert or update a source keyed by URL. Returns the row and whether it was created.
    async fn add_source(&self, new: &NewSource) -> Result<(Source, bool)>;
    async fn get_source(&self, source_id: i64) -> Result<Option<Source>>;
    async fn list_sources(&self, enabled: Option<bool>) -> Result<Vec<Source>>;
    async fn count_sources(&self, enabled: Option<bool>) -> Result<i64>;
    async fn delete_source(&self, source_id: i64) -> Result<bool>;

    /// Insert when the link is unseen, otherwise return the stored row untouched.
    async fn find_or_create_article(&self, new: &NewArticle) -> Result<(Article, bool)>;
    async fn query_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>>;
    async fn count_articles(&self, status: Option<ArticleStatus>) -> Result<i64>;
    /// Write back an existing article by id. Only pending rows are writable; a terminal row is final.
    async fn save_article(&self, article: &Article) -> Result<()>;
    async fn delete_article(&self, article_id: i64) -> Result<bool>;
    async fn last_ingested_at(&self) -> Result<Option<DateTime<Utc>>>;

    async fn settings(&self) -> Result<HashMap<String, String>>;
    async fn put_setting(&self, key: &str, value: &str) -> Result<()>;
    async fn put_setting_if_absent(&self, key: &str, value: &str) -> Result<bool>;
}
