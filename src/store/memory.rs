use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::*;
use super::ContentStore;

#[derive(Default)]
struct Tables {
    sources: Vec<Source>,
    articles: Vec<Article>,
    settings: HashMap<String, String>,
    next_source_id: i64,
    next_article_id: i64,
    rejected_links: Vec<String>,
}

/// In-process store used by tests. One lock guards all tables, which keeps
/// find-or-create atomic the same way the unique index does in Postgres.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn with_settings<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut t = store.tables.lock().unwrap();
            for (k, v) in pairs { t.settings.insert(k.to_string(), v.to_string()); }
        }
        store
    }

    pub fn articles(&self) -> Vec<Article> { self.tables.lock().unwrap().articles.clone() }

    /// Make writes of this link fail, as a constraint violation would.
    pub fn reject_link(&self, link: &str) { self.tables.lock().unwrap().rejected_links.push(link.to_string()); }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn add_source(&self, new: &NewSource) -> Result<(Source, bool)> {
        let mut t = self.tables.lock().unwrap();
        if let Some(existing) = t.sources.iter_mut().find(|s| s.url == new.url) {
            existing.name = new.name.clone();
            existing.enabled = new.enabled;
            return Ok((existing.clone(), false));
        }
        t.next_source_id += 1;
        let source = Source {
            source_id: t.next_source_id,
            url: new.url.clone(),
            name: new.name.clone(),
            enabled: new.enabled,
            created_at: Utc::now(),
        };
        t.sources.push(source.clone());
        Ok((source, true))
    }

    async fn get_source(&self, source_id: i64) -> Result<Option<Source>> {
        Ok(self.tables.lock().unwrap().sources.iter().find(|s| s.source_id == source_id).cloned())
    }

    async fn list_sources(&self, enabled: Option<bool>) -> Result<Vec<Source>> {
        let t = self.tables.lock().unwrap();
        Ok(t.sources.iter().filter(|s| enabled.is_none_or(|e| s.enabled == e)).cloned().collect())
    }

    async fn count_sources(&self, enabled: Option<bool>) -> Result<i64> {
        Ok(self.list_sources(enabled).await?.len() as i64)
    }

    async fn delete_source(&self, source_id: i64) -> Result<bool> {
        let mut t = self.tables.lock().unwrap();
        let before = t.sources.len();
        t.sources.retain(|s| s.source_id != source_id);
        Ok(t.sources.len() != before)
    }

    async fn find_or_create_article(&self, new: &NewArticle) -> Result<(Article, bool)> {
        let mut t = self.tables.lock().unwrap();
        if t.rejected_links.contains(&new.link) {
            bail!("insert article {}: rejected", new.link);
        }
        if let Some(existing) = t.articles.iter().find(|a| a.link == new.link) {
            return Ok((existing.clone(), false));
        }
        t.next_article_id += 1;
        let article = Article {
            article_id: t.next_article_id,
            source_id: new.source_id,
            title: new.title.clone(),
            link: new.link.clone(),
            content: new.content.clone(),
            pub_date: new.pub_date,
            status: ArticleStatus::Pending,
            summary: String::new(),
            processed_at: None,
            created_at: Utc::now(),
        };
        t.articles.push(article.clone());
        Ok((article, true))
    }

    async fn query_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<Article> = t
            .articles
            .iter()
            .filter(|a| query.status.is_none_or(|s| a.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.article_id.cmp(&a.article_id)));
        Ok(rows
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect())
    }

    async fn count_articles(&self, status: Option<ArticleStatus>) -> Result<i64> {
        let t = self.tables.lock().unwrap();
        Ok(t.articles.iter().filter(|a| status.is_none_or(|s| a.status == s)).count() as i64)
    }

    async fn save_article(&self, article: &Article) -> Result<()> {
        let mut t = self.tables.lock().unwrap();
        let Some(slot) = t.articles.iter_mut().find(|a| a.article_id == article.article_id) else {
            bail!("article {} not found or already terminal", article.article_id);
        };
        if slot.status.is_terminal() {
            bail!("article {} not found or already terminal", article.article_id);
        }
        *slot = article.clone();
        Ok(())
    }

    async fn delete_article(&self, article_id: i64) -> Result<bool> {
        let mut t = self.tables.lock().unwrap();
        let before = t.articles.len();
        t.articles.retain(|a| a.article_id != article_id);
        Ok(t.articles.len() != before)
    }

    async fn last_ingested_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.tables.lock().unwrap().articles.iter().map(|a| a.created_at).max())
    }

    async fn settings(&self) -> Result<HashMap<String, String>> {
        Ok(self.tables.lock().unwrap().settings.clone())
    }

    async fn put_setting(&self, key: &str, value: &str) -> Result<()> {
        self.tables.lock().unwrap().settings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn put_setting_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        let mut t = self.tables.lock().unwrap();
        if t.settings.contains_key(key) {
            return Ok(false);
        }
        t.settings.insert(key.to_string(), value.to_string());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_article(link: &str) -> NewArticle {
        NewArticle { source_id: 1, title: "t".into(), link: link.into(), content: "c".into(), pub_date: Utc::now() }
    }

    #[tokio::test]
    async fn find_or_create_is_idempotent_on_link() {
        let store = MemoryStore::new();
        let (a, created) = store.find_or_create_article(&new_article("https://x/1")).await.unwrap();
        let (b, created_again) = store.find_or_create_article(&new_article("https://x/1")).await.unwrap();
        assert!(created);
        assert!(!created_again);
        assert_eq!(a.article_id, b.article_id);
        assert_eq!(store.count_articles(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn save_refuses_to_reopen_terminal_article() {
        let store = MemoryStore::new();
        let (mut a, _) = store.find_or_create_article(&new_article("https://x/2")).await.unwrap();
        a.settle(ArticleStatus::Processed, "sum".into(), Utc::now());
        store.save_article(&a).await.unwrap();

        a.status = ArticleStatus::Pending;
        a.processed_at = None;
        assert!(store.save_article(&a).await.is_err());
        assert_eq!(store.count_articles(Some(ArticleStatus::Processed)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn second_terminal_save_is_rejected() {
        let store = MemoryStore::new();
        let (a, _) = store.find_or_create_article(&new_article("https://x/3")).await.unwrap();

        let mut processed = a.clone();
        processed.settle(ArticleStatus::Processed, "kept".into(), Utc::now());
        store.save_article(&processed).await.unwrap();

        let mut filtered = a;
        filtered.settle(ArticleStatus::Filtered, "rejected".into(), Utc::now());
        assert!(store.save_article(&filtered).await.is_err());

        let rows = store.articles();
        assert_eq!(rows[0].status, ArticleStatus::Processed);
        assert_eq!(rows[0].summary, "kept");
    }
}
