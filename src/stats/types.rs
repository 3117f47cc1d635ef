use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::{Article, ArticleStatus};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ArticleCounts { pub total: i64, pub pending: i64, pub processed: i64, pub filtered: i64 }

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SourceCounts { pub total: i64, pub enabled: i64 }

/// Store-only view of pipeline progress.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StatusSnapshot {
    pub articles: ArticleCounts,
    pub sources: SourceCounts,
    pub last_ingested_at: Option<DateTime<Utc>>,
    pub processing: bool,
}

#[derive(Serialize)]
pub struct ArticleRow {
    pub article_id: i64,
    pub source_id: i64,
    pub status: ArticleStatus,
    pub title: String,
    pub link: String,
    pub pub_date: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub summary: String,
}

impl From<Article> for ArticleRow {
    fn from(a: Article) -> Self {
        Self {
            article_id: a.article_id,
            source_id: a.source_id,
            status: a.status,
            title: a.title,
            link: a.link,
            pub_date: a.pub_date,
            processed_at: a.processed_at,
            summary: a.summary,
        }
    }
}

#[derive(Serialize)]
pub struct ArticlePage { pub page: i64, pub page_size: i64, pub total: i64, pub articles: Vec<ArticleRow> }

#[derive(Serialize)]
pub struct ArticleRemoved { pub article_id: i64, pub removed: bool }
