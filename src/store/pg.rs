use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};

use super::types::*;
use super::ContentStore;

const ARTICLE_COLS: &str = "article_id, source_id, title, link, content, pub_date, status, summary, processed_at, created_at";
const SOURCE_COLS: &str = "source_id, url, name, enabled, created_at";

#[derive(FromRow)]
struct SourceRow {
    source_id: i64,
    url: String,
    name: Option<String>,
    enabled: bool,
    created_at: DateTime<Utc>,
}

impl From<SourceRow> for Source {
    fn from(r: SourceRow) -> Self {
        Source { source_id: r.source_id, url: r.url, name: r.name, enabled: r.enabled, created_at: r.created_at }
    }
}

#[derive(FromRow)]
struct ArticleRow {
    article_id: i64,
    source_id: i64,
    title: String,
    link: String,
    content: String,
    pub_date: DateTime<Utc>,
    status: String,
    summary: String,
    processed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ArticleRow> for Article {
    type Error = anyhow::Error;

    fn try_from(r: ArticleRow) -> Result<Self> {
        Ok(Article {
            article_id: r.article_id,
            source_id: r.source_id,
            title: r.title,
            link: r.link,
            content: r.content,
            pub_date: r.pub_date,
            status: r.status.parse()?,
            summary: r.summary,
            processed_at: r.processed_at,
            created_at: r.created_at,
        })
    }
}

/// PostgreSQL-backed store (schema `digest`).
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(dsn)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    /// Apply any pending migrations (idempotent)
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ContentStore for PgStore {
    async fn add_source(&self, new: &NewSource) -> Result<(Source, bool)> {
        #[derive(FromRow)]
        struct Upserted {
            #[sqlx(flatten)]
            source: SourceRow,
            inserted: bool,
        }
        let sql = format!(
            r#"
            INSERT INTO digest.source (url, name, enabled)
            VALUES ($1, $2, $3)
            ON CONFLICT (url)
            DO UPDATE SET name = EXCLUDED.name, enabled = EXCLUDED.enabled
            RETURNING {SOURCE_COLS}, (xmax = 0) AS inserted
            "#
        );
        let rec = sqlx::query_as::<_, Upserted>(&sql)
            .bind(&new.url)
            .bind(new.name.as_deref())
            .bind(new.enabled)
            .fetch_one(&self.pool)
            .await?;
        Ok((rec.source.into(), rec.inserted))
    }

    async fn get_source(&self, source_id: i64) -> Result<Option<Source>> {
        let sql = format!("SELECT {SOURCE_COLS} FROM digest.source WHERE source_id = $1");
        let row = sqlx::query_as::<_, SourceRow>(&sql)
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Source::from))
    }

    async fn list_sources(&self, enabled: Option<bool>) -> Result<Vec<Source>> {
        let sql = format!(
            "SELECT {SOURCE_COLS} FROM digest.source WHERE ($1::bool IS NULL OR enabled = $1) ORDER BY source_id"
        );
        let rows = sqlx::query_as::<_, SourceRow>(&sql)
            .bind(enabled)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Source::from).collect())
    }

    async fn count_sources(&self, enabled: Option<bool>) -> Result<i64> {
        let n: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)::bigint FROM digest.source WHERE ($1::bool IS NULL OR enabled = $1)",
        )
        .bind(enabled)
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    async fn delete_source(&self, source_id: i64) -> Result<bool> {
        let res = sqlx::query("DELETE FROM digest.source WHERE source_id = $1")
            .bind(source_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn find_or_create_article(&self, new: &NewArticle) -> Result<(Article, bool)> {
        // ON CONFLICT DO NOTHING returns no row when another writer owns the link;
        // the follow-up select then sees the committed winner.
        let insert = format!(
            r#"
            INSERT INTO digest.article (source_id, title, link, content, pub_date)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (link) DO NOTHING
            RETURNING {ARTICLE_COLS}
            "#
        );
        let created = sqlx::query_as::<_, ArticleRow>(&insert)
            .bind(new.source_id)
            .bind(&new.title)
            .bind(&new.link)
            .bind(&new.content)
            .bind(new.pub_date)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(row) = created {
            return Ok((row.try_into()?, true));
        }

        let select = format!("SELECT {ARTICLE_COLS} FROM digest.article WHERE link = $1");
        let existing = sqlx::query_as::<_, ArticleRow>(&select)
            .bind(&new.link)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("lookup existing article {}", new.link))?;
        Ok((existing.try_into()?, false))
    }

    async fn query_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>> {
        let sql = format!(
            r#"
            SELECT {ARTICLE_COLS}
            FROM digest.article
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY pub_date DESC, article_id DESC
            OFFSET $2
            LIMIT $3
            "#
        );
        let rows = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(query.status.map(|s| s.as_str()))
            .bind(query.offset.max(0))
            .bind(query.limit.max(0))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Article::try_from).collect()
    }

    async fn count_articles(&self, status: Option<ArticleStatus>) -> Result<i64> {
        let n: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)::bigint FROM digest.article WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    async fn save_article(&self, article: &Article) -> Result<()> {
        let res = sqlx::query(
            r#"
            UPDATE digest.article
               SET title = $2,
                   content = $3,
                   pub_date = $4,
                   status = $5,
                   summary = $6,
                   processed_at = $7
             WHERE article_id = $1
               AND status = 'pending'
            "#,
        )
        .bind(article.article_id)
        .bind(&article.title)
        .bind(&article.content)
        .bind(article.pub_date)
        .bind(article.status.as_str())
        .bind(&article.summary)
        .bind(article.processed_at)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() != 1 {
            bail!("article {} not found or already terminal", article.article_id);
        }
        Ok(())
    }

    async fn delete_article(&self, article_id: i64) -> Result<bool> {
        let res = sqlx::query("DELETE FROM digest.article WHERE article_id = $1")
            .bind(article_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn last_ingested_at(&self) -> Result<Option<DateTime<Utc>>> {
        let last: Option<DateTime<Utc>> = sqlx::query_scalar("SELECT MAX(created_at) FROM digest.article")
            .fetch_one(&self.pool)
            .await?;
        Ok(last)
    }

    async fn settings(&self) -> Result<HashMap<String, String>> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM digest.setting")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }

    async fn put_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO digest.setting (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE
              SET value = EXCLUDED.value,
                  updated_at = now()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn put_setting_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        let res = sqlx::query("INSERT INTO digest.setting (key, value) VALUES ($1, $2) ON CONFLICT (key) DO NOTHING")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() == 1)
    }
}
