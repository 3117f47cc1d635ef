use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Error};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle of an article. Pending is the only non-terminal state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Pending,
    Processed,
    Filtered,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Pending => "pending",
            ArticleStatus::Processed => "processed",
            ArticleStatus::Filtered => "filtered",
        }
    }

    pub fn is_terminal(&self) -> bool { !matches!(self, ArticleStatus::Pending) }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ArticleStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ArticleStatus::Pending),
            "processed" => Ok(ArticleStatus::Processed),
            "filtered" => Ok(ArticleStatus::Filtered),
            other => bail!("unknown article status: {other}"),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Source {
    pub source_id: i64,
    pub url: String,
    pub name: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewSource {
    pub url: String,
    pub name: Option<String>,
    pub enabled: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct Article {
    pub article_id: i64,
    pub source_id: i64,
    pub title: String,
    pub link: String,
    pub content: String,
    pub pub_date: DateTime<Utc>,
    pub status: ArticleStatus,
    pub summary: String,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Article {
    /// Move the article into a terminal state. `processed_at` is only ever set once.
    pub fn settle(&mut self, status: ArticleStatus, summary: String, at: DateTime<Utc>) {
        debug_assert!(status.is_terminal(), "settle() requires a terminal status");
        self.status = status;
        self.summary = summary;
        if self.processed_at.is_none() {
            self.processed_at = Some(at);
        }
    }

    /// Text handed to the model for both stages.
    pub fn model_input(&self) -> String { format!("{}\n\n{}", self.title, self.content) }
}

#[derive(Clone, Debug)]
pub struct NewArticle {
    pub source_id: i64,
    pub title: String,
    pub link: String,
    pub content: String,
    pub pub_date: DateTime<Utc>,
}

/// Page over articles, newest publication first.
#[derive(Clone, Debug)]
pub struct ArticleQuery {
    pub status: Option<ArticleStatus>,
    pub offset: i64,
    pub limit: i64,
}

impl ArticleQuery {
    pub fn pending(limit: i64) -> Self { Self { status: Some(ArticleStatus::Pending), offset: 0, limit } }
}
