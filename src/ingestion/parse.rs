use anyhow::{anyhow, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rss::{Channel, Item};

use crate::store::NewArticle;

/// One feed entry, independent of the syndication format it came from.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub title: String,
    pub link: Option<String>,
    pub content: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// RSS first; Atom and JSON Feed go through feed-rs when the rss reader rejects the document.
pub fn parse_items(xml: &Bytes) -> Result<Vec<FeedItem>> {
    match Channel::read_from(&xml[..]) {
        Ok(channel) => Ok(channel.items().iter().map(from_rss_item).collect()),
        Err(rss_err) => {
            let feed = feed_rs::parser::parse(&xml[..])
                .map_err(|e| anyhow!("parsing feed: {e} (as rss: {rss_err})"))?;
            Ok(feed.entries.into_iter().map(from_entry).collect())
        }
    }
}

pub fn extract_published_at(item: &Item) -> Option<DateTime<Utc>> {
    if let Some(pub_date) = item.pub_date() {
        if let Ok(dt) = DateTime::parse_from_rfc2822(pub_date.trim()) { return Some(dt.with_timezone(&Utc)); }
    }
    // Dublin Core date (RFC3339)
    if let Some(dc) = item.dublin_core_ext() {
        if let Some(first) = dc.dates().first() {
            if let Ok(dt) = DateTime::parse_from_rfc3339(first.trim()) { return Some(dt.with_timezone(&Utc)); }
        }
    }
    None
}

fn from_rss_item(item: &Item) -> FeedItem {
    let content = item
        .description()
        .filter(|d| !d.trim().is_empty())
        .or_else(|| item.content())
        .unwrap_or_default();
    FeedItem {
        title: item.title().unwrap_or_default().trim().to_string(),
        link: item.link().map(str::to_string),
        content: content.to_string(),
        published_at: extract_published_at(item),
    }
}

fn from_entry(entry: feed_rs::model::Entry) -> FeedItem {
    let content = entry
        .summary
        .map(|s| s.content)
        .filter(|s| !s.trim().is_empty())
        .or_else(|| entry.content.and_then(|c| c.body))
        .unwrap_or_default();
    FeedItem {
        title: entry.title.map(|t| t.content.trim().to_string()).unwrap_or_default(),
        link: entry.links.into_iter().next().map(|l| l.href),
        content,
        published_at: entry.published.or(entry.updated),
    }
}

/// Map a feed item onto a new article. Items without a link have no identity and yield `None`.
pub fn to_new_article(source_id: i64, item: &FeedItem, fetched_at: DateTime<Utc>) -> Option<NewArticle> {
    let link = item.link.as_deref().map(str::trim).filter(|l| !l.is_empty())?;
    Some(NewArticle {
        source_id,
        title: item.title.clone(),
        link: link.to_string(),
        content: item.content.clone(),
        pub_date: item.published_at.unwrap_or(fetched_at),
    })
}
