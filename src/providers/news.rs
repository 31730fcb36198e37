use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::service::NewsConfig;
use crate::helpers::time::{parse_feed_date, serialize_iso_millis, utc_from_millis, Clock};
use crate::providers::error::ServiceError;
use crate::providers::http::{UpstreamClient, UpstreamRequest};
use crate::providers::rss::{clean_text, parse_rss, RssItem};
use crate::resilience::error::UpstreamFetchError;
use crate::resilience::fan_out::{FanOutAggregator, FetchTask};
use crate::utils::constants::{AGGREGATION_NEWS, DESCRIPTION_FALLBACK_CHARS, PROVIDER_NEWS};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub title: String,
    pub description: String,
    pub source: String,
    pub url: String,
    #[serde(serialize_with = "serialize_iso_millis")]
    pub published_at: DateTime<Utc>,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsHeadlines {
    pub articles: Vec<NewsArticle>,
    /// merged article count before the cap
    pub total_results: usize,
    pub category: String,
    /// feeds that failed while others succeeded, sorted
    #[serde(skip)]
    pub unavailable_sources: Vec<String>,
}

/// Headlines merged from every feed of one category.
pub struct NewsService {
    client: UpstreamClient,
    config: NewsConfig,
    clock: Arc<dyn Clock>,
}

impl NewsService {
    pub fn new(client: UpstreamClient, config: NewsConfig, clock: Arc<dyn Clock>) -> Self {
        Self { client, config, clock }
    }

    pub fn supported_categories(&self) -> Vec<String> {
        self.config.categories.keys().cloned().collect()
    }

    /// One fetch task per configured source. A feed that fails or does not
    /// parse only drops its own articles; the call fails when every feed did.
    pub async fn get_headlines(&self, category: &str) -> Result<NewsHeadlines, ServiceError> {
        let key = category.trim().to_lowercase();
        let feeds = self.config.categories.get(&key).ok_or_else(|| {
            ServiceError::invalid_input(format!(
                "category \"{}\" is not supported, supported categories: {}",
                category,
                self.supported_categories().join(", ")
            ))
        })?;

        let tasks = feeds
            .iter()
            .map(|(source, url)| FetchTask::new(source.clone(), self.fetch_feed(source, url, &key)))
            .collect();

        let result = FanOutAggregator::new(AGGREGATION_NEWS)
            .with_max_items(self.config.max_articles)
            .run(tasks, |a: &NewsArticle, b: &NewsArticle| b.published_at.cmp(&a.published_at))
            .await?;
        info!(
            category = %key,
            articles = result.items.len(),
            total = result.total_items,
            failed_sources = result.failures.len(),
            "headlines aggregated"
        );

        Ok(NewsHeadlines {
            articles: result.items,
            total_results: result.total_items,
            category: key,
            unavailable_sources: result.failures.into_iter().map(|failure| failure.id).collect(),
        })
    }

    async fn fetch_feed(&self, source: &str, url: &str, category: &str) -> Result<Vec<NewsArticle>, UpstreamFetchError> {
        let body = self.client.get_text(UpstreamRequest::new(PROVIDER_NEWS, url)?).await?;
        let items = parse_rss(&body)?;
        let now = utc_from_millis(self.clock.now_millis());

        let total = items.len();
        let articles: Vec<NewsArticle> = items
            .into_iter()
            .filter_map(|item| to_article(item, source, category, now))
            .collect();
        debug!(source = source, items = total, kept = articles.len(), "feed parsed");

        Ok(articles)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Items without a title or link are dropped.
fn to_article(item: RssItem, source: &str, category: &str, now: DateTime<Utc>) -> Option<NewsArticle> {
    let title = non_blank(item.title)?;
    let link = non_blank(item.link)?;
    let description = non_blank(item.description)
        .or_else(|| non_blank(item.content_encoded))
        .unwrap_or_else(|| title.chars().take(DESCRIPTION_FALLBACK_CHARS).collect());
    let published_at = item
        .pub_date
        .as_deref()
        .and_then(parse_feed_date)
        .unwrap_or(now);

    Some(NewsArticle {
        title: clean_text(&title),
        description: clean_text(&description),
        source: source.to_owned(),
        url: link.trim().to_owned(),
        published_at,
        category: category.to_owned(),
    })
}
