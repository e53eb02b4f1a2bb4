use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    pub url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub image: String,
    pub published_at: String,
    pub source: ArticleSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSource {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
}

/// GNews sends `null` for articles without an image or description.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse {
    #[serde(default)]
    pub articles: Vec<NewsArticle>,
    #[serde(default)]
    pub total_articles: u64,
}

/// Query string accepted by `GET /api/news/agriculture`.
#[derive(Debug, Default, Deserialize)]
pub struct NewsParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub region: Option<String>,
    pub limit: Option<String>,
    pub lang: Option<String>,
}

/// What a news feed asks for, and how often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsQuery {
    pub query: String,
    pub category: String,
    pub region: String,
    pub limit: u32,
    pub poll_interval: Duration,
}

impl Default for NewsQuery {
    fn default() -> Self {
        Self {
            query: "agriculture farming government schemes".to_string(),
            category: "agriculture".to_string(),
            region: "jharkhand".to_string(),
            limit: 10,
            poll_interval: Duration::ZERO,
        }
    }
}

impl NewsQuery {
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("q", self.query.clone()),
            ("category", self.category.clone()),
            ("region", self.region.clone()),
            ("limit", self.limit.to_string()),
            ("lang", "en".to_string()),
        ]
    }
}
