use std::sync::Arc;

use crate::{
    models::{
        error::ApiError,
        news::{NewsParams, NewsResponse},
    },
    utils::state::AppState,
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use http::{header, StatusCode};
use serde_json::Value;
use tracing::{debug, error};

const SEARCH_QUERY: &str = "agriculture india OR farming india OR kisan india OR crop india";
const MAX_ARTICLES: u32 = 100;

pub async fn get_agriculture_news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NewsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let api_key = state.config.gnews_api_key.as_deref().ok_or_else(|| {
        ApiError::with_details(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Missing API key",
            "GNEWS_API_KEY not configured",
        )
    })?;

    let limit = params
        .limit
        .as_deref()
        .and_then(|l| l.parse::<u32>().ok())
        .unwrap_or(10)
        .min(MAX_ARTICLES);
    let lang = params.lang.unwrap_or_else(|| "en".to_string());
    let max = limit.to_string();
    debug!(
        q = params.q.as_deref().unwrap_or("agriculture india farming"),
        region = params.region.as_deref().unwrap_or_default(),
        category = params.category.as_deref().unwrap_or_default(),
        limit,
        "news request"
    );

    let res = state
        .http_client
        .get(format!("{}/search", state.config.gnews_base_url))
        .query(&[
            ("q", SEARCH_QUERY),
            ("country", "in"),
            ("lang", lang.as_str()),
            ("max", max.as_str()),
            ("apikey", api_key),
        ])
        .timeout(state.config.http_timeout)
        .send()
        .await
        .map_err(upstream_failure)?;

    let status = res.status();
    if !status.is_success() {
        let body: Value = res.json().await.unwrap_or(Value::Null);
        let details = body["message"].as_str().unwrap_or("Unknown error");
        error!("GNews returned {}: {}", status, details);
        return Err(ApiError::with_details(
            status,
            &format!("GNews API Error: {}", status.as_u16()),
            details,
        ));
    }

    let news: NewsResponse = res.json().await.map_err(upstream_failure)?;

    Ok((
        StatusCode::OK,
        [(
            header::CACHE_CONTROL,
            "public, s-maxage=3600, stale-while-revalidate=86400",
        )],
        Json(news),
    ))
}

fn upstream_failure(e: reqwest::Error) -> ApiError {
    error!("news fetch failed: {}", e);
    ApiError::with_details(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to fetch news",
        &e.to_string(),
    )
}
