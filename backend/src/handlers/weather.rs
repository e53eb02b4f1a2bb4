use std::sync::Arc;

use crate::{
    models::{
        error::ApiError,
        weather::{district_coordinates, district_names, ForecastResponse, WeatherData, WeatherQuery},
    },
    utils::state::AppState,
};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::json;
use tracing::error;

pub async fn get_weather(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WeatherQuery>,
) -> Result<Response, ApiError> {
    let Some(location) = params.location.filter(|l| !l.is_empty()) else {
        return Err((StatusCode::BAD_REQUEST, "Location parameter required").into());
    };

    let Some(coords) = district_coordinates(&location) else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "District not found",
                "message": format!(
                    "Location \"{}\" not found. Please use a valid Jharkhand district name.",
                    location
                ),
                "availableDistricts": district_names(),
            })),
        )
            .into_response());
    };

    let res = state
        .http_client
        .get(format!("{}/forecast", state.config.weather_base_url))
        .query(&[
            ("latitude", coords.lat.to_string()),
            ("longitude", coords.lon.to_string()),
            (
                "current",
                "temperature_2m,relative_humidity_2m,weather_code,wind_speed_10m".to_string(),
            ),
            ("timezone", "Asia/Kolkata".to_string()),
        ])
        .timeout(state.config.http_timeout)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(upstream_failure)?;

    let forecast: ForecastResponse = res.json().await.map_err(upstream_failure)?;
    let weather = WeatherData::from(forecast.current);

    Ok((StatusCode::OK, Json(weather)).into_response())
}

fn upstream_failure(e: reqwest::Error) -> ApiError {
    error!("weather fetch failed: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch weather data").into()
}
