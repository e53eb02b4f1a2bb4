use std::sync::Arc;

use crate::{
    models::{
        error::ApiError,
        jwt::Claims,
        user::{location_from_body, ProfileUpdate},
    },
    utils::state::AppState,
};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::Value;
use tracing::info;

fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|_| {
        ApiError::coded(
            StatusCode::BAD_REQUEST,
            "Request body must be valid JSON",
            "INVALID_BODY",
        )
    })
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .profiles
        .fetch(&claims.sub)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    Ok((StatusCode::OK, Json(profile)))
}

pub async fn update_location(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let location = location_from_body(&parse_body(&body)?)?;

    let profile = state
        .profiles
        .update_location(&claims.sub, &location)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    info!(user = %claims.sub, "location updated");
    Ok((StatusCode::OK, Json(profile)))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let update = ProfileUpdate::from_body(&parse_body(&body)?)?;

    let profile = state
        .profiles
        .update_fields(&claims.sub, &update)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    info!(user = %claims.sub, "profile updated");
    Ok((StatusCode::OK, Json(profile)))
}
