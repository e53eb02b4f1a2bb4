use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use http::header;
use std::sync::Arc;

use crate::{
    models::error::ApiError,
    utils::{jwt_encode::jwt_decode, state::AppState},
};

/// Verifies the bearer session token and stores its claims in the request
/// extensions. Runs before any body parsing, so unauthenticated requests never
/// reach validation.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(ApiError::unauthorized)?;

    let claims = jwt_decode(token, &state.config.jwt_secret).map_err(|e| {
        tracing::debug!("token validation failed: {}", e);
        ApiError::unauthorized()
    })?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
