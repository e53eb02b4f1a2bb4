use std::sync::Arc;

use axum::{middleware::from_fn_with_state, routing::get, Router};

use crate::handlers::middleware::auth_middleware;
use crate::handlers::users::{get_profile, update_location, update_profile};
use crate::utils::state::AppState;

pub fn profile_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/profile",
            get(get_profile).patch(update_location).put(update_profile),
        )
        .route_layer(from_fn_with_state(state, auth_middleware))
}
