use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;
use serde_json::Value;

#[derive(Debug)]
pub struct ApiError {
    pub code: StatusCode,
    pub body: Json<Value>,
}

impl ApiError {
    pub fn new(code: StatusCode, message: &str) -> Self {
        Self {
            code,
            body: Json(json!({ "error": message })),
        }
    }

    /// Error with a machine-readable `code` next to the human message.
    pub fn coded(code: StatusCode, message: &str, error_code: &str) -> Self {
        Self {
            code,
            body: Json(json!({ "error": message, "code": error_code })),
        }
    }

    pub fn with_details(code: StatusCode, message: &str, details: &str) -> Self {
        Self {
            code,
            body: Json(json!({ "error": message, "details": details })),
        }
    }

    pub fn unauthorized() -> Self {
        Self::coded(
            StatusCode::UNAUTHORIZED,
            "Authentication required",
            "UNAUTHORIZED",
        )
    }

    pub fn user_not_found() -> Self {
        Self::coded(StatusCode::NOT_FOUND, "User not found", "USER_NOT_FOUND")
    }

    pub fn internal(message: &str) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Internal server error: {}", message),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code, self.body).into_response()
    }
}

impl From<(StatusCode, &str)> for ApiError {
    fn from((code, msg): (StatusCode, &str)) -> Self {
        Self::new(code, msg)
    }
}
