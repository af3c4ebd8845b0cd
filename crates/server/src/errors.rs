use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use service::errors::StoreError;

/// Handler-level error surfaced to clients.
///
/// Every storage failure collapses to 422 with a JSON array holding the
/// error's textual description; clients get no structured kinds and no
/// retry hints. The error is also logged server-side.
#[derive(Debug)]
pub struct ApiError(pub String);

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let msg = self.0;
        error!(error = %msg, "request failed");
        let status = StatusCode::UNPROCESSABLE_ENTITY;
        (status, Json(serde_json::json!([msg]))).into_response()
    }
}
