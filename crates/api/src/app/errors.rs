use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use curator_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        ServiceError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        ServiceError::DuplicateName(msg) => json_error(
            StatusCode::CONFLICT,
            "duplicate_name",
            format!("location name must be unique: {msg}"),
        ),
        ServiceError::DuplicatePosition(msg) => json_error(
            StatusCode::CONFLICT,
            "duplicate_position",
            format!("duplicate position, retry: {msg}"),
        ),
        ServiceError::BatchCreateFailed(msg) => {
            tracing::error!("batch create failed: {msg}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "batch_create_failed", msg)
        }
        ServiceError::Persistence(msg) => {
            tracing::error!("persistence error: {msg}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "persistence_error", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path/body identifier, mapping failure to a 400.
pub fn parse_id<T: core::str::FromStr>(raw: &str, what: &str) -> Result<T, axum::response::Response> {
    raw.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id")))
}
