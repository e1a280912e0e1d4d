use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use curator_core::LocationId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_locations).post(create_location))
        .route(
            "/:id",
            get(get_location).patch(update_location).delete(delete_location),
        )
}

pub async fn list_locations(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.inventory().list_locations().await {
        Ok(locations) => (StatusCode::OK, Json(locations)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_location(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateLocationRequest>,
) -> axum::response::Response {
    match services.inventory().create_location(body.into()).await {
        Ok(location) => (StatusCode::CREATED, Json(location)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_location(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: LocationId = match errors::parse_id(&id, "location") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inventory().get_location(id).await {
        Ok(location) => (StatusCode::OK, Json(location)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_location(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateLocationRequest>,
) -> axum::response::Response {
    let id: LocationId = match errors::parse_id(&id, "location") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inventory().update_location(id, &body.name).await {
        Ok(location) => (StatusCode::OK, Json(location)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_location(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: LocationId = match errors::parse_id(&id, "location") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inventory().delete_location(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
