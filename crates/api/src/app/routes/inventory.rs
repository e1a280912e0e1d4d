use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use curator_core::ItemId;

use crate::app::services::AppServices;
use crate::app::{dto, errors, report};

pub fn router() -> Router {
    Router::new()
        .route("/items", get(list_items).post(create_items_batch))
        .route("/items/:id", get(get_item).patch(update_item).delete(delete_item))
        .route("/export", get(export_inventory))
        .route("/export.xlsx", get(export_inventory_xlsx))
}

pub async fn list_items(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.inventory().list_inventory_items().await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_items_batch(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateItemsBatchRequest>,
) -> axum::response::Response {
    let request = match body.into_batch() {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match services.inventory().create_inventory_items_batch(&request).await {
        Ok(items) => (StatusCode::CREATED, Json(items)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inventory().get_inventory_item(id).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateInventoryItemRequest>,
) -> axum::response::Response {
    let id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let patch = match body.into_patch() {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.inventory().update_inventory_item(id, &patch).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inventory().delete_inventory_item(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn export_inventory(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.inventory().export_inventory().await {
        Ok(rows) => (StatusCode::OK, Json(dto::export_to_json(rows))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn export_inventory_xlsx(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let rows = match services.inventory().export_inventory().await {
        Ok(rows) => rows,
        Err(e) => return errors::service_error_to_response(e),
    };

    match report::render_xlsx(&rows) {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, report::XLSX_CONTENT_TYPE),
                (header::CONTENT_DISPOSITION, report::XLSX_CONTENT_DISPOSITION),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("xlsx export failed: {e}");
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "export_failed", e.to_string())
        }
    }
}
