use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use curator_core::TemplateId;
use curator_inventory::{ItemTemplatePatch, NewItemTemplate};

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_templates).post(create_template))
        .route(
            "/:id",
            get(get_template).patch(update_template).delete(delete_template),
        )
}

pub async fn list_templates(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.inventory().list_item_templates().await {
        Ok(templates) => (StatusCode::OK, Json(templates)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_template(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewItemTemplate>,
) -> axum::response::Response {
    match services.inventory().create_item_template(body).await {
        Ok(template) => (StatusCode::CREATED, Json(template)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_template(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: TemplateId = match errors::parse_id(&id, "template") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inventory().get_item_template(id).await {
        Ok(template) => (StatusCode::OK, Json(template)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_template(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<ItemTemplatePatch>,
) -> axum::response::Response {
    let id: TemplateId = match errors::parse_id(&id, "template") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inventory().update_item_template(id, &body).await {
        Ok(template) => (StatusCode::OK, Json(template)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_template(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: TemplateId = match errors::parse_id(&id, "template") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inventory().delete_item_template(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
