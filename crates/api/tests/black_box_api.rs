use std::sync::Arc;

use curator_api::app::{build_app, AppServices};
use curator_infra::{RetryConfig, SqliteInventoryStore};
use reqwest::StatusCode;
use serde_json::{json, Value};

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, backed by a private in-memory database.
        let store = SqliteInventoryStore::in_memory()
            .await
            .expect("failed to open in-memory sqlite");
        let services = Arc::new(AppServices::new(Arc::new(store), RetryConfig::default()));
        let app = build_app(services);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn patch(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.patch(self.url(path)).json(&body).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn delete(&self, path: &str) -> StatusCode {
        self.client.delete(self.url(path)).send().await.unwrap().status()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn positions(items: &Value) -> Vec<i64> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["position"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn batch_lifecycle_numbers_items_and_never_reuses_positions() {
    let srv = TestServer::spawn().await;

    let (status, template) = srv
        .post("/templates", json!({"assetCode": "A1", "name": "Chair", "brand": "Thonet"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let template_id = template["id"].as_str().unwrap().to_string();

    let (status, location) = srv.post("/locations", json!({"name": "Warehouse"})).await;
    assert_eq!(status, StatusCode::CREATED);
    let location_id = location["id"].as_str().unwrap().to_string();

    let (status, created) = srv
        .post(
            "/inventory/items",
            json!({
                "templateId": template_id,
                "locationId": location_id,
                "quantities": {"Good": 2, "Regular": 1, "Bad": 0},
                "situation": "storage",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(positions(&created), vec![1, 2, 3]);
    let states: Vec<&str> = created
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["conservationState"].as_str().unwrap())
        .collect();
    assert_eq!(states, vec!["Good", "Good", "Regular"]);

    let second_id = created[1]["id"].as_str().unwrap().to_string();
    assert_eq!(
        srv.delete(&format!("/inventory/items/{second_id}")).await,
        StatusCode::NO_CONTENT
    );

    let (_, items) = srv.get("/inventory/items").await;
    assert_eq!(positions(&items), vec![1, 3]);

    let (status, next) = srv
        .post(
            "/inventory/items",
            json!({"templateId": template_id, "quantities": {"Good": 1}}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(positions(&next), vec![4]);
    assert!(next[0]["locationId"].is_null());
}

#[tokio::test]
async fn all_zero_batch_is_rejected_and_store_unchanged() {
    let srv = TestServer::spawn().await;
    let (_, template) = srv.post("/templates", json!({"assetCode": "A1", "name": "Chair"})).await;

    let (status, body) = srv
        .post(
            "/inventory/items",
            json!({
                "templateId": template["id"],
                "quantities": {"Good": 0, "Regular": 0, "Bad": 0},
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("at least one quantity must be positive"));

    let (_, items) = srv.get("/inventory/items").await;
    assert!(items.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn oversized_batch_is_rejected_and_store_unchanged() {
    let srv = TestServer::spawn().await;
    let (_, template) = srv.post("/templates", json!({"assetCode": "A1", "name": "Chair"})).await;

    let (status, body) = srv
        .post(
            "/inventory/items",
            json!({
                "templateId": template["id"],
                "quantities": {"Good": 4294967295u32, "Bad": 4294967295u32},
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].as_str().unwrap().contains("exceeds the limit"));

    let (_, items) = srv.get("/inventory/items").await;
    assert!(items.as_array().unwrap().is_empty());

    // The position sequence was never touched.
    let (status, created) = srv
        .post(
            "/inventory/items",
            json!({"templateId": template["id"], "quantities": {"Good": 1}}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(positions(&created), vec![1]);
}

#[tokio::test]
async fn duplicate_location_name_conflicts() {
    let srv = TestServer::spawn().await;
    let (status, _) = srv.post("/locations", json!({"name": "Warehouse"})).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = srv.post("/locations", json!({"name": "Warehouse"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "duplicate_name");

    let (_, locations) = srv.get("/locations").await;
    assert_eq!(locations.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_location_in_update_clears_it() {
    let srv = TestServer::spawn().await;
    let (_, template) = srv.post("/templates", json!({"assetCode": "A1", "name": "Chair"})).await;
    let (_, location) = srv.post("/locations", json!({"name": "Warehouse"})).await;
    let (_, created) = srv
        .post(
            "/inventory/items",
            json!({
                "templateId": template["id"],
                "locationId": location["id"],
                "quantities": {"Bad": 1},
            }),
        )
        .await;
    let id = created[0]["id"].as_str().unwrap().to_string();

    let (status, updated) = srv
        .patch(
            &format!("/inventory/items/{id}"),
            json!({"locationId": "", "serial": "SN-7", "conservationState": "Regular"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated["locationId"].is_null());
    assert_eq!(updated["serial"], "SN-7");
    assert_eq!(updated["conservationState"], "Regular");
    assert_eq!(updated["position"], 1);

    let (_, fetched) = srv.get(&format!("/inventory/items/{id}")).await;
    assert!(fetched["locationId"].is_null());
}

#[tokio::test]
async fn missing_and_malformed_ids() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/templates/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");

    let (status, body) = srv
        .patch(
            "/locations/0192f0a4-7b7e-7c4c-9d7e-2f2f2f2f2f2f",
            json!({"name": "Annex"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    // Delete of a missing id is a no-op.
    assert_eq!(
        srv.delete("/inventory/items/0192f0a4-7b7e-7c4c-9d7e-2f2f2f2f2f2f").await,
        StatusCode::NO_CONTENT
    );
}

#[tokio::test]
async fn export_renders_rows_with_placeholders() {
    let srv = TestServer::spawn().await;
    let (_, template) = srv
        .post("/templates", json!({"assetCode": "A1", "name": "Chair", "model": "No. 14"}))
        .await;
    let (_, location) = srv.post("/locations", json!({"name": "Warehouse"})).await;
    srv.post(
        "/inventory/items",
        json!({
            "templateId": template["id"],
            "locationId": location["id"],
            "quantities": {"Good": 1, "Bad": 1},
        }),
    )
    .await;

    let location_id = location["id"].as_str().unwrap().to_string();
    assert_eq!(
        srv.delete(&format!("/locations/{location_id}")).await,
        StatusCode::NO_CONTENT
    );

    let (status, export) = srv.get("/inventory/export").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(export["columns"][0], "Position");
    assert_eq!(export["count"], 2);

    let row = &export["rows"][0];
    assert_eq!(row["Position"], 1);
    assert_eq!(row["Asset Code"], "A1");
    assert_eq!(row["Model"], "No. 14");
    assert_eq!(row["Location"], "N/A");
    assert_eq!(row["Serial Number"], "");
    assert_eq!(export["rows"][1]["Conservation State"], "Bad");
}

#[tokio::test]
async fn export_downloads_as_xlsx_workbook() {
    let srv = TestServer::spawn().await;
    let (_, template) = srv.post("/templates", json!({"assetCode": "A1", "name": "Chair"})).await;
    srv.post(
        "/inventory/items",
        json!({"templateId": template["id"], "quantities": {"Good": 2}}),
    )
    .await;

    let res = srv.client.get(srv.url("/inventory/export.xlsx")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()["content-type"],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert!(res.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .contains("InventoryReport.xlsx"));

    let body = res.bytes().await.unwrap();
    assert!(body.starts_with(b"PK"));
}
