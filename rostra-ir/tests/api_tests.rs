//! Integration tests for the rostra-ir HTTP surface
//!
//! Routed through `tower::ServiceExt::oneshot` against a temp-dir database,
//! with operator identity supplied via the auth headers.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use rostra_common::events::EventBus;
use rostra_ir::{build_router, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method
use uuid::Uuid;

const TEST_USER_ID: &str = "7f1c9b66-4f4e-4a8a-9d5c-0a9de1c40a11";
const TEST_USER_EMAIL: &str = "analyst@example.com";

async fn setup_app() -> (TempDir, axum::Router) {
    let dir = TempDir::new().expect("tempdir");
    let pool = rostra_common::db::init_database(&dir.path().join("rostra.db"))
        .await
        .expect("init_database");
    let state = AppState::new(pool, EventBus::new(100));
    (dir, build_router(state))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-rostra-user-id", TEST_USER_ID)
        .header("x-rostra-user-email", TEST_USER_EMAIL)
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn observation_body() -> Value {
    json!({
        "provider_npi": "1234567890",
        "provider_name": "Dr. Jane Smith",
        "payer_name": "Acme Health",
        "field_observed": "term_date",
        "corrected_value": "2024-09-30",
        "evidence_type": "payer_portal",
        "evidence_notes": "Portal screenshot dated 2024-10-02"
    })
}

// =============================================================================
// Health and registry
// =============================================================================

#[tokio::test]
async fn health_requires_no_auth() {
    let (_dir, app) = setup_app().await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "rostra-ir");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn categories_lists_only_active_entries() {
    let (_dir, app) = setup_app().await;

    let response = app.oneshot(get("/categories")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let categories = body.as_array().unwrap();
    assert_eq!(categories.len(), 3);
    assert!(categories
        .iter()
        .all(|c| c["is_active"].as_bool().unwrap()));
}

// =============================================================================
// Observations
// =============================================================================

#[tokio::test]
async fn observation_submission_requires_identity_headers() {
    let (_dir, app) = setup_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/observations")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_vec(&observation_body()).unwrap(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn five_digit_npi_is_refused_before_any_write() {
    let (_dir, app) = setup_app().await;

    let mut body = observation_body();
    body["provider_npi"] = json!("12345");

    let response = app
        .clone()
        .oneshot(post_json("/observations", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing reached the store
    let response = app.oneshot(get("/observations")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn observation_lifecycle_create_list_detail() {
    let (_dir, app) = setup_app().await;

    let response = app
        .clone()
        .oneshot(post_json("/observations", observation_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = extract_json(response.into_body()).await;
    assert_eq!(created["status"], "pending");
    assert_eq!(created["submitted_by_email"], TEST_USER_EMAIL);
    let id = created["id"].as_str().unwrap().to_string();

    // Status filter finds it
    let response = app
        .clone()
        .oneshot(get("/observations?status=pending"))
        .await
        .unwrap();
    let listed = extract_json(response.into_body()).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // A different status filter does not
    let response = app
        .clone()
        .oneshot(get("/observations?status=approved"))
        .await
        .unwrap();
    let listed = extract_json(response.into_body()).await;
    assert_eq!(listed.as_array().unwrap().len(), 0);

    // Detail carries an empty review history
    let response = app
        .oneshot(get(&format!("/observations/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let detail = extract_json(response.into_body()).await;
    assert_eq!(detail["observation"]["id"], id.as_str());
    assert_eq!(detail["reviews"].as_array().unwrap().len(), 0);
}

// =============================================================================
// Batches
// =============================================================================

fn batch_body(csv_text: &str) -> Value {
    json!({
        "csv_text": csv_text,
        "config": {
            "id_column": "npi",
            "category_key": "enrollment_status",
            "tag_value": "termed",
            "file_name": "sweep.csv"
        }
    })
}

/// Poll the batch detail until ingestion reaches a terminal state
async fn wait_for_ingest(app: &axum::Router, batch_id: &str) -> Value {
    for _ in 0..200 {
        let response = app
            .clone()
            .oneshot(get(&format!("/batches/{batch_id}")))
            .await
            .unwrap();
        let body = extract_json(response.into_body()).await;
        if body["ingest_state"] != "ingesting" {
            return body;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("batch {batch_id} never left the ingesting state");
}

#[tokio::test]
async fn batch_submission_ingests_in_the_background() {
    let (_dir, app) = setup_app().await;

    let csv_text = "npi,provider_name\n1111111111,Adams\n2222222222,Brown\n3333333333,Chen\n";
    let response = app
        .clone()
        .oneshot(post_json("/batches", batch_body(csv_text)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let accepted = extract_json(response.into_body()).await;
    assert_eq!(accepted["record_count"], 3);
    assert_eq!(accepted["total_chunks"], 1);
    let batch_id = accepted["batch_id"].as_str().unwrap().to_string();

    let detail = wait_for_ingest(&app, &batch_id).await;
    assert_eq!(detail["ingest_state"], "ingested");
    assert_eq!(detail["status"], "pending");
    assert_eq!(detail["persisted_record_count"], 3);
    assert_eq!(detail["partial"], false);
    assert_eq!(detail["sample_records"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn batch_with_unknown_id_column_is_refused() {
    let (_dir, app) = setup_app().await;

    let csv_text = "provider_id,provider_name\n1,Adams\n";
    let response = app
        .clone()
        .oneshot(post_json("/batches", batch_body(csv_text)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // No batch row was created
    let response = app.oneshot(get("/batches")).await.unwrap();
    let listed = extract_json(response.into_body()).await;
    assert_eq!(listed.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn malformed_csv_is_a_parse_error() {
    let (_dir, app) = setup_app().await;

    let csv_text = "npi,provider_name\n123,\"unterminated\n456,ok\n";
    let response = app
        .oneshot(post_json("/batches", batch_body(csv_text)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "PARSE_ERROR");
}

#[tokio::test]
async fn batch_export_returns_csv() {
    let (_dir, app) = setup_app().await;

    let csv_text = "npi,provider_name\n1111111111,Adams\n";
    let response = app
        .clone()
        .oneshot(post_json("/batches", batch_body(csv_text)))
        .await
        .unwrap();
    let accepted = extract_json(response.into_body()).await;
    let batch_id = accepted["batch_id"].as_str().unwrap().to_string();
    wait_for_ingest(&app, &batch_id).await;

    let response = app
        .oneshot(get(&format!("/batches/{batch_id}/export")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/csv"
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("1111111111"));
    assert!(text.contains("Adams"));
}

// =============================================================================
// Reviews
// =============================================================================

#[tokio::test]
async fn review_flow_over_http() {
    let (_dir, app) = setup_app().await;

    // Seed a pending batch
    let csv_text = "npi,provider_name\n1111111111,Adams\n2222222222,Brown\n";
    let response = app
        .clone()
        .oneshot(post_json("/batches", batch_body(csv_text)))
        .await
        .unwrap();
    let accepted = extract_json(response.into_body()).await;
    let batch_id = accepted["batch_id"].as_str().unwrap().to_string();
    wait_for_ingest(&app, &batch_id).await;

    // Rejection without a comment is refused
    let response = app
        .clone()
        .oneshot(post_json(
            "/reviews",
            json!({ "batch_id": batch_id, "decision": "rejected" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "COMMENT_REQUIRED");

    // Rejection with a comment lands and transitions the batch
    let response = app
        .clone()
        .oneshot(post_json(
            "/reviews",
            json!({
                "batch_id": batch_id,
                "decision": "rejected",
                "comment": "duplicate IDs"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let entry = extract_json(response.into_body()).await;
    assert_eq!(entry["decision"], "rejected");
    assert_eq!(entry["batch_id"], batch_id.as_str());

    // A second attempt reports the conflict and the existing decision
    let response = app
        .clone()
        .oneshot(post_json(
            "/reviews",
            json!({
                "batch_id": batch_id,
                "decision": "approved",
                "comment": "changed my mind"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert_eq!(body["error"]["detail"]["current_status"], "rejected");
    assert_eq!(body["error"]["detail"]["last_decision"], "rejected");

    // The audit log for the batch holds exactly the one entry
    let response = app
        .oneshot(get(&format!("/reviews?batch_id={batch_id}")))
        .await
        .unwrap();
    let entries = extract_json(response.into_body()).await;
    assert_eq!(entries.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn review_requires_exactly_one_subject() {
    let (_dir, app) = setup_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/reviews",
            json!({ "decision": "approved" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let both = json!({
        "observation_id": Uuid::new_v4(),
        "batch_id": Uuid::new_v4(),
        "decision": "approved"
    });
    let response = app.oneshot(post_json("/reviews", both)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
