use super::common::*;
use crate::workflows::homologation::domain::{HomologationStatus, PaymentState, PaymentStatus};
use crate::workflows::homologation::ports::HomologationStore;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn post_json(uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(payload).expect("serialize")))
        .expect("request builds")
}

#[tokio::test]
async fn create_and_fetch_roundtrip() {
    let harness = harness();
    let app = test_router(&harness);

    let payload = json!({
        "owner": {
            "full_name": "Marta Quiroga",
            "email": "marta.quiroga@example.com",
            "national_id": "27-22893412-5"
        },
        "vehicle": {
            "make": "Ford",
            "model": "Falcon",
            "year": 1978,
            "vin": "8AFDT33H1J8B12345",
            "plate": "AB123CD"
        }
    });

    let response = app
        .clone()
        .oneshot(post_json("/api/v1/homologations", &payload))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "draft");
    assert_eq!(body["payment_status"], "pending");
    let id = body["id"].as_str().expect("id present").to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/homologations/{id}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn fetch_unknown_case_is_404() {
    let harness = harness();
    let app = test_router(&harness);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/homologations/hom-000000")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn document_upload_decodes_base64_content() {
    let harness = harness();
    let record = seed_homologation(
        &harness.homologations,
        "route-doc",
        HomologationStatus::Draft,
        PaymentState::Pending,
        0,
    );
    let app = test_router(&harness);

    let payload = json!({
        "name": "titulo.pdf",
        "document_type": "vehicle_title",
        "content_type": "application/pdf",
        "content": BASE64.encode(b"%PDF-1.4 stub"),
    });
    let response = app
        .oneshot(post_json(
            &format!("/api/v1/homologations/{}/documents", record.id.0),
            &payload,
        ))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::CREATED);

    let stored = harness.homologations.fetch(&record.id).unwrap().unwrap();
    assert_eq!(stored.documents.len(), 1);
    assert_eq!(stored.documents[0].size_bytes, b"%PDF-1.4 stub".len() as u64);
}

#[tokio::test]
async fn document_upload_rejects_bad_base64() {
    let harness = harness();
    let record = seed_homologation(
        &harness.homologations,
        "route-doc-bad",
        HomologationStatus::Draft,
        PaymentState::Pending,
        0,
    );
    let app = test_router(&harness);

    let payload = json!({
        "name": "titulo.pdf",
        "document_type": "vehicle_title",
        "content_type": "application/pdf",
        "content": "%%% not base64 %%%",
    });
    let response = app
        .oneshot(post_json(
            &format!("/api/v1/homologations/{}/documents", record.id.0),
            &payload,
        ))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn transition_maps_conflicts_and_illegal_moves() {
    let harness = harness();
    let record = seed_homologation(
        &harness.homologations,
        "route-transition",
        HomologationStatus::Submitted,
        PaymentState::Paid,
        1,
    );
    let app = test_router(&harness);
    let uri = format!("/api/v1/homologations/{}/transition", record.id.0);

    // Stale version.
    let response = app
        .clone()
        .oneshot(post_json(
            &uri,
            &json!({
                "target_status": "under_review",
                "expected_version": record.version + 7,
                "actor": "reviewer@registry.test"
            }),
        ))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Illegal edge.
    let response = app
        .clone()
        .oneshot(post_json(
            &uri,
            &json!({
                "target_status": "completed",
                "expected_version": record.version,
                "actor": "reviewer@registry.test"
            }),
        ))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Legal edge.
    let response = app
        .oneshot(post_json(
            &uri,
            &json!({
                "target_status": "under_review",
                "expected_version": record.version,
                "actor": "reviewer@registry.test",
                "reason": "queue pickup"
            }),
        ))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "under_review");
}

#[tokio::test]
async fn webhook_acknowledges_ignored_types_with_200() {
    let harness = harness();
    let app = test_router(&harness);

    let response = app
        .oneshot(post_json(
            "/api/v1/payments/webhook",
            &json!({ "type": "merchant_order", "data": { "id": 12345 } }),
        ))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["received"], true);
}

#[tokio::test]
async fn webhook_unknown_payment_is_404() {
    let harness = harness();
    harness.gateway.script_payment("31337", "approved", None);
    let app = test_router(&harness);

    let response = app
        .oneshot(post_json(
            "/api/v1/payments/webhook",
            &json!({ "type": "payment", "data": { "id": "31337" } }),
        ))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert_eq!(body["received"], false);
}

#[tokio::test]
async fn webhook_accepts_numeric_payment_ids() {
    let harness = harness();
    let record = seed_homologation(
        &harness.homologations,
        "route-webhook",
        HomologationStatus::Draft,
        PaymentState::Pending,
        1,
    );
    let payment = seed_payment(
        &harness.payments,
        &record.id,
        "route-webhook",
        PaymentStatus::Pending,
        None,
    );
    harness
        .gateway
        .script_payment("4242", "approved", Some(&payment.id.0));
    let app = test_router(&harness);

    let response = app
        .oneshot(post_json(
            "/api/v1/payments/webhook",
            &json!({ "type": "payment", "data": { "id": 4242 } }),
        ))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::OK);

    let stored = harness.homologations.fetch(&record.id).unwrap().unwrap();
    assert_eq!(stored.status, HomologationStatus::Submitted);
}

#[tokio::test]
async fn webhook_gateway_outage_is_503() {
    let harness = harness();
    harness.gateway.set_unavailable(true);
    let app = test_router(&harness);

    let response = app
        .oneshot(post_json(
            "/api/v1/payments/webhook",
            &json!({ "type": "payment", "data": { "id": "1" } }),
        ))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
