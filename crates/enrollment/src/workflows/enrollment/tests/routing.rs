use super::common::*;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::enrollment::location::LocationLookup;
use crate::workflows::enrollment::router::{enrollment_router, EnrollmentApi};
use crate::workflows::enrollment::conditional::ConditionalFieldController;

fn router<L: LocationLookup + 'static>(lookup: L) -> axum::Router {
    let api = EnrollmentApi::new(resolver(lookup))
        .with_controller(ConditionalFieldController::with_today(today()));
    enrollment_router(Arc::new(api))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

fn post_json(uri: &str, payload: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).expect("payload encodes")))
        .expect("request builds")
}

#[tokio::test]
async fn provinces_are_listed_by_name() {
    let response = router(registry())
        .oneshot(
            Request::get("/api/v1/locations/provinces")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let names: Vec<&str> = body
        .as_array()
        .expect("array body")
        .iter()
        .filter_map(|node| node["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Bulacan", "Pampanga"]);
    assert_eq!(body[0]["label"], "BULACAN");
    assert_eq!(body[0]["code"], BULACAN);
}

#[tokio::test]
async fn barangays_of_a_city() {
    let uri = format!("/api/v1/locations/cities/{MALOLOS}/barangays");
    let response = router(registry())
        .oneshot(Request::get(uri).body(Body::empty()).expect("request builds"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body[0]["code"], ATLAG);
    assert_eq!(body[0]["level"], "barangay");
    assert_eq!(body[0]["parent_code"], MALOLOS);
    assert_eq!(body[0]["label"], body[0]["name"].as_str().map(str::to_uppercase).expect("name"));
}

#[tokio::test]
async fn unknown_parent_is_not_found() {
    let response = router(registry())
        .oneshot(
            Request::get("/api/v1/locations/provinces/000000000/cities")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unreachable_registry_is_a_bad_gateway() {
    let uri = format!("/api/v1/locations/provinces/{BULACAN}/cities");
    let response = router(UnreachableChildren::new())
        .oneshot(Request::get(uri).body(Body::empty()).expect("request builds"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("connection reset"));
}

#[tokio::test]
async fn validate_reports_issues_for_an_empty_snapshot() {
    let payload = json!({
        "fields": { "firstName": "Juan", "legacyField": "ignored" },
        "lastSaved": "2026-06-15T08:30:00Z"
    });
    let response = router(registry())
        .oneshot(post_json("/api/v1/enrollment/validate", &payload))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["focus"], "schoolYear");
    assert_eq!(body["summary"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn validate_accepts_a_complete_snapshot() {
    let payload = serde_json::to_value(snapshot_with(&complete_fields(), false))
        .expect("snapshot encodes");
    let response = router(registry())
        .oneshot(post_json("/api/v1/enrollment/validate", &payload))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["errors"], json!([]));
}

#[tokio::test]
async fn review_endpoint_returns_sections() {
    let payload = json!({
        "formData": serde_json::to_value(snapshot_with(&complete_fields(), false))
            .expect("snapshot encodes"),
        "formCompleted": true,
        "termsAccepted": true
    });
    let response = router(registry())
        .oneshot(post_json("/api/v1/enrollment/review", &payload))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["ready_to_submit"], true);
    assert_eq!(body["sections"][0]["title"], "School Information");
    assert_eq!(
        body["missing_documents"],
        json!(["Birth Certificate", "2x2 Photo of the Student"])
    );
}
