//! End-to-end route tests over an in-process router with a temp database.
//!
//! The EMR endpoints point at a closed local port, so provider traffic
//! fails fast without a live server.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use carebridge_api::{router, AppContext, StaticTokenIdentity};
use carebridge_core::Actor;
use carebridge_domain::{
    Config, DatabaseConfig, EmrConfig, ServerConfig, SyncConfig,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const OPERATOR_TOKEN: &str = "op-token";
const SCHEDULER_SECRET: &str = "sched-secret";

fn test_config(temp: &TempDir) -> Config {
    Config {
        database: DatabaseConfig {
            path: temp.path().join("test.db").to_string_lossy().into_owned(),
            pool_size: 2,
        },
        emr: EmrConfig {
            provider: "elation".into(),
            // Closed port: anything that reaches the wire fails immediately
            api_base_url: "http://127.0.0.1:1/".into(),
            authorization_endpoint: "http://127.0.0.1:1/authorize".into(),
            token_endpoint: "http://127.0.0.1:1/token".into(),
            client_id: "client-1".into(),
            client_secret: "secret-1".into(),
            redirect_uri: "http://127.0.0.1:1/callback".into(),
            scopes: vec!["patients".into()],
        },
        sync: SyncConfig {
            max_pages: 2,
            page_delay_ms: 0,
            ..SyncConfig::with_secret(SCHEDULER_SECRET)
        },
        server: ServerConfig { bind_addr: "127.0.0.1:0".into() },
    }
}

fn app(temp: &TempDir) -> Router {
    let identity = Arc::new(StaticTokenIdentity::new(
        OPERATOR_TOKEN,
        Actor { id: "clin-1".into(), identity: "Dr. Okafor".into() },
    ));
    let ctx = AppContext::new(test_config(temp), identity, "clin-1".into()).unwrap();
    router(Arc::new(ctx))
}

fn authed(request: Request<Body>) -> Request<Body> {
    let (mut parts, body) = request.into_parts();
    parts
        .headers
        .insert("authorization", format!("Bearer {OPERATOR_TOKEN}").parse().unwrap());
    Request::from_parts(parts, body)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let temp = TempDir::new().unwrap();
    let response = app(&temp).oneshot(empty_request("GET", "/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], json!("ok"));
}

#[tokio::test]
async fn sync_requires_a_known_bearer() {
    let temp = TempDir::new().unwrap();
    let app = app(&temp);

    let missing = app.clone().oneshot(empty_request("POST", "/api/sync")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/sync")
                .header("authorization", "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn scheduled_sync_requires_the_shared_secret() {
    let temp = TempDir::new().unwrap();
    let app = app(&temp);

    let missing = app.clone().oneshot(empty_request("POST", "/api/sync/scheduled")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/sync/scheduled")
                .header("x-scheduler-secret", "nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn both_triggers_share_the_same_outcome_shape() {
    let temp = TempDir::new().unwrap();
    let app = app(&temp);

    // No EMR connection exists, so every entity fails on credentials and
    // both triggers answer 502 with the reauthorization hint.
    let operator =
        app.clone().oneshot(authed(empty_request("POST", "/api/sync"))).await.unwrap();
    assert_eq!(operator.status(), StatusCode::BAD_GATEWAY);
    let operator_body = body_json(operator).await;

    let scheduled = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/sync/scheduled")
                .header("x-scheduler-secret", SCHEDULER_SECRET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(scheduled.status(), StatusCode::BAD_GATEWAY);
    let scheduled_body = body_json(scheduled).await;

    assert_eq!(operator_body["reauthorization_required"], json!(true));
    assert_eq!(scheduled_body["reauthorization_required"], json!(true));

    // Same serialization through the same code path.
    let keys = |v: &Value| {
        v.as_object().unwrap().keys().cloned().collect::<Vec<_>>()
    };
    assert_eq!(keys(&operator_body), keys(&scheduled_body));
    assert_eq!(operator_body["report"]["entities"].as_array().unwrap().len(), 24);
    assert_eq!(operator_body["report"]["overall"], scheduled_body["report"]["overall"]);
}

#[tokio::test]
async fn emr_status_reports_disconnected_and_connect_returns_a_url() {
    let temp = TempDir::new().unwrap();
    let app = app(&temp);

    let status =
        app.clone().oneshot(authed(empty_request("GET", "/api/emr/status"))).await.unwrap();
    assert_eq!(status.status(), StatusCode::OK);
    assert_eq!(body_json(status).await["connected"], json!(false));

    let connect =
        app.clone().oneshot(authed(empty_request("GET", "/api/emr/connect"))).await.unwrap();
    assert_eq!(connect.status(), StatusCode::OK);
    let url = body_json(connect).await["authorization_url"].as_str().unwrap().to_string();
    assert!(url.contains("state=clin-1"));
    assert!(url.contains("client_id=client-1"));

    // Disconnecting with nothing stored is a no-op success.
    let disconnect =
        app.oneshot(authed(empty_request("DELETE", "/api/emr/connection"))).await.unwrap();
    assert_eq!(disconnect.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn medication_lifecycle_over_http() {
    let temp = TempDir::new().unwrap();
    let app = app(&temp);

    // Create
    let created = app
        .clone()
        .oneshot(authed(json_request(
            "POST",
            "/api/patients/pat-1/medications",
            json!({"name": "Lisinopril", "dosage": "10mg"}),
        )))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let medication = body_json(created).await;
    let id = medication["id"].as_str().unwrap().to_string();
    assert_eq!(medication["status"], json!("active"));

    // List
    let listed = app
        .clone()
        .oneshot(authed(empty_request("GET", "/api/patients/pat-1/medications")))
        .await
        .unwrap();
    assert_eq!(body_json(listed).await.as_array().unwrap().len(), 1);

    // Patch
    let patched = app
        .clone()
        .oneshot(authed(json_request(
            "PATCH",
            &format!("/api/medications/{id}"),
            json!({"dosage": "20mg"}),
        )))
        .await
        .unwrap();
    assert_eq!(patched.status(), StatusCode::OK);
    assert_eq!(body_json(patched).await["dosage"], json!("20mg"));

    // Discontinue without a reason is rejected
    let no_reason = app
        .clone()
        .oneshot(authed(json_request(
            "POST",
            &format!("/api/medications/{id}/discontinue"),
            json!({"reason": "  "}),
        )))
        .await
        .unwrap();
    assert_eq!(no_reason.status(), StatusCode::BAD_REQUEST);

    let discontinued = app
        .clone()
        .oneshot(authed(json_request(
            "POST",
            &format!("/api/medications/{id}/discontinue"),
            json!({"reason": "adverse reaction"}),
        )))
        .await
        .unwrap();
    assert_eq!(body_json(discontinued).await["status"], json!("discontinued"));

    // Soft delete, then reads disappear
    let deleted = app
        .clone()
        .oneshot(authed(empty_request("DELETE", &format!("/api/medications/{id}"))))
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = app
        .clone()
        .oneshot(authed(empty_request("GET", &format!("/api/medications/{id}"))))
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    // The audit trail survives the delete: create, update, discontinue, delete
    let audit = app
        .oneshot(authed(empty_request("GET", &format!("/api/medications/{id}/audit"))))
        .await
        .unwrap();
    assert_eq!(audit.status(), StatusCode::OK);
    let trail = body_json(audit).await;
    let actions: Vec<_> = trail
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["action"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(actions, vec!["create", "update", "discontinue", "delete"]);
}

#[tokio::test]
async fn unknown_medication_is_not_found() {
    let temp = TempDir::new().unwrap();
    let response = app(&temp)
        .oneshot(authed(empty_request("GET", "/api/medications/missing")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], json!("NotFound"));
    assert_eq!(body["reauthorization_required"], json!(false));
}
