//! API integration tests for ecostream-server.
//!
//! These tests drive the full router over in-memory backends: login and
//! session checks, user and item CRUD, file upload and download, and the
//! cross-cutting behavior (CORS, body decoding, method routing).

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use ecostream_server::config::UserAuthMode;
use ecostream_server::{create_router_with_state, AppState, Config, SessionKeys};

/// Router over fresh in-memory backends with the given config
fn create_test_app_with(config: Config) -> Router {
    create_router_with_state(AppState::in_memory(config))
}

fn create_test_app() -> Router {
    create_test_app_with(Config::default())
}

/// Router whose store already holds the seeded `admin`/`admin` account
async fn create_seeded_app() -> Router {
    let state = AppState::in_memory(Config::default());
    state.seed_admin().await.unwrap();
    create_router_with_state(state)
}

/// Session token signed with the default JWT secret
fn session_token(username: &str) -> String {
    SessionKeys::new(b"JWT_SECRET").issue(username).unwrap()
}

fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Helper to create a multipart body with a single `file` part
fn create_file_multipart(file_name: &str, content_type: &str, content: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----TestBoundary7MA4YWxkTrZu0gW";
    let mut body = Vec::new();

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    (format!("multipart/form-data; boundary={}", boundary), body)
}

/// Create a user through the API and return its id
async fn create_user(app: &Router, username: &str) -> String {
    let response = send(
        app,
        json_request("POST", "/users/", json!({ "username": username }), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

// ============================================================================
// Health & Readiness Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_plain_text() {
    let app = create_test_app();

    for uri in ["/health/", "/health"] {
        let response = send(&app, empty_request("GET", uri, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"All systems operational!");
    }
}

#[tokio::test]
async fn test_ready_endpoint_reports_store() {
    let app = create_test_app();

    let response = send(&app, empty_request("GET", "/ready/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["ready"], true);
    assert_eq!(json["store"], "memory");
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = create_test_app();

    let response = send(&app, empty_request("GET", "/api-docs/openapi.json", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["paths"]["/users/{id}"].is_object());
}

// ============================================================================
// Login & Session Tests
// ============================================================================

#[tokio::test]
async fn test_login_scenario() {
    let app = create_seeded_app().await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/login/",
            json!({ "username": "admin", "password": "admin" }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = send(&app, empty_request("GET", "/authenticate/", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_bytes(response).await.is_empty());

    // Same user, token issued 16 minutes ago
    let stale = SessionKeys::new(b"JWT_SECRET")
        .issue_at("admin", now_epoch() - 16 * 60)
        .unwrap();
    let response = send(&app, empty_request("GET", "/authenticate/", Some(&stale))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "AUTH_TOKEN_EXPIRED");
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = create_seeded_app().await;

    for (username, password) in [("admin", "wrong"), ("nobody", "admin")] {
        let response = send(
            &app,
            json_request(
                "POST",
                "/login/",
                json!({ "username": username, "password": password }),
                None,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["code"], "AUTH_INVALID_CREDENTIALS");
    }
}

#[tokio::test]
async fn test_login_refuses_account_without_password() {
    let app = create_test_app();
    create_user(&app, "nopass").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/login/",
            json!({ "username": "nopass", "password": "" }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_authenticate_requires_valid_bearer() {
    let app = create_test_app();

    let response = send(&app, empty_request("GET", "/authenticate/", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "AUTH_MISSING_TOKEN");

    let response = send(&app, empty_request("GET", "/authenticate/", Some("garbage"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "AUTH_INVALID_TOKEN");

    let forged = SessionKeys::new(b"not-the-secret").issue("admin").unwrap();
    let response = send(&app, empty_request("GET", "/authenticate/", Some(&forged))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// User CRUD Tests
// ============================================================================

#[tokio::test]
async fn test_user_crud_scenario() {
    let app = create_test_app();

    let id = create_user(&app, "alice").await;
    assert!(!id.is_empty());

    let response = send(&app, empty_request("GET", &format!("/users/{}", id), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["username"], "alice");
    assert_eq!(json["isActive"], true);
    assert!(json.get("passwordHash").is_none());

    let response = send(
        &app,
        json_request(
            "PUT",
            &format!("/users/{}", id),
            json!({ "username": "alicia", "isActive": false }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "id": id, "username": "alicia", "isActive": false })
    );

    let response = send(&app, empty_request("GET", "/users/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let users = body_json(response).await;
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert_eq!(users[0]["username"], "alicia");

    let response = send(&app, empty_request("DELETE", &format!("/users/{}", id), None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, empty_request("GET", &format!("/users/{}", id), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_created_user_ids_are_distinct() {
    let app = create_test_app();

    let mut ids = Vec::new();
    for name in ["u1", "u2", "u3", "u4"] {
        ids.push(create_user(&app, name).await);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn test_users_listed_by_username() {
    let app = create_test_app();
    for name in ["mallory", "bob", "alice"] {
        create_user(&app, name).await;
    }

    let response = send(&app, empty_request("GET", "/users/", None)).await;
    let names: Vec<String> = body_json(response)
        .await
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["alice", "bob", "mallory"]);
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let app = create_test_app();
    create_user(&app, "alice").await;

    let response = send(
        &app,
        json_request("POST", "/users/", json!({ "username": "alice" }), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[tokio::test]
async fn test_update_missing_user_succeeds_without_creating() {
    let app = create_test_app();

    let response = send(
        &app,
        json_request(
            "PUT",
            "/users/ghost",
            json!({ "username": "ghost", "isActive": true }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, empty_request("GET", "/users/ghost", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_missing_user_is_no_content() {
    let app = create_test_app();

    let response = send(&app, empty_request("DELETE", "/users/never-existed", None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_static_token_gates_user_mutations() {
    let config = Config {
        user_auth: UserAuthMode::StaticToken,
        ..Config::default()
    };
    let app = create_test_app_with(config);

    let response = send(
        &app,
        json_request("POST", "/users/", json!({ "username": "alice" }), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        json_request("POST", "/users/", json!({ "username": "alice" }), Some("WRONG")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        json_request("POST", "/users/", json!({ "username": "alice" }), Some("TOKEN")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Reads stay open
    let response = send(&app, empty_request("GET", "/users/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, empty_request("DELETE", "/users/x", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_mode_gates_user_mutations() {
    let config = Config {
        user_auth: UserAuthMode::Session,
        ..Config::default()
    };
    let app = create_test_app_with(config);

    let response = send(
        &app,
        json_request("POST", "/users/", json!({ "username": "bob" }), Some("TOKEN")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = session_token("admin");
    let response = send(
        &app,
        json_request("POST", "/users/", json!({ "username": "bob" }), Some(&token)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

// ============================================================================
// Item Tests
// ============================================================================

#[tokio::test]
async fn test_item_lifecycle() {
    let app = create_test_app();
    let owner_id = create_user(&app, "alice").await;
    let token = session_token("alice");

    let response = send(
        &app,
        json_request("POST", "/items/", json!({ "name": "compost bin" }), Some(&token)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let item = body_json(response).await;
    assert_eq!(item["name"], "compost bin");
    assert_eq!(item["count"], 0);
    assert_eq!(item["userId"], owner_id.as_str());
    let item_id = item["id"].as_str().unwrap().to_string();

    let response = send(&app, empty_request("GET", "/items/", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let items = body_json(response).await;
    assert_eq!(items.as_array().unwrap().len(), 1);
    assert_eq!(items[0]["id"], item_id.as_str());

    let response = send(&app, empty_request("DELETE", &format!("/items/{}", item_id), Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, empty_request("GET", &format!("/items/{}", item_id), Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_item_update_never_changes_owner() {
    let app = create_test_app();
    let owner_id = create_user(&app, "alice").await;
    let intruder_id = create_user(&app, "mallory").await;
    let token = session_token("alice");

    let response = send(
        &app,
        json_request("POST", "/items/", json!({ "name": "jar" }), Some(&token)),
    )
    .await;
    let item_id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = send(
        &app,
        json_request(
            "PUT",
            &format!("/items/{}", item_id),
            json!({ "name": "big jar", "count": 7, "userId": intruder_id }),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "id": item_id, "name": "big jar", "count": 7 })
    );

    let response = send(&app, empty_request("GET", &format!("/items/{}", item_id), Some(&token)))
        .await;
    let stored = body_json(response).await;
    assert_eq!(stored["name"], "big jar");
    assert_eq!(stored["count"], 7);
    assert_eq!(stored["userId"], owner_id.as_str());
}

#[tokio::test]
async fn test_items_listed_per_owner() {
    let app = create_test_app();
    create_user(&app, "alice").await;
    create_user(&app, "bob").await;
    let alice = session_token("alice");
    let bob = session_token("bob");

    for name in ["a", "b", "c"] {
        send(
            &app,
            json_request("POST", "/items/", json!({ "name": name }), Some(&alice)),
        )
        .await;
    }
    send(
        &app,
        json_request("POST", "/items/", json!({ "name": "bobs" }), Some(&bob)),
    )
    .await;

    let response = send(&app, empty_request("GET", "/items/", Some(&alice))).await;
    let ids: Vec<String> = body_json(response)
        .await
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids.len(), 3);
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);

    let response = send(&app, empty_request("GET", "/items/", Some(&bob))).await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_item_routes_require_session() {
    let app = create_test_app();

    let response = send(&app, empty_request("GET", "/items/", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The static token is not a session
    let response = send(&app, empty_request("GET", "/items/", Some("TOKEN"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_item_for_unknown_caller_is_unauthorized() {
    let app = create_test_app();
    let token = session_token("ghost");

    let response = send(
        &app,
        json_request("POST", "/items/", json!({ "name": "jar" }), Some(&token)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "AUTH_USER_NOT_FOUND");
}

#[tokio::test]
async fn test_delete_missing_item_is_no_content() {
    let app = create_test_app();
    let token = session_token("admin");

    let response = send(&app, empty_request("DELETE", "/items/never-existed", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

// ============================================================================
// Body Decoding Tests
// ============================================================================

#[tokio::test]
async fn test_malformed_json_is_bad_request_everywhere() {
    let app = create_test_app();
    let token = session_token("admin");

    let cases = [
        ("POST", "/login/"),
        ("POST", "/users/"),
        ("PUT", "/users/some-id"),
        ("POST", "/items/"),
        ("PUT", "/items/some-id"),
    ];

    for (method, uri) in cases {
        for body in ["{not json", "", r#"{"unexpected":true}"#] {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(body))
                .unwrap();

            let response = send(&app, request).await;
            assert_eq!(
                response.status(),
                StatusCode::BAD_REQUEST,
                "{} {} with body {:?}",
                method,
                uri,
                body
            );
            assert_eq!(body_json(response).await["code"], "INVALID_INPUT");
        }
    }
}

// ============================================================================
// File Tests
// ============================================================================

#[tokio::test]
async fn test_upload_then_download_round_trip() {
    let app = create_test_app();
    let content: Vec<u8> = (0u8..=255).cycle().take(4096).collect();
    let (content_type, body) = create_file_multipart("data.bin", "image/png", &content);

    let response = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/files/")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/files/data.bin"
    );
    let json = body_json(response).await;
    assert_eq!(json["key"], "data.bin");
    assert_eq!(json["bucket"], "default");
    assert_eq!(json["size"], 4096);

    let response = send(&app, empty_request("GET", "/files/data.bin", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    assert_eq!(body_bytes(response).await, content);
}

#[tokio::test]
async fn test_location_header_leads_back_to_upload() {
    let app = create_test_app();

    for (file_name, content) in [
        ("a?b.txt", &b"question"[..]),
        ("x#y.txt", &b"hash"[..]),
        ("a b.txt", &b"space"[..]),
        ("100%.txt", &b"percent"[..]),
    ] {
        let (content_type, body) = create_file_multipart(file_name, "text/plain", content);
        let response = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/files/")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED, "{}", file_name);
        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(body_json(response).await["key"], file_name);

        let response = send(&app, empty_request("GET", &location, None)).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", location);
        assert_eq!(body_bytes(response).await, content);
    }
}

#[tokio::test]
async fn test_upload_reports_configured_bucket() {
    let app = create_test_app_with(Config {
        bucket: "files".to_string(),
        ..Config::default()
    });
    let (content_type, body) = create_file_multipart("notes.txt", "text/plain", b"hi");

    let response = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/files/")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["bucket"], "files");
}

#[tokio::test]
async fn test_upload_overwrites_same_name() {
    let app = create_test_app();

    for content in [&b"first"[..], &b"second"[..]] {
        let (content_type, body) = create_file_multipart("notes.txt", "text/plain", content);
        let response = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/files/")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = send(&app, empty_request("GET", "/files/notes.txt", None)).await;
    assert_eq!(body_bytes(response).await, b"second");
}

#[tokio::test]
async fn test_download_missing_file_is_not_found() {
    let app = create_test_app();

    let response = send(&app, empty_request("GET", "/files/missing.txt", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_upload_requires_multipart() {
    let app = create_test_app();

    let response = send(
        &app,
        json_request("POST", "/files/", json!({ "file": "nope" }), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Routing & CORS Tests
// ============================================================================

#[tokio::test]
async fn test_cors_preflight_answered() {
    let app = create_test_app();

    let response = send(
        &app,
        Request::builder()
            .method("OPTIONS")
            .uri("/users/")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,x-csrf-token")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_unmapped_method_is_method_not_allowed() {
    let app = create_test_app();

    let response = send(&app, empty_request("PATCH", "/users/", None)).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = send(&app, empty_request("DELETE", "/health/", None)).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
