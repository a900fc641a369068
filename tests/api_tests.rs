use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;
use warden::api::AppState;
use warden::config::Config;
use warden::services::TokenService;

const SECRET: &str = "integration-test-secret-0123456789";
const PASSWORD: &str = "correct horse battery";

fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.security.jwt_secret = SECRET.to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

async fn spawn_app() -> (Router, Arc<AppState>) {
    let state = warden::api::create_app_state_from_config(test_config(), None)
        .await
        .expect("Failed to create app state");

    state
        .auth_service()
        .register("alice", PASSWORD)
        .await
        .expect("Failed to seed user");

    (warden::api::router(state.clone()), state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn login_request(name: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "name": name, "password": password }).to_string(),
        ))
        .unwrap()
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn login_token(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(login_request("alice", PASSWORD))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    json["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_login_then_bearer_access() {
    let (app, _) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(login_request("alice", PASSWORD))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["tokenType"], "Bearer");
    assert!(json["data"]["expiresAt"].is_string());
    assert_eq!(json["data"]["user"]["name"], "alice");

    let token = json["data"]["token"].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(get_with_token("/api/users/me", token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["name"], "alice");
}

#[tokio::test]
async fn test_login_failures_share_one_message() {
    let (app, _) = spawn_app().await;

    let wrong_password = app
        .clone()
        .oneshot(login_request("alice", "not-the-password"))
        .await
        .unwrap();
    let unknown_user = app
        .clone()
        .oneshot(login_request("mallory", PASSWORD))
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(wrong_password).await, body_json(unknown_user).await);
}

#[tokio::test]
async fn test_malformed_login_body_uses_envelope() {
    let (app, _) = spawn_app().await;

    for (content_type, body) in [
        ("application/json", "{not json"),
        ("application/json", r#"{"name":"alice"}"#),
        ("text/plain", r#"{"name":"alice","password":"x"}"#),
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .header(header::CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());
    }
}

#[tokio::test]
async fn test_protected_routes_reject_missing_or_bad_tokens() {
    let (app, _) = spawn_app().await;

    let no_header = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/users/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(no_header.status(), StatusCode::UNAUTHORIZED);

    let garbage = app
        .clone()
        .oneshot(get_with_token("/api/users/me", "not.a.jwt"))
        .await
        .unwrap();
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);

    let basic = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/users")
                .header(header::AUTHORIZATION, "Basic YWxpY2U6cGFzcw==")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(basic.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(body_json(no_header).await, body_json(garbage).await);
}

#[tokio::test]
async fn test_expired_and_foreign_tokens_rejected() {
    let (app, state) = spawn_app().await;
    let user = state.auth_service().find_by_name("alice").await.unwrap().unwrap();

    let ours = TokenService::new(&state.config().security).unwrap();
    let expired = ours
        .issue_for(user.id, Utc::now() - Duration::hours(3))
        .unwrap()
        .token;

    let mut foreign_security = state.config().security.clone();
    foreign_security.jwt_secret = "some-other-secret-0123456789abcdef".to_string();
    let foreign = TokenService::new(&foreign_security)
        .unwrap()
        .issue(&user)
        .unwrap()
        .token;

    for token in [expired, foreign] {
        let response = app
            .clone()
            .oneshot(get_with_token("/api/users/me", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_token_for_removed_user_rejected() {
    let (app, state) = spawn_app().await;
    let token = login_token(&app).await;

    state.auth_service().remove_user("alice").await.unwrap();

    let response = app
        .clone()
        .oneshot(get_with_token("/api/users/me", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_projection_hides_secrets() {
    let (app, _) = spawn_app().await;
    let token = login_token(&app).await;

    let response = app
        .clone()
        .oneshot(get_with_token("/api/users", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let users = json["data"].as_array().unwrap();
    assert_eq!(users.len(), 1);

    let user = users[0].as_object().unwrap();
    for key in ["id", "name", "createdAt", "updatedAt"] {
        assert!(user.contains_key(key), "missing {key}");
    }
    assert!(!user.contains_key("password"));
    assert!(!user.contains_key("authKey"));
    assert!(!user.contains_key("auth_key"));
}

#[tokio::test]
async fn test_get_user_by_id() {
    let (app, state) = spawn_app().await;
    let token = login_token(&app).await;
    let user = state.auth_service().find_by_name("alice").await.unwrap().unwrap();

    let response = app
        .clone()
        .oneshot(get_with_token(&format!("/api/users/{}", user.id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["id"], user.id);

    let response = app
        .clone()
        .oneshot(get_with_token("/api/users/9999", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(get_with_token("/api/users/0", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = spawn_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );

    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["database"], true);
}

#[tokio::test]
async fn test_metrics_requires_token() {
    let (app, _) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = login_token(&app).await;
    let response = app
        .oneshot(get_with_token("/api/metrics", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
