use axum::{
    http::{header, Request, StatusCode},
    routing::{delete, get, post},
    Router,
};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use mongodb::Client;
use stockmonitor::auth::Claims;
use stockmonitor::controllers::{conversations_controller, monitor_controller};
use stockmonitor::models::CurrentUser;
use stockmonitor::{config, routes, AppState};
use tower::ServiceExt;

async fn test_state() -> AppState {
    let mut settings = config::load();
    settings.finnhub_api_key = String::new();
    settings.jwt_secret = "test-secret".to_string();

    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("mongodb client");
    let db = client.database(&settings.mongodb_db);

    AppState::new(db, settings)
}

fn test_user() -> CurrentUser {
    CurrentUser {
        id: "user-1".to_string(),
        name: "test".to_string(),
        email: "test@example.com".to_string(),
    }
}

fn token(secret: &str) -> String {
    let claims = Claims {
        id: "user-1".to_string(),
        name: "test".to_string(),
        email: "test@example.com".to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

fn json_post(uri: &str, body: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(res: axum::response::Response) -> serde_json::Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn start_without_user_returns_401() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/monitor/start", post(monitor_controller::post_start_monitor))
        .with_state(state);

    let req = json_post(
        "/api/monitor/start",
        r#"{"conversationId":"c1","ticker":"AAPL","rule":{"type":"above","value":1}}"#,
    );

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response_json(res).await["error"], "unauthorized");
}

#[tokio::test]
async fn start_missing_fields_returns_400() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/monitor/start", post(monitor_controller::post_start_monitor))
        .with_state(state);

    let mut req = json_post("/api/monitor/start", r#"{"ticker":"AAPL"}"#);
    req.extensions_mut().insert(test_user());

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_json(res).await;
    assert!(body["error"].as_str().unwrap().contains("conversationId, ticker, rule"));
}

#[tokio::test]
async fn start_unsupported_rule_type_returns_400() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/monitor/start", post(monitor_controller::post_start_monitor))
        .with_state(state);

    let mut req = json_post(
        "/api/monitor/start",
        r#"{"conversationId":"c1","ticker":"AAPL","rule":{"type":"sideways","value":3}}"#,
    );
    req.extensions_mut().insert(test_user());

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_json(res).await;
    assert!(body["error"].as_str().unwrap().contains("unsupported rule type"));
}

#[tokio::test]
async fn start_with_rule_missing_value_reports_required_fields() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/monitor/start", post(monitor_controller::post_start_monitor))
        .with_state(state);

    let mut req = json_post(
        "/api/monitor/start",
        r#"{"conversationId":"c1","ticker":"AAPL","rule":{"type":"above"}}"#,
    );
    req.extensions_mut().insert(test_user());

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_json(res).await;
    assert_eq!(
        body["error"],
        "Invalid parameters: conversationId, ticker, rule{type,value} are required"
    );
}

#[tokio::test]
async fn start_malformed_json_returns_400() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/monitor/start", post(monitor_controller::post_start_monitor))
        .with_state(state);

    let mut req = json_post("/api/monitor/start", "{not json");
    req.extensions_mut().insert(test_user());

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn start_for_foreign_conversation_id_returns_404() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/monitor/start", post(monitor_controller::post_start_monitor))
        .with_state(state.clone());

    // not an ObjectId, so no conversation can match
    let mut req = json_post(
        "/api/monitor/start",
        r#"{"conversationId":"c1","ticker":"AAPL","rule":{"type":"below","value":3}}"#,
    );
    req.extensions_mut().insert(test_user());

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(state.monitor.list_all_tasks().is_empty());
}

#[tokio::test]
async fn stop_missing_conversation_returns_400() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/monitor/stop", post(monitor_controller::post_stop_monitor))
        .with_state(state);

    let mut req = json_post("/api/monitor/stop", r#"{"taskId":"t1"}"#);
    req.extensions_mut().insert(test_user());

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(res).await["error"], "missing conversationId");
}

#[tokio::test]
async fn status_missing_conversation_returns_400() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/monitor/status", get(monitor_controller::get_monitor_status))
        .with_state(state);

    let mut req = Request::builder()
        .uri("/api/monitor/status")
        .body(axum::body::Body::empty())
        .unwrap();
    req.extensions_mut().insert(test_user());

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_unknown_conversation_returns_404() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/conversations/:id", delete(conversations_controller::delete_conversation))
        .with_state(state);

    let mut req = Request::builder()
        .method("DELETE")
        .uri("/api/conversations/not-an-object-id")
        .body(axum::body::Body::empty())
        .unwrap();
    req.extensions_mut().insert(test_user());

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn conversation_endpoints_require_a_user() {
    let state = test_state().await;
    let app = Router::new()
        .route(
            "/api/conversations",
            get(conversations_controller::list_conversations)
                .post(conversations_controller::create_conversation),
        )
        .route("/api/conversations/:id", get(conversations_controller::get_conversation))
        .with_state(state);

    let list = Request::builder()
        .uri("/api/conversations")
        .body(axum::body::Body::empty())
        .unwrap();
    let res = app.clone().oneshot(list).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let create = json_post("/api/conversations", r#"{"title":"AAPL watch"}"#);
    let res = app.clone().oneshot(create).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let history = Request::builder()
        .uri("/api/conversations/65f000000000000000000001")
        .body(axum::body::Body::empty())
        .unwrap();
    let res = app.oneshot(history).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn history_of_unknown_conversation_returns_404() {
    let state = test_state().await;
    let app = Router::new()
        .route("/api/conversations/:id", get(conversations_controller::get_conversation))
        .with_state(state);

    let mut req = Request::builder()
        .uri("/api/conversations/not-an-object-id")
        .body(axum::body::Body::empty())
        .unwrap();
    req.extensions_mut().insert(test_user());

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(response_json(res).await["error"], "conversation not found");
}

#[tokio::test]
async fn app_rejects_requests_without_bearer_token() {
    let app = routes::app(test_state().await);

    let req = Request::builder()
        .uri("/api/monitor/status?conversationId=c1")
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn app_rejects_token_signed_with_other_secret() {
    let app = routes::app(test_state().await);

    let req = Request::builder()
        .uri("/api/monitor/status?conversationId=c1")
        .header(header::AUTHORIZATION, format!("Bearer {}", token("wrong-secret")))
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn app_accepts_valid_bearer_token() {
    let app = routes::app(test_state().await);

    let req = Request::builder()
        .uri("/api/monitor/status")
        .header(header::AUTHORIZATION, format!("Bearer {}", token("test-secret")))
        .body(axum::body::Body::empty())
        .unwrap();

    // authenticated, then rejected for the missing query parameter
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_is_public() {
    let app = routes::app(test_state().await);

    let req = Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = response_json(res).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["monitors"]["running"], 0);
}
