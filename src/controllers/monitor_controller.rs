use axum::{
    extract::{rejection::JsonRejection, Extension, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::unauthorized,
    models::{CurrentUser, StartMonitor, ThresholdRule},
    services::conversation_service,
    AppState,
};

fn error_json(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(json!({ "error": msg.into() }))).into_response()
}

fn server_error(ctx: &str, e: &str) -> Response {
    tracing::error!(error = %e, "[{ctx}] error");
    error_json(StatusCode::INTERNAL_SERVER_ERROR, "server error")
}

/// Resolve the conversation for `user`, or the response to return instead.
async fn owned_conversation(
    state: &AppState,
    conversation_id: &str,
    user: &CurrentUser,
    ctx: &str,
) -> Result<(), Response> {
    match conversation_service::find_owned(state, conversation_id, &user.id).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(error_json(StatusCode::NOT_FOUND, "conversation not found")),
        Err(e) => Err(server_error(ctx, &e)),
    }
}

#[derive(Debug, Deserialize)]
pub struct RuleBody {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub value: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMonitorBody {
    pub conversation_id: Option<String>,
    pub ticker: Option<String>,
    pub rule: Option<RuleBody>,
    pub interval_seconds: Option<f64>,
    pub duration_minutes: Option<f64>,
}

// POST /api/monitor/start
pub async fn post_start_monitor(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    body: Result<Json<StartMonitorBody>, JsonRejection>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let Ok(Json(body)) = body else {
        return error_json(StatusCode::BAD_REQUEST, "invalid JSON body");
    };

    let conversation_id = body.conversation_id.unwrap_or_default();
    let ticker = body.ticker.unwrap_or_default();
    let (kind, value) = match body.rule {
        Some(RuleBody { kind: Some(k), value: Some(v) }) => (k, v),
        _ => (String::new(), f64::NAN),
    };

    if conversation_id.trim().is_empty() || ticker.trim().is_empty() || kind.is_empty() {
        return error_json(
            StatusCode::BAD_REQUEST,
            "Invalid parameters: conversationId, ticker, rule{type,value} are required",
        );
    }

    let rule = match ThresholdRule::from_parts(&kind, value) {
        Ok(r) => r,
        Err(e) => return error_json(StatusCode::BAD_REQUEST, e.to_string()),
    };

    if let Err(resp) = owned_conversation(&state, &conversation_id, &u, "monitor start").await {
        return resp;
    }

    let params = StartMonitor {
        conversation_id,
        user_id: u.id,
        notify_target: u.email,
        ticker,
        rule,
        poll_interval_seconds: body.interval_seconds,
        duration_minutes: body.duration_minutes,
    };

    match state.monitor.start(params).await {
        Ok(handle) => (
            StatusCode::OK,
            Json(json!({ "success": true, "task": handle.snapshot() })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": e.to_string() })),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopMonitorBody {
    pub conversation_id: Option<String>,
    pub task_id: Option<String>,
}

// POST /api/monitor/stop
pub async fn post_stop_monitor(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    body: Result<Json<StopMonitorBody>, JsonRejection>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let Ok(Json(body)) = body else {
        return error_json(StatusCode::BAD_REQUEST, "invalid JSON body");
    };

    let Some(conversation_id) = body.conversation_id.filter(|c| !c.trim().is_empty()) else {
        return error_json(StatusCode::BAD_REQUEST, "missing conversationId");
    };

    if let Err(resp) = owned_conversation(&state, &conversation_id, &u, "monitor stop").await {
        return resp;
    }

    let task_id = body.task_id.filter(|t| !t.trim().is_empty());
    let stopped = state.monitor.stop(&conversation_id, task_id.as_deref());

    (StatusCode::OK, Json(json!({ "success": true, "stopped": stopped }))).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub conversation_id: Option<String>,
}

// GET /api/monitor/status?conversationId=...
pub async fn get_monitor_status(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Query(q): Query<StatusQuery>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let Some(conversation_id) = q.conversation_id.filter(|c| !c.trim().is_empty()) else {
        return error_json(StatusCode::BAD_REQUEST, "missing conversationId");
    };

    if let Err(resp) = owned_conversation(&state, &conversation_id, &u, "monitor status").await {
        return resp;
    }

    let tasks = state.monitor.list_tasks(&conversation_id);
    (StatusCode::OK, Json(json!({ "success": true, "tasks": tasks }))).into_response()
}
