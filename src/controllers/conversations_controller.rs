use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::unauthorized,
    models::{Conversation, CurrentUser},
    services::conversation_service,
    AppState,
};

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "conversation not found" }))).into_response()
}

fn server_error(ctx: &str, e: &str) -> Response {
    tracing::error!(error = %e, "[{ctx}] error");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "server error" }))).into_response()
}

async fn owned(state: &AppState, id: &str, user: &CurrentUser, ctx: &str) -> Result<Conversation, Response> {
    match conversation_service::find_owned(state, id, &user.id).await {
        Ok(Some(c)) => Ok(c),
        Ok(None) => Err(not_found()),
        Err(e) => Err(server_error(ctx, &e)),
    }
}

// GET /api/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match conversation_service::list_conversations(&state, &u.id).await {
        Ok(items) => (StatusCode::OK, Json(json!({ "conversations": items }))).into_response(),
        Err(e) => server_error("conversation list", &e),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationBody {
    pub title: Option<String>,
    pub from_message: Option<String>,
}

// POST /api/conversations
pub async fn create_conversation(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    body: Result<Json<CreateConversationBody>, JsonRejection>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    // an unreadable body just means no title was given
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let title = conversation_service::conversation_title(body.title.as_deref(), body.from_message.as_deref());

    match conversation_service::create_conversation(&state, &u.id, title).await {
        Ok(conv) => (
            StatusCode::CREATED,
            Json(json!({ "id": conv.id.to_hex(), "title": conv.title })),
        )
            .into_response(),
        Err(e) => server_error("conversation create", &e),
    }
}

// GET /api/conversations/:id
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let conv = match owned(&state, &id, &u, "conversation get").await {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match conversation_service::history(&state, &conv).await {
        Ok(history) => (
            StatusCode::OK,
            Json(json!({ "id": conv.id.to_hex(), "title": conv.title, "history": history })),
        )
            .into_response(),
        Err(e) => server_error("conversation get", &e),
    }
}

// DELETE /api/conversations/:id
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let conv = match owned(&state, &id, &u, "conversation delete").await {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    if let Err(e) = conversation_service::delete_conversation(&state, &conv).await {
        return server_error("conversation delete", &e);
    }

    (StatusCode::OK, Json(json!({ "success": true }))).into_response()
}
