use axum::{
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{models::CurrentUser, AppState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    // user id
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    // expiry (unix timestamp seconds)
    pub exp: usize,
}

impl From<Claims> for CurrentUser {
    fn from(c: Claims) -> Self {
        CurrentUser {
            id: c.id,
            name: c.name,
            email: c.email,
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Decode and validate a bearer token signed with `secret`.
pub fn decode_user(token: &str, secret: &str) -> Option<CurrentUser> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .ok()
        .map(|data| CurrentUser::from(data.claims))
}

pub async fn inject_current_user(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let user = bearer_token(req.headers()).and_then(|t| decode_user(t, &state.settings.jwt_secret));

    if let Some(user) = user {
        // Store user in request extensions so handlers can access it
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}

fn is_public_path(path: &str) -> bool {
    path == "/favicon.ico" || path == "/health" || path.starts_with("/health/")
}

pub fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response()
}

pub async fn require_auth(
    State(_state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if is_public_path(req.uri().path()) {
        return next.run(req).await;
    }

    // If inject_current_user already put CurrentUser in extensions => authenticated
    if req.extensions().get::<CurrentUser>().is_some() {
        return next.run(req).await;
    }

    unauthorized()
}
