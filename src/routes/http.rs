//! HTTP endpoint handlers. These are thin wrappers around the core pipeline:
//! they run the authorization and validation gates, then forward. Past the
//! gates the explain endpoint always answers 200.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  http::{header::AUTHORIZATION, HeaderMap, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use tracing::{error, info, instrument};

use crate::domain::ReadingLevel;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

/// Token as sent, with a `Bearer ` prefix stripped when present. `None` only
/// when the header itself is missing or unreadable.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
  let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
  Some(value.strip_prefix("Bearer ").unwrap_or(value).to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response {
  (status, Json(ErrorOut { error: message.into() })).into_response()
}

#[instrument(level = "info", skip(state, headers, body), fields(has_snippet_id = body.snippet_id.is_some()))]
pub async fn http_post_explain(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(body): Json<ExplainIn>,
) -> Response {
  let Some(token) = bearer_token(&headers) else {
    return error_response(StatusCode::UNAUTHORIZED, "Missing authorization header");
  };
  let identity = match state.identity.verify(&token).await {
    Ok(v) => v,
    Err(e) => {
      info!(target: "codesplain_backend", error = %e, "Token rejected");
      return error_response(StatusCode::UNAUTHORIZED, "Invalid token");
    }
  };

  let code = body.code.clone().unwrap_or_default();
  let language = body.language.clone().unwrap_or_default();
  if code.is_empty() || language.is_empty() {
    return error_response(StatusCode::BAD_REQUEST, "Missing required fields: code, language");
  }

  // Empty-string ids and titles count as absent, like the other optionals.
  let req = ExplainRequest {
    snippet_id: body.snippet_id.clone().filter(|s| !s.is_empty()),
    title: body.title.clone().filter(|s| !s.is_empty()),
    language,
    code,
    reading_level: ReadingLevel::from_code(body.reading_level.as_deref()),
  };

  let out = generate_and_persist(&state, &identity.user_id, &req).await;
  info!(target: "explain", snippet_id = %out.snippet.id, quiz_count = out.quizzes.len(), "HTTP explain served");
  (StatusCode::OK, Json(out)).into_response()
}

#[instrument(level = "info", skip(state, headers), fields(%id))]
pub async fn http_get_snippet(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  headers: HeaderMap,
) -> Response {
  let Some(token) = bearer_token(&headers) else {
    return error_response(StatusCode::UNAUTHORIZED, "Missing authorization header");
  };
  let identity = match state.identity.verify(&token).await {
    Ok(v) => v,
    Err(e) => {
      info!(target: "codesplain_backend", error = %e, "Token rejected");
      return error_response(StatusCode::UNAUTHORIZED, "Invalid token");
    }
  };

  match fetch_package(&state, &identity.user_id, &id).await {
    Ok(Some(out)) => (StatusCode::OK, Json(out)).into_response(),
    Ok(None) => error_response(StatusCode::NOT_FOUND, "Snippet not found"),
    Err(e) => {
      error!(target: "codesplain_backend", %id, error = %e, "Snippet read failed");
      error_response(StatusCode::BAD_GATEWAY, "Store unavailable")
    }
  }
}
