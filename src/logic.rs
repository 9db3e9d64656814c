//! Core request pipeline shared by the HTTP handlers.
//!
//! One explain request runs: snippet resolve (create or update), bundle
//! generation (model path with its own fallbacks), write sequencing, response
//! composition. Past the authorization/validation gate nothing is allowed to
//! fail outward; `generate_and_persist` absorbs late failures into a
//! last-resort response built from the heuristic generator.

use tracing::{error, instrument};
use uuid::Uuid;

use crate::domain::{ReadingLevel, Snippet, SnippetStatus};
use crate::heuristic;
use crate::model;
use crate::persist;
use crate::protocol::ExplainOut;
use crate::state::AppState;
use crate::store::{NewSnippet, SnippetPatch, StoreError};

/// Inputs to one generation request, after the gate checks.
#[derive(Clone, Debug)]
pub struct ExplainRequest {
  pub snippet_id: Option<String>,
  pub title: Option<String>,
  pub language: String,
  pub code: String,
  pub reading_level: ReadingLevel,
}

impl ExplainRequest {
  fn title_or_default(&self) -> String {
    self.title.clone().unwrap_or_else(|| "Untitled snippet".into())
  }
}

/// Handle one explain request end to end. Total: every failure past the gates
/// resolves to a usable body.
#[instrument(
  level = "info",
  skip(state, req),
  fields(%owner, has_snippet_id = req.snippet_id.is_some(), language = %req.language, code_len = req.code.len())
)]
pub async fn generate_and_persist(state: &AppState, owner: &str, req: &ExplainRequest) -> ExplainOut {
  match run_pipeline(state, owner, req).await {
    Ok(out) => out,
    Err(e) => {
      error!(target: "explain", error = %e, "Pipeline failed before content generation; serving last-resort response");
      last_resort_response(owner, req)
    }
  }
}

/// The happy-path sequence. Only the snippet resolve step can return an error;
/// generation and persistence absorb their own failures.
async fn run_pipeline(
  state: &AppState,
  owner: &str,
  req: &ExplainRequest,
) -> Result<ExplainOut, StoreError> {
  let pending = resolve_snippet(state, owner, req).await?;

  let bundle = model::generate_bundle(
    state.model.as_ref(),
    &state.prompts,
    &req.code,
    &req.language,
    req.reading_level,
  )
  .await;

  let outcome = persist::persist_bundle(state.store.as_ref(), owner, &pending.id, &bundle).await;
  Ok(persist::compose_response(outcome, &pending, &bundle))
}

/// Create the snippet row, or rewrite the addressed one scoped to its owner. A
/// row owned by someone else behaves exactly like a missing row.
async fn resolve_snippet(
  state: &AppState,
  owner: &str,
  req: &ExplainRequest,
) -> Result<Snippet, StoreError> {
  match &req.snippet_id {
    Some(id) => {
      let patch = SnippetPatch {
        title: req.title.clone(),
        language: req.language.clone(),
        code: req.code.clone(),
        status: SnippetStatus::Pending,
      };
      state.store.update_pending(owner, id, &patch).await
    }
    None => {
      let new = NewSnippet {
        owner: owner.to_string(),
        title: req.title_or_default(),
        language: req.language.clone(),
        code: req.code.clone(),
        status: SnippetStatus::Pending,
      };
      state.store.insert_pending(&new).await
    }
  }
}

/// Storage-independent response: a heuristic bundle over a synthetic snippet
/// row. Served when the request never reached a writable store row.
pub fn last_resort_response(owner: &str, req: &ExplainRequest) -> ExplainOut {
  let bundle = heuristic::generate(&req.code, &req.language, req.reading_level);
  let snippet = Snippet {
    id: req
      .snippet_id
      .clone()
      .unwrap_or_else(|| format!("temp_{}", Uuid::new_v4())),
    owner: owner.to_string(),
    title: req.title_or_default(),
    language: req.language.clone(),
    code: req.code.clone(),
    status: SnippetStatus::Ready,
    explanation: Some(bundle.explanation.clone()),
    diagram: Some(bundle.diagram.clone()),
    trace: Some(bundle.trace.clone()),
  };
  let quizzes = persist::temp_quiz_records(&snippet.id, &bundle);
  ExplainOut { snippet, quizzes }
}

/// Owner-scoped read of one snippet and its quizzes. A quiz listing failure
/// degrades to an empty set rather than failing the read.
#[instrument(level = "info", skip(state), fields(%owner, %id))]
pub async fn fetch_package(
  state: &AppState,
  owner: &str,
  id: &str,
) -> Result<Option<ExplainOut>, StoreError> {
  let Some(snippet) = state.store.fetch_snippet(owner, id).await? else {
    return Ok(None);
  };
  let quizzes = match state.store.quizzes_for(id).await {
    Ok(q) => q,
    Err(e) => {
      error!(target: "explain", %id, error = %e, "Quiz list failed; returning snippet with empty quiz set");
      Vec::new()
    }
  };
  Ok(Some(ExplainOut { snippet, quizzes }))
}
