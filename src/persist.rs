//! Write sequencing for generated content.
//!
//! The sequence is result write, then quiz delete, then quiz insert, each step
//! independently fault tolerant. A failed step downgrades the freshness of the
//! identifiers in the response; it never turns into a request failure. The
//! outcome is an explicit state and the response is derived from it by a pure
//! function, so every downgrade path can be tested directly.

use tracing::{error, instrument};

use crate::domain::{ContentBundle, QuizRecord, Snippet, SnippetStatus};
use crate::protocol::ExplainOut;
use crate::store::{NewQuiz, ResultWrite, SnippetStore};

/// How far the write sequence got.
#[derive(Clone, Debug)]
pub enum PersistOutcome {
  /// The result write failed; the store still holds the pending row.
  NotPersisted,
  /// Result fields were written but the quiz replacement did not complete.
  ResultPersisted { snippet: Snippet },
  /// Both tables hold the new content.
  FullyPersisted { snippet: Snippet, quizzes: Vec<QuizRecord> },
}

/// Run the write sequence. Total: store failures are logged and folded into the
/// returned state.
#[instrument(level = "info", skip(store, bundle), fields(%snippet_id, quiz_count = bundle.quizzes.len()))]
pub async fn persist_bundle(
  store: &dyn SnippetStore,
  owner: &str,
  snippet_id: &str,
  bundle: &ContentBundle,
) -> PersistOutcome {
  let write = ResultWrite {
    explanation: bundle.explanation.clone(),
    diagram: bundle.diagram.clone(),
    trace: bundle.trace.clone(),
    status: SnippetStatus::Ready,
  };

  let snippet = match store.store_result(owner, snippet_id, &write).await {
    Ok(s) => s,
    Err(e) => {
      error!(target: "explain", %snippet_id, error = %e, "Result write failed; responding from memory");
      return PersistOutcome::NotPersisted;
    }
  };

  // Quizzes are replaced wholesale. If the delete fails we stop here rather
  // than inserting alongside the stale set.
  if let Err(e) = store.delete_quizzes_for(snippet_id).await {
    error!(target: "explain", %snippet_id, error = %e, "Quiz delete failed; keeping temporary quiz ids");
    return PersistOutcome::ResultPersisted { snippet };
  }

  let new_quizzes: Vec<NewQuiz> = bundle
    .quizzes
    .iter()
    .map(|q| NewQuiz {
      snippet_id: snippet_id.to_string(),
      question: q.question.clone(),
      choices: q.choices.clone(),
      answer: q.answer.clone(),
      hint: q.hint.clone(),
      difficulty: q.difficulty,
    })
    .collect();

  match store.insert_quizzes(&new_quizzes).await {
    Ok(records) => PersistOutcome::FullyPersisted { snippet, quizzes: records },
    Err(e) => {
      error!(target: "explain", %snippet_id, error = %e, "Quiz insert failed; keeping temporary quiz ids");
      PersistOutcome::ResultPersisted { snippet }
    }
  }
}

/// Quiz records with client-side temporary identifiers, used whenever the store
/// did not hand back real rows.
pub fn temp_quiz_records(snippet_id: &str, bundle: &ContentBundle) -> Vec<QuizRecord> {
  bundle
    .quizzes
    .iter()
    .enumerate()
    .map(|(i, q)| QuizRecord {
      id: format!("temp_{i}"),
      snippet_id: snippet_id.to_string(),
      question: q.question.clone(),
      choices: q.choices.clone(),
      answer: q.answer.clone(),
      hint: q.hint.clone(),
      difficulty: q.difficulty,
    })
    .collect()
}

/// Map a persistence outcome to the response body. Pure. `pending` is the row
/// as written before generation; it backs the response when the result write
/// never landed. Responses always present the content as ready: the generated
/// bundle is in the body regardless of what the store ended up holding.
pub fn compose_response(
  outcome: PersistOutcome,
  pending: &Snippet,
  bundle: &ContentBundle,
) -> ExplainOut {
  match outcome {
    PersistOutcome::NotPersisted => {
      let mut snippet = pending.clone();
      snippet.status = SnippetStatus::Ready;
      snippet.explanation = Some(bundle.explanation.clone());
      snippet.diagram = Some(bundle.diagram.clone());
      snippet.trace = Some(bundle.trace.clone());
      let quizzes = temp_quiz_records(&snippet.id, bundle);
      ExplainOut { snippet, quizzes }
    }
    PersistOutcome::ResultPersisted { snippet } => {
      let quizzes = temp_quiz_records(&snippet.id, bundle);
      ExplainOut { snippet, quizzes }
    }
    PersistOutcome::FullyPersisted { snippet, quizzes } => ExplainOut { snippet, quizzes },
  }
}
