//! Public request/response structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and clients independently.

use serde::{Deserialize, Serialize};

use crate::domain::{QuizRecord, Snippet};

/// Body of POST /api/v1/explain. `code` and `language` are required but kept
/// optional here so the missing-field rejection stays in our hands instead of
/// the JSON extractor's.
#[derive(Clone, Debug, Deserialize)]
pub struct ExplainIn {
    pub snippet_id: Option<String>,
    pub title: Option<String>,
    pub language: Option<String>,
    pub code: Option<String>,
    pub reading_level: Option<String>,
}

/// Success body for both explain and snippet read: the best-available snippet
/// row plus its quiz records. Quiz ids may be store-assigned or temporary
/// (`temp_<n>`) depending on how far persistence got.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExplainOut {
    pub snippet: Snippet,
    pub quizzes: Vec<QuizRecord>,
}

/// Error body for the authorization/validation gates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
