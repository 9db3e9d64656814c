//! Domain models used by the backend: reading levels, generated content bundles,
//! and the persisted snippet/quiz entities.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Audience selector controlling the explanation's tone and vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadingLevel {
  #[serde(rename = "12")]
  Age12,
  #[serde(rename = "15")]
  Age15,
  #[serde(rename = "cs1")]
  Cs1,
  #[serde(rename = "pro")]
  Pro,
}

impl Default for ReadingLevel {
  fn default() -> Self { ReadingLevel::Age12 }
}

impl ReadingLevel {
  /// Lenient parse used at the request boundary. Unknown or missing values fall
  /// back to the youngest audience instead of rejecting the request.
  pub fn from_code(code: Option<&str>) -> Self {
    match code {
      Some("12") => ReadingLevel::Age12,
      Some("15") => ReadingLevel::Age15,
      Some("cs1") => ReadingLevel::Cs1,
      Some("pro") => ReadingLevel::Pro,
      _ => ReadingLevel::default(),
    }
  }

  pub fn as_code(&self) -> &'static str {
    match self {
      ReadingLevel::Age12 => "12",
      ReadingLevel::Age15 => "15",
      ReadingLevel::Cs1 => "cs1",
      ReadingLevel::Pro => "pro",
    }
  }

  /// Audience description interpolated into the model system prompt.
  pub fn register(&self) -> &'static str {
    match self {
      ReadingLevel::Age12 => "a curious 12-year-old: short sentences and one friendly everyday analogy",
      ReadingLevel::Age15 => "a 15-year-old: plain language, define any term of art in a few words",
      ReadingLevel::Cs1 => "a first-semester CS student: correct terminology, introduced gently",
      ReadingLevel::Pro => "a professional developer new to this language: concise and technical",
    }
  }
}

/// Quiz difficulty tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

/// Snippet lifecycle: `pending` while a generation request is in flight, `ready`
/// once the result fields have been written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnippetStatus {
  Pending,
  Ready,
}

/// One observed execution step: a 1-based source line and the variable bindings
/// visible after it ran.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
  pub line: u32,
  pub variables: BTreeMap<String, serde_json::Value>,
}

/// Execution trace attached to an explanation. Steps are in execution order and
/// may be empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
  pub input: String,
  pub steps: Vec<TraceStep>,
}

/// One quiz question. `answer` must be one of `choices`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuizItem {
  pub question: String,
  pub choices: Vec<String>,
  pub answer: String,
  pub hint: String,
  pub difficulty: Difficulty,
}

/// The four-part payload produced per request by either generator. The diagram is
/// Mermaid `flowchart TD` text: short node labels, directed edges, optional
/// `|branch|` edge labels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentBundle {
  pub explanation: String,
  pub diagram: String,
  pub trace: ExecutionTrace,
  pub quizzes: Vec<QuizItem>,
}

impl ContentBundle {
  /// Deterministic structure validation applied to model output before accepting
  /// it. The heuristic generator satisfies these checks by construction.
  pub fn validate(&self) -> Result<(), String> {
    if self.explanation.trim().is_empty() {
      return Err("explanation is empty".into());
    }
    if self.diagram.trim().is_empty() {
      return Err("diagram is empty".into());
    }
    if self.quizzes.len() != 3 {
      return Err(format!("expected exactly 3 quizzes, got {}", self.quizzes.len()));
    }
    for (i, q) in self.quizzes.iter().enumerate() {
      if q.question.trim().is_empty() {
        return Err(format!("quiz {i}: question is empty"));
      }
      if q.choices.len() < 2 {
        return Err(format!("quiz {i}: needs at least 2 choices, got {}", q.choices.len()));
      }
      let unique: HashSet<&str> = q.choices.iter().map(String::as_str).collect();
      if unique.len() != q.choices.len() {
        return Err(format!("quiz {i}: choices are not unique"));
      }
      if !q.choices.iter().any(|c| *c == q.answer) {
        return Err(format!("quiz {i}: answer is not among the choices"));
      }
    }
    for (i, step) in self.trace.steps.iter().enumerate() {
      if step.line == 0 {
        return Err(format!("trace step {i}: line numbers are 1-based"));
      }
    }
    Ok(())
  }
}

/// Persisted snippet row: one submitted piece of code plus its generated teaching
/// material. Result fields stay empty until a bundle has been computed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
  pub id: String,
  pub owner: String,
  pub title: String,
  pub language: String,
  pub code: String,
  pub status: SnippetStatus,
  #[serde(default)]
  pub explanation: Option<String>,
  #[serde(default)]
  pub diagram: Option<String>,
  #[serde(default)]
  pub trace: Option<ExecutionTrace>,
}

/// Persisted quiz row, owned by exactly one snippet. The whole set for a snippet
/// is replaced wholesale on each generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuizRecord {
  pub id: String,
  pub snippet_id: String,
  pub question: String,
  pub choices: Vec<String>,
  pub answer: String,
  pub hint: String,
  pub difficulty: Difficulty,
}
