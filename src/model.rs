//! Minimal client for an OpenAI-compatible chat completion endpoint.
//!
//! We make exactly one call per explain request and demand a strict JSON object
//! back. Calls are instrumented and log model names, latencies, and response
//! sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::config::{ModelConfig, Prompts};
use crate::domain::{ContentBundle, Difficulty, ExecutionTrace, QuizItem, ReadingLevel, TraceStep};
use crate::heuristic;
use crate::util::{fill_template, trunc_for_log};

/// Model-side failure classification. Every variant resolves to the same
/// heuristic fallback; the split exists for the logs.
#[derive(Debug, Error)]
pub enum ModelError {
  #[error("transport: {0}")]
  Network(String),
  #[error("HTTP {status}: {message}")]
  Status { status: u16, message: String },
  #[error("response parse: {0}")]
  Parse(String),
  #[error("bundle schema: {0}")]
  Schema(String),
}

impl ModelError {
  pub fn kind(&self) -> &'static str {
    match self {
      ModelError::Network(_) => "network",
      ModelError::Status { .. } => "status",
      ModelError::Parse(_) => "parse",
      ModelError::Schema(_) => "schema",
    }
  }
}

#[derive(Clone)]
pub struct ModelClient {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl ModelClient {
  /// Construct the client from explicit credentials. No request timeout is set
  /// here; worst-case suspension is bounded by the transport layer.
  pub fn new(cfg: &ModelConfig) -> Option<Self> {
    let client = reqwest::Client::builder().build().ok()?;
    Some(Self {
      client,
      api_key: cfg.api_key.clone(),
      base_url: cfg.base_url.clone(),
      model: cfg.model.clone(),
    })
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<T, ModelError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "codesplain-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| ModelError::Network(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_model_error(&body).unwrap_or_else(|| trunc_for_log(&body, 300));
      return Err(ModelError::Status { status, message });
    }

    let body: ChatCompletionResponse =
      res.json().await.map_err(|e| ModelError::Parse(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Model usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();

    serde_json::from_str::<T>(&text).map_err(|e| ModelError::Parse(e.to_string()))
  }

  /// One completion call producing a full bundle, structure-checked before it
  /// is accepted.
  #[instrument(
    level = "info",
    skip(self, prompts, code),
    fields(model = %self.model, %language, reading_level = level.as_code(), code_len = code.len())
  )]
  pub async fn request_bundle(
    &self,
    prompts: &Prompts,
    code: &str,
    language: &str,
    level: ReadingLevel,
  ) -> Result<ContentBundle, ModelError> {
    let system = fill_template(
      &prompts.explain_system_template,
      &[("reading_level", level.register())],
    );
    let user = fill_template(
      &prompts.explain_user_template,
      &[("language", language), ("code", code)],
    );
    let bundle: ContentBundle = self.chat_json(&system, &user, 0.2).await?;
    bundle.validate().map_err(ModelError::Schema)?;
    Ok(bundle)
  }
}

/// Produce a bundle through the model when one is configured, falling back to
/// the keyword generator on any model-side failure. Total: always returns a
/// valid bundle.
pub async fn generate_bundle(
  model: Option<&ModelClient>,
  prompts: &Prompts,
  code: &str,
  language: &str,
  level: ReadingLevel,
) -> ContentBundle {
  let Some(client) = model else {
    info!(target: "explain", "Model not configured; serving mock bundle");
    return mock_bundle();
  };

  let start = std::time::Instant::now();
  let result = client.request_bundle(prompts, code, language, level).await;
  let elapsed = start.elapsed();

  match result {
    Ok(bundle) => {
      info!(target: "explain", ?elapsed, quizzes = bundle.quizzes.len(), "Model bundle received");
      bundle
    }
    Err(e) => {
      error!(target: "explain", ?elapsed, kind = e.kind(), error = %e, "Model generation failed; using heuristic fallback");
      heuristic::generate(code, language, level)
    }
  }
}

/// Fixed development-mode bundle served when no credential is configured.
/// Distinct from the heuristic output so "not wired up" and "failed" are
/// distinguishable in responses.
pub fn mock_bundle() -> ContentBundle {
  let mut vars = std::collections::BTreeMap::new();
  vars.insert("x".to_string(), serde_json::json!(1));
  ContentBundle {
    explanation: "This code uses variables to store data and control structures to decide which steps run next. This is a development placeholder; configure a model credential to get an explanation tailored to your code and reading level.".into(),
    diagram: "flowchart TD\n    Start([Start]) --> Mock[Placeholder explanation served]\n    Mock --> End([End])".into(),
    trace: ExecutionTrace {
      input: "mock_input".into(),
      steps: vec![TraceStep { line: 1, variables: vars }],
    },
    quizzes: vec![
      QuizItem {
        question: "What is a variable?".into(),
        choices: vec![
          "A named place to store a value".into(),
          "A type of loop".into(),
          "A picture".into(),
          "A computer".into(),
        ],
        answer: "A named place to store a value".into(),
        hint: "Think of a labeled box.".into(),
        difficulty: Difficulty::Easy,
      },
      QuizItem {
        question: "What does a loop do?".into(),
        choices: vec![
          "Repeats a block of steps".into(),
          "Stops the program".into(),
          "Renames a file".into(),
          "Draws a chart".into(),
        ],
        answer: "Repeats a block of steps".into(),
        hint: "Loops run the same lines again.".into(),
        difficulty: Difficulty::Medium,
      },
      QuizItem {
        question: "Predict the output: print(1 + 1)".into(),
        choices: vec!["2".into(), "11".into(), "1 + 1".into(), "An error".into()],
        answer: "2".into(),
        hint: "The plus sign adds numbers.".into(),
        difficulty: Difficulty::Hard,
      },
    ],
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from a model provider error body.
fn extract_model_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
