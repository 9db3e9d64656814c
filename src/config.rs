//! Runtime configuration: environment assembly plus optional prompt overrides
//! loaded from TOML.
//!
//! See `AppConfig` and `Prompts` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

/// Everything the server needs at startup. Built once in `main` and handed to
/// `AppState::new`.
#[derive(Clone, Debug)]
pub struct AppConfig {
  pub port: u16,
  /// Model credentials. `None` disables the model path entirely; generation then
  /// always uses the mock bundle.
  pub model: Option<ModelConfig>,
  pub store: StoreConfig,
  pub prompts: Prompts,
}

#[derive(Clone, Debug)]
pub struct ModelConfig {
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

/// Connection details shared by the row store and the identity endpoint, which
/// live under one base URL.
#[derive(Clone, Debug)]
pub struct StoreConfig {
  pub base_url: String,
  pub service_key: String,
}

impl AppConfig {
  /// Assemble configuration from the environment. Only the model credentials are
  /// truly optional; everything else falls back to a local default.
  pub fn from_env() -> Self {
    let port = std::env::var("PORT")
      .ok()
      .and_then(|p| p.parse().ok())
      .unwrap_or(3000);
    let model = ModelConfig::from_env();
    let store = StoreConfig::from_env();
    let prompts = load_prompts_from_env().unwrap_or_default();
    Self { port, model, store, prompts }
  }
}

impl ModelConfig {
  /// Present only if OPENAI_API_KEY is set.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    Some(Self { api_key, base_url, model })
  }
}

impl StoreConfig {
  pub fn from_env() -> Self {
    let base_url =
      std::env::var("STORE_URL").unwrap_or_else(|_| "http://localhost:54321".into());
    let service_key = std::env::var("STORE_SERVICE_KEY").unwrap_or_default();
    Self { base_url, service_key }
  }
}

/// Prompts used by the model client. Defaults produce the strict JSON bundle the
/// response parser expects; override them in TOML to tune tone or structure.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  pub explain_system_template: String,
  pub explain_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      explain_system_template: "You are a patient programming teacher writing for {reading_level}. Respond ONLY with a strict JSON object. No markdown fences, no commentary outside the JSON.".into(),
      explain_user_template: "Explain the following {language} code for the audience above.\nReturn JSON with fields: explanation (string), diagram (string containing a Mermaid 'flowchart TD' with short node labels and directed edges), trace (object: input string, steps array of objects with 1-based line number and a variables map), quizzes (array of EXACTLY 3 objects: question, choices (4 distinct strings), answer (copied verbatim from choices), hint, difficulty one of easy|medium|hard). Make 2 quizzes multiple-choice comprehension and 1 predict-the-output.\n\nCode:\n{code}".into(),
    }
  }
}

#[derive(Clone, Debug, Deserialize, Default)]
struct TomlConfig {
  #[serde(default)]
  prompts: Prompts,
}

/// Attempt to load prompt overrides from CODESPLAIN_CONFIG_PATH. On any
/// parsing/IO error, returns None and the defaults stay in effect.
pub fn load_prompts_from_env() -> Option<Prompts> {
  let path = std::env::var("CODESPLAIN_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<TomlConfig>(&s) {
      Ok(cfg) => {
        info!(target: "codesplain_backend", %path, "Loaded prompt config (TOML)");
        Some(cfg.prompts)
      }
      Err(e) => {
        error!(target: "codesplain_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "codesplain_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
