//! Row-level access to the snippets and quizzes tables.
//!
//! The trait is the seam used by the request pipeline and by tests; the
//! `RestStore` implementation speaks a PostgREST-style HTTP dialect: `eq.`
//! filters in the query string and `Prefer: return=representation` to get the
//! affected rows back. No transaction ever spans the two tables; callers
//! sequence writes and tolerate partial failure.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::config::StoreConfig;
use crate::domain::{Difficulty, ExecutionTrace, QuizRecord, Snippet, SnippetStatus};
use crate::util::trunc_for_log;

/// Errors surfaced by the row store.
#[derive(Debug, Error)]
pub enum StoreError {
  /// No row matched the id/owner scope. Rows owned by someone else look
  /// exactly like missing rows.
  #[error("row not found")]
  NotFound,

  /// The request never produced an HTTP response.
  #[error("transport error: {0}")]
  Transport(String),

  /// The store answered with a non-success status.
  #[error("store HTTP {status}: {body}")]
  Status { status: u16, body: String },

  /// A response arrived but could not be decoded into the expected rows.
  #[error("payload error: {0}")]
  Payload(String),
}

/// Fields for a brand-new snippet row. The store assigns the id.
#[derive(Clone, Debug, Serialize)]
pub struct NewSnippet {
  pub owner: String,
  pub title: String,
  pub language: String,
  pub code: String,
  pub status: SnippetStatus,
}

/// Fields rewritten on an existing row when a new generation request arrives.
#[derive(Clone, Debug, Serialize)]
pub struct SnippetPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  pub language: String,
  pub code: String,
  pub status: SnippetStatus,
}

/// Generated content written back onto a snippet row, flipping it to ready.
#[derive(Clone, Debug, Serialize)]
pub struct ResultWrite {
  pub explanation: String,
  pub diagram: String,
  pub trace: ExecutionTrace,
  pub status: SnippetStatus,
}

/// Quiz row to insert; the store assigns the id.
#[derive(Clone, Debug, Serialize)]
pub struct NewQuiz {
  pub snippet_id: String,
  pub question: String,
  pub choices: Vec<String>,
  pub answer: String,
  pub hint: String,
  pub difficulty: Difficulty,
}

/// Store interface used by the request pipeline.
#[async_trait]
pub trait SnippetStore: Send + Sync {
  /// Insert a new pending snippet; returns the row with its assigned id.
  async fn insert_pending(&self, new: &NewSnippet) -> Result<Snippet, StoreError>;

  /// Rewrite an existing row and reset it to pending, scoped to `owner`.
  async fn update_pending(
    &self,
    owner: &str,
    id: &str,
    patch: &SnippetPatch,
  ) -> Result<Snippet, StoreError>;

  /// Write generated content onto the row and set status to ready.
  async fn store_result(
    &self,
    owner: &str,
    id: &str,
    write: &ResultWrite,
  ) -> Result<Snippet, StoreError>;

  /// Remove every quiz currently attached to the snippet.
  async fn delete_quizzes_for(&self, snippet_id: &str) -> Result<(), StoreError>;

  /// Insert the replacement quiz set; returns rows with store-assigned ids.
  async fn insert_quizzes(&self, quizzes: &[NewQuiz]) -> Result<Vec<QuizRecord>, StoreError>;

  /// Fetch one snippet scoped to its owner.
  async fn fetch_snippet(&self, owner: &str, id: &str) -> Result<Option<Snippet>, StoreError>;

  /// All quizzes attached to a snippet.
  async fn quizzes_for(&self, snippet_id: &str) -> Result<Vec<QuizRecord>, StoreError>;
}

#[derive(Clone)]
pub struct RestStore {
  client: reqwest::Client,
  base_url: String,
  service_key: String,
}

impl RestStore {
  /// Build the HTTP client. No request timeout is set here; worst-case
  /// suspension is bounded by the transport layer.
  pub fn new(cfg: &StoreConfig) -> Result<Self, StoreError> {
    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| StoreError::Transport(e.to_string()))?;
    Ok(Self {
      client,
      base_url: cfg.base_url.clone(),
      service_key: cfg.service_key.clone(),
    })
  }

  fn table_url(&self, table: &str) -> String {
    format!("{}/rest/v1/{}", self.base_url, table)
  }

  /// Service-role credentials. Row scoping happens through explicit owner
  /// filters, not through the store's own policy layer.
  fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    req
      .header("apikey", &self.service_key)
      .header(AUTHORIZATION, format!("Bearer {}", self.service_key))
  }

  async fn read_rows<T: DeserializeOwned>(res: reqwest::Response) -> Result<Vec<T>, StoreError> {
    let status = res.status();
    if !status.is_success() {
      let body = trunc_for_log(&res.text().await.unwrap_or_default(), 300);
      return Err(StoreError::Status { status: status.as_u16(), body });
    }
    res.json::<Vec<T>>().await.map_err(|e| StoreError::Payload(e.to_string()))
  }

  /// Representation responses carry the affected rows; an empty array means no
  /// row matched the filters.
  fn sole_row<T>(mut rows: Vec<T>) -> Result<T, StoreError> {
    if rows.is_empty() {
      return Err(StoreError::NotFound);
    }
    Ok(rows.swap_remove(0))
  }
}

#[async_trait]
impl SnippetStore for RestStore {
  async fn insert_pending(&self, new: &NewSnippet) -> Result<Snippet, StoreError> {
    let res = self
      .authed(self.client.post(self.table_url("snippets")))
      .header("Prefer", "return=representation")
      .json(new)
      .send()
      .await
      .map_err(|e| StoreError::Transport(e.to_string()))?;
    Self::sole_row(Self::read_rows::<Snippet>(res).await?)
  }

  async fn update_pending(
    &self,
    owner: &str,
    id: &str,
    patch: &SnippetPatch,
  ) -> Result<Snippet, StoreError> {
    let res = self
      .authed(self.client.patch(self.table_url("snippets")))
      .query(&[("id", format!("eq.{id}")), ("owner", format!("eq.{owner}"))])
      .header("Prefer", "return=representation")
      .json(patch)
      .send()
      .await
      .map_err(|e| StoreError::Transport(e.to_string()))?;
    Self::sole_row(Self::read_rows::<Snippet>(res).await?)
  }

  async fn store_result(
    &self,
    owner: &str,
    id: &str,
    write: &ResultWrite,
  ) -> Result<Snippet, StoreError> {
    let res = self
      .authed(self.client.patch(self.table_url("snippets")))
      .query(&[("id", format!("eq.{id}")), ("owner", format!("eq.{owner}"))])
      .header("Prefer", "return=representation")
      .json(write)
      .send()
      .await
      .map_err(|e| StoreError::Transport(e.to_string()))?;
    Self::sole_row(Self::read_rows::<Snippet>(res).await?)
  }

  async fn delete_quizzes_for(&self, snippet_id: &str) -> Result<(), StoreError> {
    let res = self
      .authed(self.client.delete(self.table_url("quizzes")))
      .query(&[("snippet_id", format!("eq.{snippet_id}"))])
      .send()
      .await
      .map_err(|e| StoreError::Transport(e.to_string()))?;
    let status = res.status();
    if !status.is_success() {
      let body = trunc_for_log(&res.text().await.unwrap_or_default(), 300);
      return Err(StoreError::Status { status: status.as_u16(), body });
    }
    Ok(())
  }

  async fn insert_quizzes(&self, quizzes: &[NewQuiz]) -> Result<Vec<QuizRecord>, StoreError> {
    let res = self
      .authed(self.client.post(self.table_url("quizzes")))
      .header("Prefer", "return=representation")
      .json(&quizzes)
      .send()
      .await
      .map_err(|e| StoreError::Transport(e.to_string()))?;
    Self::read_rows::<QuizRecord>(res).await
  }

  async fn fetch_snippet(&self, owner: &str, id: &str) -> Result<Option<Snippet>, StoreError> {
    let res = self
      .authed(self.client.get(self.table_url("snippets")))
      .query(&[("id", format!("eq.{id}")), ("owner", format!("eq.{owner}"))])
      .send()
      .await
      .map_err(|e| StoreError::Transport(e.to_string()))?;
    let mut rows = Self::read_rows::<Snippet>(res).await?;
    if rows.is_empty() {
      return Ok(None);
    }
    Ok(Some(rows.swap_remove(0)))
  }

  async fn quizzes_for(&self, snippet_id: &str) -> Result<Vec<QuizRecord>, StoreError> {
    let res = self
      .authed(self.client.get(self.table_url("quizzes")))
      .query(&[("snippet_id", format!("eq.{snippet_id}"))])
      .send()
      .await
      .map_err(|e| StoreError::Transport(e.to_string()))?;
    Self::read_rows::<QuizRecord>(res).await
  }
}
