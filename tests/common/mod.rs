//! Common test infrastructure: an in-memory snippet store with per-operation
//! failure switches, a static identity provider, and router request helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::util::ServiceExt;

use codesplain_backend::auth::{AuthError, Identity, IdentityProvider};
use codesplain_backend::config::Prompts;
use codesplain_backend::domain::{QuizRecord, Snippet, SnippetStatus};
use codesplain_backend::model::ModelClient;
use codesplain_backend::routes::build_router;
use codesplain_backend::state::AppState;
use codesplain_backend::store::{
    NewQuiz, NewSnippet, ResultWrite, SnippetPatch, SnippetStore, StoreError,
};

pub const TOKEN: &str = "good-token";
pub const USER: &str = "user-1";

/// In-memory store mirroring the row semantics the pipeline relies on: owner
/// scoping behaves like a filter (mismatch looks like a missing row) and
/// partial updates leave untouched columns alone. Failure switches force
/// individual operations to fail with a transport error.
#[derive(Default)]
pub struct MemoryStore {
    pub snippets: Mutex<HashMap<String, Snippet>>,
    pub quizzes: Mutex<HashMap<String, Vec<QuizRecord>>>,
    next_snippet: AtomicUsize,
    next_quiz: AtomicUsize,
    pub fail_writes: AtomicBool,
    pub fail_store_result: AtomicBool,
    pub fail_delete_quizzes: AtomicBool,
    pub fail_insert_quizzes: AtomicBool,
    pub fail_reads: AtomicBool,
    pub fail_list_quizzes: AtomicBool,
}

fn down() -> StoreError {
    StoreError::Transport("connection refused".into())
}

impl MemoryStore {
    pub fn seed_snippet(&self, s: Snippet) {
        self.snippets.lock().unwrap().insert(s.id.clone(), s);
    }

    pub fn seed_quizzes(&self, snippet_id: &str, quizzes: Vec<QuizRecord>) {
        self.quizzes.lock().unwrap().insert(snippet_id.to_string(), quizzes);
    }

    pub fn snippet(&self, id: &str) -> Option<Snippet> {
        self.snippets.lock().unwrap().get(id).cloned()
    }

    pub fn quiz_ids(&self, snippet_id: &str) -> Vec<String> {
        self.quizzes
            .lock()
            .unwrap()
            .get(snippet_id)
            .map(|qs| qs.iter().map(|q| q.id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn set(&self, flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }

    fn is_set(flag: &AtomicBool) -> bool {
        flag.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnippetStore for MemoryStore {
    async fn insert_pending(&self, new: &NewSnippet) -> Result<Snippet, StoreError> {
        if Self::is_set(&self.fail_writes) {
            return Err(down());
        }
        let id = format!("snip-{}", self.next_snippet.fetch_add(1, Ordering::SeqCst));
        let snippet = Snippet {
            id: id.clone(),
            owner: new.owner.clone(),
            title: new.title.clone(),
            language: new.language.clone(),
            code: new.code.clone(),
            status: new.status,
            explanation: None,
            diagram: None,
            trace: None,
        };
        self.snippets.lock().unwrap().insert(id, snippet.clone());
        Ok(snippet)
    }

    async fn update_pending(
        &self,
        owner: &str,
        id: &str,
        patch: &SnippetPatch,
    ) -> Result<Snippet, StoreError> {
        if Self::is_set(&self.fail_writes) {
            return Err(down());
        }
        let mut rows = self.snippets.lock().unwrap();
        let row = match rows.get_mut(id) {
            Some(r) if r.owner == owner => r,
            _ => return Err(StoreError::NotFound),
        };
        if let Some(title) = &patch.title {
            row.title = title.clone();
        }
        row.language = patch.language.clone();
        row.code = patch.code.clone();
        row.status = patch.status;
        Ok(row.clone())
    }

    async fn store_result(
        &self,
        owner: &str,
        id: &str,
        write: &ResultWrite,
    ) -> Result<Snippet, StoreError> {
        if Self::is_set(&self.fail_store_result) {
            return Err(down());
        }
        let mut rows = self.snippets.lock().unwrap();
        let row = match rows.get_mut(id) {
            Some(r) if r.owner == owner => r,
            _ => return Err(StoreError::NotFound),
        };
        row.explanation = Some(write.explanation.clone());
        row.diagram = Some(write.diagram.clone());
        row.trace = Some(write.trace.clone());
        row.status = write.status;
        Ok(row.clone())
    }

    async fn delete_quizzes_for(&self, snippet_id: &str) -> Result<(), StoreError> {
        if Self::is_set(&self.fail_delete_quizzes) {
            return Err(down());
        }
        self.quizzes.lock().unwrap().remove(snippet_id);
        Ok(())
    }

    async fn insert_quizzes(&self, quizzes: &[NewQuiz]) -> Result<Vec<QuizRecord>, StoreError> {
        if Self::is_set(&self.fail_insert_quizzes) {
            return Err(down());
        }
        let mut out = Vec::with_capacity(quizzes.len());
        let mut map = self.quizzes.lock().unwrap();
        for q in quizzes {
            let record = QuizRecord {
                id: format!("q-{}", self.next_quiz.fetch_add(1, Ordering::SeqCst)),
                snippet_id: q.snippet_id.clone(),
                question: q.question.clone(),
                choices: q.choices.clone(),
                answer: q.answer.clone(),
                hint: q.hint.clone(),
                difficulty: q.difficulty,
            };
            map.entry(q.snippet_id.clone()).or_default().push(record.clone());
            out.push(record);
        }
        Ok(out)
    }

    async fn fetch_snippet(&self, owner: &str, id: &str) -> Result<Option<Snippet>, StoreError> {
        if Self::is_set(&self.fail_reads) {
            return Err(down());
        }
        let rows = self.snippets.lock().unwrap();
        Ok(rows.get(id).filter(|r| r.owner == owner).cloned())
    }

    async fn quizzes_for(&self, snippet_id: &str) -> Result<Vec<QuizRecord>, StoreError> {
        if Self::is_set(&self.fail_list_quizzes) {
            return Err(down());
        }
        let map = self.quizzes.lock().unwrap();
        Ok(map.get(snippet_id).cloned().unwrap_or_default())
    }
}

/// Identity provider accepting exactly one token.
pub struct StaticIdentity {
    pub token: String,
    pub user_id: String,
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        if token == self.token {
            Ok(Identity { user_id: self.user_id.clone() })
        } else {
            Err(AuthError::Invalid)
        }
    }
}

pub fn sample_snippet(id: &str, owner: &str, status: SnippetStatus) -> Snippet {
    Snippet {
        id: id.into(),
        owner: owner.into(),
        title: "Seeded".into(),
        language: "python".into(),
        code: "x = 1".into(),
        status,
        explanation: None,
        diagram: None,
        trace: None,
    }
}

pub fn test_state(store: Arc<MemoryStore>, model: Option<ModelClient>) -> Arc<AppState> {
    Arc::new(AppState {
        model,
        store: store as Arc<dyn SnippetStore>,
        identity: Arc::new(StaticIdentity { token: TOKEN.into(), user_id: USER.into() }),
        prompts: Prompts::default(),
    })
}

pub fn test_app(store: Arc<MemoryStore>) -> Router {
    build_router(test_state(store, None))
}

/// One-shot request against the router; returns status and parsed JSON body.
pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(a) = auth {
        builder = builder.header(AUTHORIZATION, a);
    }
    let req = match body {
        Some(b) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
