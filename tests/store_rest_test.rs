//! Wire-level tests for the REST row store: filter and header shapes, row
//! decoding, and error classification against a stubbed PostgREST endpoint.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use codesplain_backend::config::StoreConfig;
use codesplain_backend::domain::{ExecutionTrace, SnippetStatus};
use codesplain_backend::store::{
    NewQuiz, NewSnippet, RestStore, ResultWrite, SnippetPatch, SnippetStore, StoreError,
};

fn store_for(server: &MockServer) -> RestStore {
    RestStore::new(&StoreConfig {
        base_url: server.uri(),
        service_key: "service-key".into(),
    })
    .unwrap()
}

fn snippet_row(id: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "owner": "user-1",
        "title": "Seeded",
        "language": "python",
        "code": "x = 1",
        "status": status
    })
}

fn quiz_row(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "snippet_id": "snip-1",
        "question": "What runs first?",
        "choices": ["line 1", "line 2"],
        "answer": "line 1",
        "hint": "Top to bottom.",
        "difficulty": "easy"
    })
}

fn new_quiz(question: &str) -> NewQuiz {
    NewQuiz {
        snippet_id: "snip-1".into(),
        question: question.into(),
        choices: vec!["line 1".into(), "line 2".into()],
        answer: "line 1".into(),
        hint: "Top to bottom.".into(),
        difficulty: codesplain_backend::domain::Difficulty::Easy,
    }
}

#[tokio::test]
async fn insert_sends_service_credentials_and_returns_the_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/snippets"))
        .and(header("apikey", "service-key"))
        .and(header("authorization", "Bearer service-key"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({"owner": "user-1", "status": "pending"})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!([snippet_row("snip-1", "pending")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let row = store
        .insert_pending(&NewSnippet {
            owner: "user-1".into(),
            title: "Untitled snippet".into(),
            language: "python".into(),
            code: "x = 1".into(),
            status: SnippetStatus::Pending,
        })
        .await
        .unwrap();

    assert_eq!(row.id, "snip-1");
    assert_eq!(row.status, SnippetStatus::Pending);
    assert!(row.explanation.is_none());
}

#[tokio::test]
async fn update_filters_by_id_and_owner() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/snippets"))
        .and(query_param("id", "eq.snip-1"))
        .and(query_param("owner", "eq.user-1"))
        .and(body_partial_json(json!({"status": "pending", "code": "y = 2"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([snippet_row("snip-1", "pending")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let row = store
        .update_pending(
            "user-1",
            "snip-1",
            &SnippetPatch {
                title: None,
                language: "python".into(),
                code: "y = 2".into(),
                status: SnippetStatus::Pending,
            },
        )
        .await
        .unwrap();

    assert_eq!(row.id, "snip-1");
}

#[tokio::test]
async fn update_with_no_matching_row_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/snippets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let err = store
        .update_pending(
            "user-1",
            "missing",
            &SnippetPatch {
                title: None,
                language: "python".into(),
                code: "y = 2".into(),
                status: SnippetStatus::Pending,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::NotFound));
}

#[tokio::test]
async fn result_write_carries_content_and_ready_status() {
    let server = MockServer::start().await;
    let mut ready = snippet_row("snip-1", "ready");
    ready["explanation"] = json!("It prints things.");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/snippets"))
        .and(query_param("id", "eq.snip-1"))
        .and(body_partial_json(json!({
            "status": "ready",
            "explanation": "It prints things."
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([ready])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let row = store
        .store_result(
            "user-1",
            "snip-1",
            &ResultWrite {
                explanation: "It prints things.".into(),
                diagram: "flowchart TD\n    A --> B".into(),
                trace: ExecutionTrace { input: "none".into(), steps: vec![] },
                status: SnippetStatus::Ready,
            },
        )
        .await
        .unwrap();

    assert_eq!(row.status, SnippetStatus::Ready);
    assert_eq!(row.explanation.as_deref(), Some("It prints things."));
}

#[tokio::test]
async fn quiz_replacement_deletes_then_inserts() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/quizzes"))
        .and(query_param("snippet_id", "eq.snip-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/quizzes"))
        .and(header("Prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            quiz_row("q-1"),
            quiz_row("q-2"),
            quiz_row("q-3")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    store.delete_quizzes_for("snip-1").await.unwrap();
    let rows = store
        .insert_quizzes(&[new_quiz("a?"), new_quiz("b?"), new_quiz("c?")])
        .await
        .unwrap();

    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["q-1", "q-2", "q-3"]);
}

#[tokio::test]
async fn server_error_surfaces_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/snippets"))
        .respond_with(ResponseTemplate::new(500).set_body_string("storage exploded"))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let err = store.fetch_snippet("user-1", "snip-1").await.unwrap_err();

    match err {
        StoreError::Status { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("storage exploded"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn fetch_of_missing_snippet_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/snippets"))
        .and(query_param("id", "eq.missing"))
        .and(query_param("owner", "eq.user-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let found = store.fetch_snippet("user-1", "missing").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn quizzes_for_decodes_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/quizzes"))
        .and(query_param("snippet_id", "eq.snip-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([quiz_row("q-1"), quiz_row("q-2")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let rows = store.quizzes_for("snip-1").await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].question, "What runs first?");
}
