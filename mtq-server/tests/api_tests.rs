//! Integration tests for the mtq-server API
//!
//! Tests cover:
//! - Health and error text endpoints
//! - Admin key middleware on dataset and export routes
//! - Dataset upload, including undecodable and misaligned uploads
//! - A full evaluation walk: begin, score, feedback
//! - Export archive contents and headers
//! - Error codes and statuses when the store fails

use std::io::{Cursor, Read};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use mtq_common::db::{init_in_memory, SqliteStore};
use mtq_common::models::{SentencePair, SentencePairScore, SentenceSet, SentenceSetFeedback};
use mtq_common::progression::EvaluationSettings;
use mtq_common::{Error, EvaluationStore, Language};
use mtq_server::api::auth::hash_admin_key;
use mtq_server::{build_router, AppState};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot` method

const ADMIN_KEY: &str = "correct horse";

/// Test helper: Create app over a fresh in-memory store
async fn setup_app(settings: EvaluationSettings, admin_key: Option<&str>) -> Router {
    let store = SqliteStore::new(init_in_memory().await.unwrap());
    let state = AppState::new(Arc::new(store), settings, admin_key.map(hash_admin_key));
    build_router(state)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn upload_body(target: &str) -> Value {
    json!({
        "setName": "pilot",
        "sourceLanguage": "ENGLISH",
        "targetLanguage": target,
        "possibleEvaluatorIds": ["e1", "e2"],
        "payload": {
            "sourceText": "One.\nTwo.",
            "humanTranslatedText": "Edno.\nDve.",
            "machineTranslatedText": "Edno!\nDve!"
        }
    })
}

async fn upload(app: &Router, target: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/dataset", upload_body(target)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_json(response.into_body()).await;
    body["setId"].as_str().unwrap().to_string()
}

// =============================================================================
// Health and error text
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let app = setup_app(EvaluationSettings::default(), Some(ADMIN_KEY)).await;

    let response = app.oneshot(empty_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "mtq-server");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_error_text_lookup() {
    let app = setup_app(EvaluationSettings::default(), None).await;

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/error-text?errorCode=postFeedback"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["text"], "Could not save feedback.");

    let response = app
        .oneshot(empty_request("GET", "/api/error-text?errorCode=somethingElse"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["text"], "It is not possible to complete that action right now.");
}

// =============================================================================
// Admin key
// =============================================================================

#[tokio::test]
async fn test_admin_routes_reject_missing_and_wrong_key() {
    let app = setup_app(EvaluationSettings::default(), Some(ADMIN_KEY)).await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/dataset", upload_body("BULGARIAN")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut request = json_request("POST", "/api/export", json!({"language": "bg"}));
    request.headers_mut().insert("x-admin-key", "wrong".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_accept_header_and_bearer_key() {
    let app = setup_app(EvaluationSettings::default(), Some(ADMIN_KEY)).await;

    let mut request = json_request("POST", "/api/dataset", upload_body("BULGARIAN"));
    request.headers_mut().insert("x-admin-key", ADMIN_KEY.parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let mut request = empty_request("GET", "/api/export");
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, format!("Bearer {}", ADMIN_KEY).parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_evaluation_routes_are_public() {
    let app = setup_app(EvaluationSettings::default(), Some(ADMIN_KEY)).await;

    let response = app.oneshot(empty_request("GET", "/api/start")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["sentenceSets"], json!([]));
    assert_eq!(body["possibleEvaluatorIds"], json!(["tester"]));
}

// =============================================================================
// Dataset upload
// =============================================================================

#[tokio::test]
async fn test_dataset_form_lists_languages() {
    let app = setup_app(EvaluationSettings::default(), None).await;

    let response = app.oneshot(empty_request("GET", "/api/dataset")).await.unwrap();
    let body = extract_json(response.into_body()).await;

    let languages = body["languages"].as_array().unwrap();
    assert_eq!(languages.len(), 5);
    assert_eq!(languages[0]["displayName"], "Bulgarian");
    assert_eq!(languages[0]["language"], "BULGARIAN");
}

#[tokio::test]
async fn test_undecodable_upload_reports_json_parse() {
    let app = setup_app(EvaluationSettings::default(), None).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/dataset")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "JSONparse");
}

#[tokio::test]
async fn test_sentence_record_missing_field_reports_json_parse() {
    let app = setup_app(EvaluationSettings::default(), None).await;

    let body = json!({
        "setName": "pilot",
        "sourceLanguage": "ENGLISH",
        "targetLanguage": "TURKISH",
        "payload": {
            "sentences": [{"original": "One.", "humanTranslation": "Bir."}]
        }
    });
    let response = app.oneshot(json_request("POST", "/api/dataset", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "JSONparse");
}

#[tokio::test]
async fn test_misaligned_upload_reports_post_dataset() {
    let app = setup_app(EvaluationSettings::default(), None).await;

    let mut body = upload_body("BULGARIAN");
    body["payload"]["machineTranslatedText"] = json!("One!\nTwo!\nThree!");
    let response = app.clone().oneshot(json_request("POST", "/api/dataset", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "postDataset");
    assert_eq!(body["error"]["text"], "Could not save data set.");

    let response = app.oneshot(empty_request("GET", "/api/start")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["sentenceSets"], json!([]));
}

// =============================================================================
// Evaluation walk
// =============================================================================

#[tokio::test]
async fn test_full_evaluation_walk_with_practice() {
    let settings = EvaluationSettings {
        practice_sentences: 1,
        feedback_required: true,
    };
    let app = setup_app(settings, None).await;
    let set_id = upload(&app, "BULGARIAN").await;

    let response = app
        .clone()
        .oneshot(empty_request("GET", &format!("/api/start?setId={}", set_id)))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["sentenceSets"][0]["isSelected"], true);
    assert_eq!(body["sentenceSets"][0]["setSize"], 2);
    assert_eq!(body["possibleEvaluatorIds"], json!(["e1", "e2", "tester"]));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/evaluation/begin",
            json!({"setId": set_id, "evaluatorId": "e1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let step = extract_json(response.into_body()).await;
    assert_eq!(step["step"], "pair");
    assert_eq!(step["sentenceNum"], 1);
    assert_eq!(step["isPractice"], true);

    // Practice pair: no score required
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/evaluation",
            json!({"cursor": step["cursor"], "score": {"sentencePairId": step["sentencePairId"]}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let step = extract_json(response.into_body()).await;
    assert_eq!(step["sentenceNum"], 2);
    assert_eq!(step["isPractice"], false);

    // Reloading the same cursor shows the same pair
    let cursor = &step["cursor"];
    let uri = format!(
        "/api/evaluation?setId={}&evaluatorId=e1&sentenceNum={}&practiceRemaining={}",
        set_id, cursor["sentenceNum"], cursor["practiceRemaining"]
    );
    let response = app.clone().oneshot(empty_request("GET", &uri)).await.unwrap();
    let reloaded = extract_json(response.into_body()).await;
    assert_eq!(reloaded["sentencePairId"], step["sentencePairId"]);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/evaluation",
            json!({
                "cursor": step["cursor"],
                "score": {"sentencePairId": step["sentencePairId"], "q1Score": 80, "q2Score": 4}
            }),
        ))
        .await
        .unwrap();
    let step = extract_json(response.into_body()).await;
    assert_eq!(step["step"], "feedback");
    assert_eq!(step["feedbackRequired"], true);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/feedback",
            json!({"cursor": step["cursor"], "feedback": ""}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "postFeedback");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/feedback",
            json!({"cursor": step["cursor"], "feedback": "Clear sentences."}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["state"], "complete");

    // e1 is no longer offered on the start page
    let response = app
        .oneshot(empty_request("GET", &format!("/api/start?setId={}", set_id)))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["possibleEvaluatorIds"], json!(["e2", "tester"]));
}

#[tokio::test]
async fn test_begin_unknown_set_reports_sentence_set_code() {
    let app = setup_app(EvaluationSettings::default(), None).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/evaluation/begin",
            json!({"setId": "missing", "evaluatorId": "e1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "postStartFailSentenceSet");
}

#[tokio::test]
async fn test_begin_empty_evaluator_reports_evaluator_code() {
    let app = setup_app(EvaluationSettings::default(), None).await;
    let set_id = upload(&app, "SWAHILI").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/evaluation/begin",
            json!({"setId": set_id, "evaluatorId": "  "}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "postStartFailEvaluatorId");
}

#[tokio::test]
async fn test_stale_pair_id_is_rejected() {
    let app = setup_app(EvaluationSettings::default(), None).await;
    let set_id = upload(&app, "TURKISH").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/evaluation/begin",
            json!({"setId": set_id, "evaluatorId": "e2"}),
        ))
        .await
        .unwrap();
    let step = extract_json(response.into_body()).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/evaluation",
            json!({"cursor": step["cursor"], "score": {"sentencePairId": "not-this-one", "q1Score": 50}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "postEvaluation");
    assert_eq!(body["error"]["text"], "Unable to save evaluation score.");
}

// =============================================================================
// Export
// =============================================================================

#[tokio::test]
async fn test_export_returns_zip_archive() {
    let app = setup_app(EvaluationSettings::default(), None).await;
    let set_id = upload(&app, "BULGARIAN").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/evaluation/begin",
            json!({"setId": set_id, "evaluatorId": "e1"}),
        ))
        .await
        .unwrap();
    let step = extract_json(response.into_body()).await;
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/evaluation",
            json!({"cursor": step["cursor"], "score": {"sentencePairId": step["sentencePairId"], "q1Score": 70, "q2Score": 3}}),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(json_request("POST", "/api/export", json!({"language": "bg"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"bg.zip\""
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    assert_eq!(archive.len(), 2);

    let mut scores = String::new();
    archive
        .by_name("bg-sentence-pair-scores.csv")
        .unwrap()
        .read_to_string(&mut scores)
        .unwrap();
    let lines: Vec<&str> = scores.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("sentence pair id,sentence pair type,evaluator id"));
    assert!(lines[1].starts_with("BG_SE_1,A,e1,70"));

    let mut feedback = String::new();
    archive
        .by_name("bg-feedback.csv")
        .unwrap()
        .read_to_string(&mut feedback)
        .unwrap();
    assert_eq!(feedback.lines().count(), 1);
}

#[tokio::test]
async fn test_export_unknown_language() {
    let app = setup_app(EvaluationSettings::default(), None).await;

    let response = app
        .oneshot(json_request("POST", "/api/export", json!({"language": "FAKE"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "postExportFailLanguage");
}

// =============================================================================
// Store failures
// =============================================================================

/// Store whose every operation fails
struct FailingStore;

fn unavailable<T>() -> mtq_common::Result<T> {
    Err(Error::Internal("store unavailable".to_string()))
}

#[async_trait]
impl EvaluationStore for FailingStore {
    async fn get_sentence_set(&self, _set_id: &str) -> mtq_common::Result<SentenceSet> {
        unavailable()
    }
    async fn list_sentence_sets(&self) -> mtq_common::Result<Vec<SentenceSet>> {
        unavailable()
    }
    async fn put_sentence_set(&self, _sentence_set: &SentenceSet) -> mtq_common::Result<String> {
        unavailable()
    }
    async fn add_evaluator_id(&self, _set_id: &str, _evaluator_id: &str) -> mtq_common::Result<()> {
        unavailable()
    }
    async fn get_sentence_pair(&self, _sentence_id: &str) -> mtq_common::Result<SentencePair> {
        unavailable()
    }
    async fn put_sentence_pair(&self, _pair: &SentencePair) -> mtq_common::Result<String> {
        unavailable()
    }
    async fn put_sentence_pair_score(&self, _score: &SentencePairScore) -> mtq_common::Result<String> {
        unavailable()
    }
    async fn get_sentence_pair_scores(&self, _language: Language) -> mtq_common::Result<Vec<SentencePairScore>> {
        unavailable()
    }
    async fn put_sentence_set_feedback(&self, _feedback: &SentenceSetFeedback) -> mtq_common::Result<String> {
        unavailable()
    }
    async fn get_sentence_set_feedback(&self, _language: Language) -> mtq_common::Result<Vec<SentenceSetFeedback>> {
        unavailable()
    }
}

fn failing_app() -> Router {
    build_router(AppState::new(
        Arc::new(FailingStore),
        EvaluationSettings::default(),
        None,
    ))
}

#[tokio::test]
async fn test_store_failure_on_export_is_internal_error() {
    let response = failing_app()
        .oneshot(json_request("POST", "/api/export", json!({"language": "sw"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "postExportDataFailCSVCreate");
}

#[tokio::test]
async fn test_store_failure_on_dataset_upload() {
    let response = failing_app()
        .oneshot(json_request("POST", "/api/dataset", upload_body("GUJARATI")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "postDataset");
}

#[tokio::test]
async fn test_store_failure_on_start_page() {
    let response = failing_app()
        .oneshot(empty_request("GET", "/api/start"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "postStart");
    assert_eq!(body["error"]["text"], "Could not get set of sentences for evaluation.");
}

#[tokio::test]
async fn test_store_failure_reading_set_on_begin() {
    let response = failing_app()
        .oneshot(json_request(
            "POST",
            "/api/evaluation/begin",
            json!({"setId": "s", "evaluatorId": "e1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "postStartFailSentenceSet");
}

#[tokio::test]
async fn test_unknown_export_language_rejected_before_store_access() {
    let response = failing_app()
        .oneshot(json_request("POST", "/api/export", json!({"language": "FAKE"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "postExportFailLanguage");
}

/// Working store that refuses to record evaluators
struct EvaluatorWriteFailingStore {
    inner: SqliteStore,
}

#[async_trait]
impl EvaluationStore for EvaluatorWriteFailingStore {
    async fn get_sentence_set(&self, set_id: &str) -> mtq_common::Result<SentenceSet> {
        self.inner.get_sentence_set(set_id).await
    }
    async fn list_sentence_sets(&self) -> mtq_common::Result<Vec<SentenceSet>> {
        self.inner.list_sentence_sets().await
    }
    async fn put_sentence_set(&self, sentence_set: &SentenceSet) -> mtq_common::Result<String> {
        self.inner.put_sentence_set(sentence_set).await
    }
    async fn add_evaluator_id(&self, _set_id: &str, _evaluator_id: &str) -> mtq_common::Result<()> {
        unavailable()
    }
    async fn get_sentence_pair(&self, sentence_id: &str) -> mtq_common::Result<SentencePair> {
        self.inner.get_sentence_pair(sentence_id).await
    }
    async fn put_sentence_pair(&self, pair: &SentencePair) -> mtq_common::Result<String> {
        self.inner.put_sentence_pair(pair).await
    }
    async fn put_sentence_pair_score(&self, score: &SentencePairScore) -> mtq_common::Result<String> {
        self.inner.put_sentence_pair_score(score).await
    }
    async fn get_sentence_pair_scores(&self, language: Language) -> mtq_common::Result<Vec<SentencePairScore>> {
        self.inner.get_sentence_pair_scores(language).await
    }
    async fn put_sentence_set_feedback(&self, feedback: &SentenceSetFeedback) -> mtq_common::Result<String> {
        self.inner.put_sentence_set_feedback(feedback).await
    }
    async fn get_sentence_set_feedback(&self, language: Language) -> mtq_common::Result<Vec<SentenceSetFeedback>> {
        self.inner.get_sentence_set_feedback(language).await
    }
}

#[tokio::test]
async fn test_store_failure_recording_evaluator_on_begin() {
    let store = EvaluatorWriteFailingStore {
        inner: SqliteStore::new(init_in_memory().await.unwrap()),
    };
    let set = SentenceSet::new(
        "pilot",
        Language::English,
        Language::Turkish,
        Default::default(),
        Default::default(),
    );
    let set_id = store.put_sentence_set(&set).await.unwrap();

    let app = build_router(AppState::new(
        Arc::new(store),
        EvaluationSettings::default(),
        None,
    ));
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/evaluation/begin",
            json!({"setId": set_id, "evaluatorId": "e1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "postStartFailEvaluatorId");
}
