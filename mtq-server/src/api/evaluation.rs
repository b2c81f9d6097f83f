//! Evaluation endpoints
//!
//! The server keeps no session. Every response carries the cursor the
//! client must send back with its next request.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use mtq_common::progression::{
    begin_evaluation, current_step, start_options, submit_feedback, submit_score, EvaluationCursor,
    EvaluationState, EvaluationStep, ScoreSubmission, StartOptions,
};
use serde::Deserialize;

use crate::error::{ApiResult, WithErrorCode};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuery {
    pub set_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginRequest {
    pub set_id: String,
    pub evaluator_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    pub cursor: EvaluationCursor,
    pub score: ScoreSubmission,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub cursor: EvaluationCursor,
    #[serde(default)]
    pub feedback: String,
}

/// GET /api/start?setId=...
pub async fn get_start(State(state): State<AppState>, Query(query): Query<StartQuery>) -> ApiResult<Json<StartOptions>> {
    let options = start_options(state.store.as_ref(), query.set_id.as_deref())
        .await
        .with_code("postStart")?;
    Ok(Json(options))
}

/// POST /api/evaluation/begin
///
/// Registers the evaluator on the set and returns the first step. Reading
/// the set and recording the evaluator fail under separate codes.
pub async fn post_begin(State(state): State<AppState>, Json(request): Json<BeginRequest>) -> ApiResult<Json<EvaluationStep>> {
    let sentence_set = state
        .store
        .get_sentence_set(&request.set_id)
        .await
        .with_code("postStartFailSentenceSet")?;

    let cursor = begin_evaluation(
        state.store.as_ref(),
        &sentence_set,
        &request.evaluator_id,
        &state.settings,
    )
    .await
    .with_code("postStartFailEvaluatorId")?;

    let step = current_step(state.store.as_ref(), &cursor, &state.settings)
        .await
        .with_code("getEvaluation")?;
    Ok(Json(step))
}

/// GET /api/evaluation?setId=...&evaluatorId=...&sentenceNum=...&practiceRemaining=...
pub async fn get_evaluation(
    State(state): State<AppState>,
    Query(cursor): Query<EvaluationCursor>,
) -> ApiResult<Json<EvaluationStep>> {
    let step = current_step(state.store.as_ref(), &cursor, &state.settings)
        .await
        .with_code("getEvaluation")?;
    Ok(Json(step))
}

/// POST /api/evaluation
///
/// Records the score for the pair at the cursor and returns the next step.
pub async fn post_evaluation(State(state): State<AppState>, Json(request): Json<ScoreRequest>) -> ApiResult<Json<EvaluationStep>> {
    let cursor = submit_score(state.store.as_ref(), &request.cursor, &request.score)
        .await
        .with_code("postEvaluation")?;

    let step = current_step(state.store.as_ref(), &cursor, &state.settings)
        .await
        .with_code("getEvaluation")?;
    Ok(Json(step))
}

/// POST /api/feedback
pub async fn post_feedback(State(state): State<AppState>, Json(request): Json<FeedbackRequest>) -> ApiResult<Json<EvaluationState>> {
    let outcome = submit_feedback(
        state.store.as_ref(),
        &request.cursor,
        &request.feedback,
        &state.settings,
    )
    .await
    .with_code("postFeedback")?;
    Ok(Json(outcome))
}

pub fn evaluation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/start", get(get_start))
        .route("/api/evaluation/begin", post(post_begin))
        .route("/api/evaluation", get(get_evaluation).post(post_evaluation))
        .route("/api/feedback", post(post_feedback))
}
