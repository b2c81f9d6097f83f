//! User-facing text for error codes

use axum::{extract::Query, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Text shown for any code without a specific message
pub const DEFAULT_ERROR_TEXT: &str = "It is not possible to complete that action right now.";

/// User-facing text for an error code
pub fn error_text(code: &str) -> &'static str {
    match code {
        "postEvaluation" => "Unable to save evaluation score.",
        "getEvaluation" => "Unable to retrieve sentence pair.",
        "postStart" => "Could not get set of sentences for evaluation.",
        "postFeedback" => "Could not save feedback.",
        "postDataset" => "Could not save data set.",
        "postStartFailSentenceSet" => "Could not load that set of sentences.",
        "postStartFailEvaluatorId" => "Could not start the evaluation with that evaluator id.",
        "postExportFailLanguage" => "That language is not supported for export.",
        "postExportDataFailCSVCreate" => "Could not create the export files.",
        "JSONparse" => "The uploaded data set could not be read.",
        _ => DEFAULT_ERROR_TEXT,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorTextQuery {
    #[serde(default)]
    pub error_code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorTextResponse {
    pub error_code: String,
    pub text: &'static str,
}

/// GET /api/error-text?errorCode=...
pub async fn get_error_text(Query(query): Query<ErrorTextQuery>) -> Json<ErrorTextResponse> {
    Json(ErrorTextResponse {
        text: error_text(&query.error_code),
        error_code: query.error_code,
    })
}

pub fn error_text_routes() -> Router<AppState> {
    Router::new().route("/api/error-text", get(get_error_text))
}
