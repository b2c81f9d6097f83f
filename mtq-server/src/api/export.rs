//! Export endpoints (admin)

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use mtq_common::export::build_export;
use mtq_common::language::{language_options, LanguageOption};
use serde::{Deserialize, Serialize};

use crate::bundle::ZipBundler;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFormResponse {
    pub languages: Vec<LanguageOption>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub language: String,
}

/// GET /api/export
pub async fn get_export_form() -> Json<ExportFormResponse> {
    Json(ExportFormResponse {
        languages: language_options(),
    })
}

/// POST /api/export
///
/// Responds with `<code>.zip` holding the deduplicated scores and the
/// feedback for the requested target language.
pub async fn post_export(State(state): State<AppState>, Json(request): Json<ExportRequest>) -> ApiResult<Response> {
    let export = build_export(state.store.as_ref(), &request.language)
        .await
        .map_err(|e| match e {
            mtq_common::Error::Validation(_) => ApiError::from_common("postExportFailLanguage", e),
            other => ApiError::from_common("postExportDataFailCSVCreate", other),
        })?;

    let archive = ZipBundler.bundle(&export).map_err(|e| ApiError::Internal {
        code: "postExportDataFailCSVCreate",
        message: format!("Failed to bundle export: {}", e),
    })?;

    let disposition = format!("attachment; filename=\"{}\"", export.archive_name);
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        archive,
    )
        .into_response())
}

pub fn export_routes() -> Router<AppState> {
    Router::new().route("/api/export", get(get_export_form).post(post_export))
}
