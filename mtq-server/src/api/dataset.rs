//! Dataset upload endpoints (admin)

use axum::{body::Bytes, extract::State, http::StatusCode, routing::get, Json, Router};
use mtq_common::cleaner::{parse_upload, submit_dataset};
use mtq_common::language::{language_options, LanguageOption};
use serde::Serialize;
use tracing::info;

use crate::error::{ApiResult, WithErrorCode};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetFormResponse {
    pub languages: Vec<LanguageOption>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetCreatedResponse {
    pub set_id: String,
}

/// GET /api/dataset
///
/// Languages selectable as source or target of an upload.
pub async fn get_dataset_form() -> Json<DatasetFormResponse> {
    Json(DatasetFormResponse {
        languages: language_options(),
    })
}

/// POST /api/dataset
///
/// The body is decoded here rather than by the `Json` extractor so that an
/// undecodable upload reports the `JSONparse` code.
pub async fn post_dataset(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<DatasetCreatedResponse>)> {
    let upload = parse_upload(&body).with_code("JSONparse")?;

    let set_id = submit_dataset(state.store.as_ref(), &upload.metadata, &upload.payload)
        .await
        .with_code("postDataset")?;

    info!(set_id = %set_id, "Dataset uploaded");
    Ok((StatusCode::CREATED, Json(DatasetCreatedResponse { set_id })))
}

pub fn dataset_routes() -> Router<AppState> {
    Router::new().route("/api/dataset", get(get_dataset_form).post(post_dataset))
}
