//! mtq-server library
//!
//! JSON API over the evaluation core: dataset upload, per-evaluator
//! progression, feedback and per-language export.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use mtq_common::progression::EvaluationSettings;
use mtq_common::EvaluationStore;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod bundle;
pub mod error;

/// Upper bound on request bodies (dataset uploads are the largest)
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EvaluationStore>,
    pub settings: EvaluationSettings,
    /// Hex SHA-256 of the admin key; `None` leaves admin routes open
    pub admin_key_sha256: Option<String>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        store: Arc<dyn EvaluationStore>,
        settings: EvaluationSettings,
        admin_key_sha256: Option<String>,
    ) -> Self {
        Self {
            store,
            settings,
            admin_key_sha256,
        }
    }
}

/// Build application router
///
/// Dataset upload and export sit behind the admin key. Evaluation, health
/// and error text routes are public.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    let protected = Router::new()
        .merge(api::dataset_routes())
        .merge(api::export_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::admin_auth_middleware,
        ));

    let public = Router::new()
        .merge(api::health_routes())
        .merge(api::evaluation_routes())
        .merge(api::error_text_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
