use std::sync::Arc;

use axum::{routing::post, Router};

use crate::handlers;
use crate::services::extractor::ExtractionService;

pub fn extraction_routes(service: Arc<ExtractionService>) -> Router {
    Router::new()
        .route("/analyze_medical_history", post(handlers::analyze_medical_history))
        .route("/analyze_personal_info", post(handlers::analyze_personal_info))
        .route("/analyze_demographic_info", post(handlers::analyze_demographic_info))
        .with_state(service)
}
