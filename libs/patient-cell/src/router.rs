use std::sync::Arc;

use axum::{routing::post, Router};

use crate::handlers;
use crate::services::registration::RegistrationService;

pub fn patient_routes(service: Arc<RegistrationService>) -> Router {
    Router::new()
        .route("/register_or_update", post(handlers::register_or_update_patient))
        .with_state(service)
}
