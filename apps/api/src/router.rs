use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};
use tower_http::catch_panic::CatchPanicLayer;

use extraction_cell::{extraction_routes, ExtractionService};
use patient_cell::{patient_routes, RegistrationService};
use shared_models::panic_response;

pub fn create_router(
    registration: Arc<RegistrationService>,
    extractor: Arc<ExtractionService>,
) -> Router {
    let app = Router::new()
        .route("/", get(|| async { "Patient Intake API is running!" }))
        .nest(
            "/api/patient",
            patient_routes(registration).merge(extraction_routes(extractor)),
        );

    catch_panics(app)
}

fn catch_panics(router: Router) -> Router {
    router.layer(CatchPanicLayer::custom(panic_response))
}
