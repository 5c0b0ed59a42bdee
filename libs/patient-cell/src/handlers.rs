use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::{error::AppError, ApiStatus};

use crate::models::SaveOutcome;
use crate::services::registration::RegistrationService;

pub async fn register_or_update_patient(
    State(service): State<Arc<RegistrationService>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(body) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    if !body.is_object() {
        return Err(AppError::BadRequest("Request body must be a JSON object".to_string()));
    }

    let outcome = service.register_or_update(&body).await?;
    debug!("Saved patient {}", outcome.record().patient_id);

    let (status, body) = match &outcome {
        SaveOutcome::Created(record) => (
            StatusCode::CREATED,
            json!({
                "status": ApiStatus::Success,
                "message": format!("Patient registered successfully with ID {}", record.patient_id),
                "data": {
                    "patient_info": record,
                }
            }),
        ),
        SaveOutcome::Updated { current, .. } => (
            StatusCode::OK,
            json!({
                "status": ApiStatus::Success,
                "message": "Patient record updated",
                "data": {
                    "patient_info": current,
                    "updates": outcome.change_set(),
                }
            }),
        ),
    };

    Ok((status, Json(body)))
}
