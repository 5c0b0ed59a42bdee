use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use shared_models::{error::AppError, ApiStatus};

use crate::models::{
    AnalyzeDemographicInfoRequest,
    AnalyzeMedicalHistoryRequest,
    AnalyzePersonalInfoRequest,
    DemographicInfo,
    MedicalHistory,
    PersonalInfo,
};
use crate::services::extractor::ExtractionService;

pub async fn analyze_medical_history(
    State(service): State<Arc<ExtractionService>>,
    payload: Result<Json<AnalyzeMedicalHistoryRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let text = required_text(request.medical_history, "Medical history text is required")?;

    debug!("Analyzing {} characters of medical history", text.len());
    let data: MedicalHistory = service.extract(&text).await;

    Ok(analysis_response(
        "Medical history analyzed successfully",
        "medical_information",
        ("medical_history_text", "medical_history_data"),
        text,
        data,
    ))
}

pub async fn analyze_personal_info(
    State(service): State<Arc<ExtractionService>>,
    payload: Result<Json<AnalyzePersonalInfoRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let text = required_text(request.personal_info, "Personal information text is required")?;

    debug!("Analyzing {} characters of personal information", text.len());
    let data: PersonalInfo = service.extract(&text).await;

    Ok(analysis_response(
        "Personal information analyzed successfully",
        "personal_information",
        ("personal_info_text", "personal_info_data"),
        text,
        data,
    ))
}

pub async fn analyze_demographic_info(
    State(service): State<Arc<ExtractionService>>,
    payload: Result<Json<AnalyzeDemographicInfoRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let text = required_text(request.demographic_info, "Demographic information text is required")?;

    debug!("Analyzing {} characters of demographic information", text.len());
    let data: DemographicInfo = service.extract(&text).await;

    Ok(analysis_response(
        "Demographic information analyzed successfully",
        "demographic_information",
        ("demographic_info_text", "demographic_info_data"),
        text,
        data,
    ))
}

fn required_text(text: Option<String>, message: &str) -> Result<String, AppError> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(AppError::BadRequest(message.to_string())),
    }
}

fn analysis_response<T: Serialize>(
    message: &str,
    section: &str,
    (text_key, data_key): (&str, &str),
    text: String,
    data: T,
) -> Json<Value> {
    let mut body = json!({
        "status": ApiStatus::Success,
        "message": message,
    });
    body[section] = json!({
        text_key: text,
        data_key: data,
    });
    Json(body)
}
