use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use extraction_cell::{conform, DemographicInfo, ExtractionService, MedicalHistory};

use crate::models::{
    PatientDraft, PatientError, PersonalDetails, SaveOutcome, REQUIRED_ADDRESS_FIELDS,
    REQUIRED_PERSONAL_FIELDS,
};
use crate::services::store::PatientStore;

/// How a registration supplied one of its optional sections.
#[derive(Debug, Clone, Copy, PartialEq)]
enum SectionInput<'a> {
    Absent,
    Text(&'a str),
    Structured(&'a Value),
}

impl<'a> From<Option<&'a Value>> for SectionInput<'a> {
    fn from(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => SectionInput::Absent,
            Some(Value::String(text)) => SectionInput::Text(text),
            Some(other) => SectionInput::Structured(other),
        }
    }
}

pub struct RegistrationService {
    store: Arc<PatientStore>,
    extractor: Arc<ExtractionService>,
}

impl RegistrationService {
    pub fn new(store: Arc<PatientStore>, extractor: Arc<ExtractionService>) -> Self {
        Self { store, extractor }
    }

    /// Validate a registration body, run any free-text sections through the
    /// LLM and save the result against the email's record.
    #[instrument(skip_all)]
    pub async fn register_or_update(&self, body: &Value) -> Result<SaveOutcome, PatientError> {
        let personal_information = validate_personal_information(body)?;

        let demographic_information = self
            .resolve_demographics(body.get("demographic_information").into())
            .await;
        let medical_history = self
            .resolve_medical_history(body.get("medical_history").into())
            .await;

        self.store
            .register(PatientDraft {
                personal_information,
                demographic_information,
                medical_history,
            })
            .await
    }

    async fn resolve_demographics(&self, input: SectionInput<'_>) -> DemographicInfo {
        match input {
            SectionInput::Absent => DemographicInfo::default(),
            SectionInput::Text(text) => self.extractor.extract(text).await,
            SectionInput::Structured(value) => conform(value),
        }
    }

    /// `None` when the registration carries no new medical history.
    async fn resolve_medical_history(&self, input: SectionInput<'_>) -> Option<MedicalHistory> {
        match input {
            SectionInput::Absent => None,
            SectionInput::Text(text) if text.trim().is_empty() => {
                debug!("Blank medical history supplied, keeping existing history");
                None
            }
            SectionInput::Text(text) => {
                let history: MedicalHistory = self.extractor.extract(text).await;
                if history.is_empty() {
                    debug!("No medical history entries extracted from free text");
                }
                Some(history)
            }
            SectionInput::Structured(value) => Some(conform(value)),
        }
    }
}

/// Check that every required personal and address field is present and the
/// email is usable, then coerce the section into [`PersonalDetails`].
pub fn validate_personal_information(body: &Value) -> Result<PersonalDetails, PatientError> {
    let empty = Map::new();
    let personal = body
        .get("personal_information")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let missing = missing_fields(personal, &REQUIRED_PERSONAL_FIELDS);
    if !missing.is_empty() {
        return Err(PatientError::Validation(format!(
            "Missing required personal information: {}",
            missing.join(", ")
        )));
    }

    let address = personal
        .get("address")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let missing = missing_fields(address, &REQUIRED_ADDRESS_FIELDS);
    if !missing.is_empty() {
        return Err(PatientError::Validation(format!(
            "Incomplete address information: {}",
            missing.join(", ")
        )));
    }

    let mut details: PersonalDetails = conform(&Value::Object(personal.clone()));
    details.email = details.email.trim().to_string();
    if details.email.is_empty() {
        return Err(PatientError::Validation(
            "Email is required to identify the patient".to_string(),
        ));
    }

    Ok(details)
}

fn missing_fields<'a>(fields: &Map<String, Value>, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|field| !fields.contains_key(*field))
        .collect()
}
