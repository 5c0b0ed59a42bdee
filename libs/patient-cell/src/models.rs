use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};

use extraction_cell::{DemographicInfo, MedicalHistory, Schema};
use shared_models::error::AppError;

pub const REQUIRED_PERSONAL_FIELDS: [&str; 6] = [
    "first_name",
    "last_name",
    "date_of_birth",
    "gender",
    "email",
    "address",
];

pub const REQUIRED_ADDRESS_FIELDS: [&str; 5] = ["line1", "line2", "city", "state", "postcode"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientAddress {
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
}

/// Personal section of a registration, as submitted by the intake form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalDetails {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub email: String,
    pub address: PatientAddress,
}

impl Schema for PersonalDetails {
    fn template() -> Value {
        json!({
            "first_name": "",
            "last_name": "",
            "date_of_birth": "",
            "gender": "",
            "email": "",
            "address": {
                "line1": "",
                "line2": "",
                "city": "",
                "state": "",
                "postcode": ""
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub patient_id: u64,
    pub personal_information: PersonalDetails,
    pub demographic_information: DemographicInfo,
    pub medical_history: MedicalHistory,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PatientRecord {
    pub fn email(&self) -> &str {
        &self.personal_information.email
    }

    pub fn has_email(&self, email: &str) -> bool {
        self.email().trim().eq_ignore_ascii_case(email.trim())
    }
}

/// A registration that has not been assigned to a record yet.
///
/// `medical_history: None` means no new medical history was supplied; an
/// update keeps whatever the record already holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientDraft {
    pub personal_information: PersonalDetails,
    pub demographic_information: DemographicInfo,
    pub medical_history: Option<MedicalHistory>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Created(PatientRecord),
    Updated {
        previous: PatientRecord,
        current: PatientRecord,
    },
}

impl SaveOutcome {
    pub fn record(&self) -> &PatientRecord {
        match self {
            SaveOutcome::Created(record) => record,
            SaveOutcome::Updated { current, .. } => current,
        }
    }
}

/// Shallow per-section description of what a save changed.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeSet {
    NewRecord,
    Sections(BTreeMap<String, Map<String, Value>>),
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        matches!(self, ChangeSet::Sections(sections) if sections.is_empty())
    }

    pub fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        match self {
            ChangeSet::NewRecord => None,
            ChangeSet::Sections(sections) => sections.get(name),
        }
    }
}

impl Serialize for ChangeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ChangeSet::NewRecord => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("new_record", &true)?;
                map.end()
            }
            ChangeSet::Sections(sections) => sections.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatientError {
    #[error("Patient {0} not found")]
    NotFound(u64),

    #[error("{0}")]
    Validation(String),
}

impl From<PatientError> for AppError {
    fn from(error: PatientError) -> Self {
        match error {
            PatientError::NotFound(_) => AppError::NotFound(error.to_string()),
            PatientError::Validation(message) => AppError::ValidationError(message),
        }
    }
}
