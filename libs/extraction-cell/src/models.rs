use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

/// A record with a fixed JSON shape.
///
/// `template()` is the sanitization target: every key the record carries, with
/// `""` at string leaves and, for sequences, a single element describing the
/// shape of each item.
pub trait Schema: Serialize + DeserializeOwned + Default {
    fn template() -> Value;
}

/// A schema the LLM is asked to fill in from free text.
pub trait ExtractionSchema: Schema {
    /// Section name used in logs and API payloads.
    const CATEGORY: &'static str;
    /// What valid input looks like, used in the refusal instruction.
    const SUBJECT: &'static str;
    /// Heading placed above the user's text in the prompt.
    const INPUT_LABEL: &'static str;
    const INSTRUCTIONS: &'static str;
}

// Personal information

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specifications {
    pub gender: String,
    pub date_of_birth: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub name: PersonName,
    pub address: PostalAddress,
    pub contact_info: ContactInfo,
    pub specifications: Specifications,
}

impl Schema for PersonalInfo {
    fn template() -> Value {
        json!({
            "name": {
                "first_name": "",
                "middle_name": "",
                "last_name": ""
            },
            "address": {
                "line1": "",
                "line2": "",
                "city": "",
                "state": "",
                "zip": ""
            },
            "contact_info": {
                "email": "",
                "phone": ""
            },
            "specifications": {
                "gender": "",
                "date_of_birth": ""
            }
        })
    }
}

impl ExtractionSchema for PersonalInfo {
    const CATEGORY: &'static str = "personal_information";
    const SUBJECT: &'static str = "personal information";
    const INPUT_LABEL: &'static str = "Personal Information Text";
    const INSTRUCTIONS: &'static str = "You are a patient registration information analyzer. \
        Given the following patient personal information text, please extract and structure \
        the information in a JSON format. Dates of birth should use the YYYY-MM-DD format.";
}

// Demographic information

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemographicInfo {
    pub marital_status: String,
    pub occupation: String,
    pub ethnicity: String,
    pub preferred_language: Vec<String>,
}

impl Schema for DemographicInfo {
    fn template() -> Value {
        json!({
            "marital_status": "",
            "occupation": "",
            "ethnicity": "",
            "preferred_language": [""]
        })
    }
}

impl ExtractionSchema for DemographicInfo {
    const CATEGORY: &'static str = "demographic_information";
    const SUBJECT: &'static str = "demographic information";
    const INPUT_LABEL: &'static str = "Input Text";
    const INSTRUCTIONS: &'static str = "You are a healthcare provider demographic information \
        analyzer. Given the following text, please extract and structure demographic information \
        such as marital status, occupation, ethnicity, and preferred language. For \
        \"preferred_language\", return an array of languages if multiple languages are mentioned.";
}

// Medical history

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Illness {
    pub condition: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Surgery {
    pub procedure: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allergy {
    pub allergen: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub medication: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalHistory {
    pub illnesses: Vec<Illness>,
    pub surgeries: Vec<Surgery>,
    pub allergies: Vec<Allergy>,
    pub current_medications: Vec<Medication>,
}

impl MedicalHistory {
    pub fn is_empty(&self) -> bool {
        self.illnesses.is_empty()
            && self.surgeries.is_empty()
            && self.allergies.is_empty()
            && self.current_medications.is_empty()
    }
}

impl Schema for MedicalHistory {
    fn template() -> Value {
        json!({
            "illnesses": [
                {"condition": ""}
            ],
            "surgeries": [
                {"procedure": ""}
            ],
            "allergies": [
                {"allergen": ""}
            ],
            "current_medications": [
                {"medication": ""}
            ]
        })
    }
}

impl ExtractionSchema for MedicalHistory {
    const CATEGORY: &'static str = "medical_history";
    const SUBJECT: &'static str = "medical history";
    const INPUT_LABEL: &'static str = "Medical History Text";
    const INSTRUCTIONS: &'static str = "You are a medical record analyzer. Given the following \
        patient medical history text, please extract and categorize the information in a \
        structured JSON format.";
}

// Analyze endpoint payloads

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeMedicalHistoryRequest {
    #[serde(default)]
    pub medical_history: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzePersonalInfoRequest {
    #[serde(default)]
    pub personal_info: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeDemographicInfoRequest {
    #[serde(default)]
    pub demographic_info: Option<String>,
}
