use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;

use extraction_cell::{
    DemographicInfo, ExtractionError, ExtractionService, MedicalHistory, PersonalInfo,
    NO_ANSWER_REPLY,
};
use shared_llm::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerState};
use shared_utils::test_utils::{ScriptedLlmClient, TestConfig};

fn service_with(llm: Arc<ScriptedLlmClient>) -> ExtractionService {
    ExtractionService::new(llm, TestConfig::breaker(Duration::from_millis(200)))
}

#[tokio::test]
async fn test_extracts_fenced_personal_info() {
    let llm = Arc::new(ScriptedLlmClient::replying(
        r#"```json
{
    "name": {"first_name": "Maria", "middle_name": "", "last_name": "Lopez"},
    "address": {"line1": "12 Elm St", "city": "Austin", "state": "TX", "zip": 78701},
    "contact_info": {"email": "maria@example.com", "phone": "  "},
    "specifications": {"gender": "female", "date_of_birth": "1985-03-02"},
    "notes": "ignored"
}
```"#,
    ));
    let service = service_with(llm.clone());

    let info: PersonalInfo = service.extract("Maria Lopez, 12 Elm St, Austin TX 78701").await;

    assert_eq!(info.name.first_name, "Maria");
    assert_eq!(info.name.last_name, "Lopez");
    assert_eq!(info.address.zip, "78701");
    assert_eq!(info.address.line2, "");
    assert_eq!(info.contact_info.phone, "");
    assert_eq!(info.specifications.date_of_birth, "1985-03-02");

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Maria Lopez, 12 Elm St, Austin TX 78701"));
    assert!(prompts[0].contains("Personal Information Text:"));
}

#[tokio::test]
async fn test_medical_history_items_are_sanitized() {
    let llm = Arc::new(ScriptedLlmClient::replying(
        r#"{"illnesses": [{"condition": "hypertension"}, {"condition": 3}],
            "allergies": "penicillin",
            "current_medications": [{"medication": "lisinopril", "dose": "10mg"}]}"#,
    ));
    let service = service_with(llm);

    let history: MedicalHistory = service.extract("BP high, on lisinopril 10mg").await;

    assert_eq!(history.illnesses.len(), 2);
    assert_eq!(history.illnesses[0].condition, "hypertension");
    assert_eq!(history.illnesses[1].condition, "3");
    assert!(history.surgeries.is_empty());
    assert!(history.allergies.is_empty());
    assert_eq!(history.current_medications[0].medication, "lisinopril");
}

#[tokio::test]
async fn test_non_json_reply_yields_default_shape() {
    let service = service_with(Arc::new(ScriptedLlmClient::replying("I think the patient is fine.")));

    let history: MedicalHistory = service.extract("feels fine").await;
    assert_eq!(history, MedicalHistory::default());

    assert_matches!(
        service.try_extract::<MedicalHistory>("feels fine").await,
        Err(ExtractionError::Decode(_))
    );
}

#[tokio::test]
async fn test_refusal_reply_yields_default_shape() {
    let service = service_with(Arc::new(ScriptedLlmClient::replying(NO_ANSWER_REPLY)));

    let info: DemographicInfo = service.extract("what's the weather like").await;
    assert_eq!(info, DemographicInfo::default());

    assert_matches!(
        service.try_extract::<DemographicInfo>("what's the weather like").await,
        Err(ExtractionError::NoAnswer)
    );
}

#[tokio::test]
async fn test_empty_reply_yields_default_shape() {
    let service = service_with(Arc::new(ScriptedLlmClient::replying("```json\n```")));

    assert_matches!(
        service.try_extract::<PersonalInfo>("John").await,
        Err(ExtractionError::EmptyReply)
    );
    assert_eq!(service.extract::<PersonalInfo>("John").await, PersonalInfo::default());
}

#[tokio::test]
async fn test_collaborator_failure_yields_default_shape() {
    let service = service_with(Arc::new(ScriptedLlmClient::failing("upstream unavailable")));

    assert_matches!(
        service.try_extract::<MedicalHistory>("asthma").await,
        Err(ExtractionError::Llm(_))
    );
    assert_eq!(service.extract::<MedicalHistory>("asthma").await, MedicalHistory::default());
}

#[tokio::test]
async fn test_stalled_collaborator_times_out() {
    let service = service_with(Arc::new(ScriptedLlmClient::stalled()));

    assert_matches!(
        service.try_extract::<DemographicInfo>("married, speaks French").await,
        Err(ExtractionError::Timeout(_))
    );
    assert_eq!(
        service.extract::<DemographicInfo>("married, speaks French").await,
        DemographicInfo::default()
    );
}

#[tokio::test]
async fn test_open_circuit_skips_collaborator() {
    let llm = Arc::new(ScriptedLlmClient::failing("down"));
    let breaker = CircuitBreaker::new(CircuitBreakerConfig {
        failure_threshold: 2,
        recovery_timeout: Duration::from_secs(60),
        success_threshold: 1,
        timeout: Duration::from_millis(200),
    });
    let service = ExtractionService::new(llm.clone(), breaker);

    service.extract::<MedicalHistory>("asthma").await;
    service.extract::<MedicalHistory>("asthma").await;
    assert_eq!(service.breaker().state().await, CircuitBreakerState::Open);

    assert_matches!(
        service.try_extract::<MedicalHistory>("asthma").await,
        Err(ExtractionError::CircuitOpen)
    );
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn test_blank_input_skips_collaborator() {
    let llm = Arc::new(ScriptedLlmClient::replying(r#"{"illnesses": [{"condition": "flu"}]}"#));
    let service = service_with(llm.clone());

    let history: MedicalHistory = service.extract("   \n").await;

    assert_eq!(history, MedicalHistory::default());
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_unconfigured_openai_client_degrades() {
    let config = TestConfig {
        openai_api_key: String::new(),
        ..TestConfig::default()
    }
    .to_app_config();
    let service = ExtractionService::from_config(&config);

    let info: PersonalInfo = service.extract("Jane Doe").await;
    assert_eq!(info, PersonalInfo::default());
}
