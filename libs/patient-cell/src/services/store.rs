use std::collections::BTreeMap;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::models::{PatientDraft, PatientError, PatientRecord, SaveOutcome};

struct StoreState {
    next_id: u64,
    patients: BTreeMap<u64, PatientRecord>,
}

impl StoreState {
    fn new() -> Self {
        Self {
            next_id: 1,
            patients: BTreeMap::new(),
        }
    }

    fn find_by_email(&self, email: &str) -> Option<&PatientRecord> {
        self.patients.values().find(|patient| patient.has_email(email))
    }

    fn create(&mut self, draft: PatientDraft) -> PatientRecord {
        let patient_id = self.next_id;
        self.next_id += 1;

        let now = Utc::now();
        let record = PatientRecord {
            patient_id,
            personal_information: draft.personal_information,
            demographic_information: draft.demographic_information,
            medical_history: draft.medical_history.unwrap_or_default(),
            registered_at: now,
            updated_at: now,
        };
        self.patients.insert(patient_id, record.clone());
        record
    }

    fn update(&mut self, record: PatientRecord) -> Result<PatientRecord, PatientError> {
        match self.patients.get_mut(&record.patient_id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(record)
            }
            None => Err(PatientError::NotFound(record.patient_id)),
        }
    }
}

/// In-memory patient records keyed by sequential id.
///
/// Ids start at 1 and are never reused. Records handed out are copies; the
/// store keeps the only live version.
pub struct PatientStore {
    state: RwLock<StoreState>,
}

impl Default for PatientStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PatientStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::new()),
        }
    }

    pub async fn find_by_email(&self, email: &str) -> Option<PatientRecord> {
        self.state.read().await.find_by_email(email).cloned()
    }

    pub async fn get(&self, patient_id: u64) -> Option<PatientRecord> {
        self.state.read().await.patients.get(&patient_id).cloned()
    }

    pub async fn create(&self, draft: PatientDraft) -> PatientRecord {
        let record = self.state.write().await.create(draft);
        debug!("Created patient record {}", record.patient_id);
        record
    }

    /// Replace the stored record with the same id.
    pub async fn update(&self, record: PatientRecord) -> Result<PatientRecord, PatientError> {
        let record = self.state.write().await.update(record)?;
        debug!("Replaced patient record {}", record.patient_id);
        Ok(record)
    }

    /// Create a record for a new email, or merge the draft into the record that
    /// already owns it. Lookup and write happen under one lock.
    pub async fn register(&self, draft: PatientDraft) -> Result<SaveOutcome, PatientError> {
        let mut state = self.state.write().await;

        let existing = state.find_by_email(&draft.personal_information.email).cloned();
        match existing {
            None => {
                let record = state.create(draft);
                info!("Registered new patient with ID: {}", record.patient_id);
                Ok(SaveOutcome::Created(record))
            }
            Some(previous) => {
                info!("Updating patient with patient ID: {}", previous.patient_id);
                let current = PatientRecord {
                    patient_id: previous.patient_id,
                    personal_information: draft.personal_information,
                    demographic_information: draft.demographic_information,
                    medical_history: draft
                        .medical_history
                        .unwrap_or_else(|| previous.medical_history.clone()),
                    registered_at: previous.registered_at,
                    updated_at: Utc::now(),
                };
                let current = state.update(current)?;
                Ok(SaveOutcome::Updated { previous, current })
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.patients.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use extraction_cell::{Allergy, MedicalHistory};

    use crate::models::{PatientAddress, PersonalDetails};

    fn draft(email: &str, last_name: &str) -> PatientDraft {
        PatientDraft {
            personal_information: PersonalDetails {
                first_name: "Ana".to_string(),
                last_name: last_name.to_string(),
                date_of_birth: "1990-01-01".to_string(),
                gender: "female".to_string(),
                email: email.to_string(),
                address: PatientAddress {
                    line1: "1 Main St".to_string(),
                    city: "Springfield".to_string(),
                    ..PatientAddress::default()
                },
            },
            ..PatientDraft::default()
        }
    }

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let store = PatientStore::new();

        let first = store.create(draft("a@x.com", "Silva")).await;
        let second = store.create(draft("b@x.com", "Costa")).await;

        assert_eq!(first.patient_id, 1);
        assert!(second.patient_id > first.patient_id);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_find_by_email_after_create() {
        let store = PatientStore::new();
        let created = store.create(draft("a@x.com", "Silva")).await;

        assert_eq!(store.find_by_email("a@x.com").await, Some(created.clone()));
        assert_eq!(store.find_by_email("  A@X.com ").await, Some(created));
        assert_eq!(store.find_by_email("nobody@x.com").await, None);
    }

    #[tokio::test]
    async fn test_update_preserves_patient_id() {
        let store = PatientStore::new();
        let created = store.create(draft("a@x.com", "Silva")).await;

        let mut changed = created.clone();
        changed.personal_information.last_name = "Souza".to_string();
        let updated = store.update(changed).await.unwrap();

        assert_eq!(updated.patient_id, created.patient_id);
        let stored = store.get(created.patient_id).await.unwrap();
        assert_eq!(stored.personal_information.last_name, "Souza");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_unknown_id_fails() {
        let store = PatientStore::new();
        let mut orphan = store.create(draft("a@x.com", "Silva")).await;
        orphan.patient_id = 42;

        assert_matches!(store.update(orphan).await, Err(PatientError::NotFound(42)));
    }

    #[tokio::test]
    async fn test_register_merges_by_email() {
        let store = PatientStore::new();
        let mut first = draft("a@x.com", "Silva");
        first.medical_history = Some(MedicalHistory {
            allergies: vec![Allergy { allergen: "latex".to_string() }],
            ..MedicalHistory::default()
        });

        let created = store.register(first).await.unwrap();
        assert_matches!(created, SaveOutcome::Created(ref r) if r.patient_id == 1);

        let outcome = store.register(draft("a@x.com", "Souza")).await.unwrap();
        match outcome {
            SaveOutcome::Updated { previous, current } => {
                assert_eq!(previous.personal_information.last_name, "Silva");
                assert_eq!(current.personal_information.last_name, "Souza");
                assert_eq!(current.patient_id, 1);
                assert_eq!(current.registered_at, previous.registered_at);
                assert_eq!(current.medical_history.allergies[0].allergen, "latex");
            }
            other => panic!("expected update, got {:?}", other),
        }
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_across_registrations() {
        let store = PatientStore::new();
        for (i, email) in ["a@x.com", "b@x.com", "c@x.com"].iter().enumerate() {
            let outcome = store.register(draft(email, "Silva")).await.unwrap();
            assert_eq!(outcome.record().patient_id, i as u64 + 1);
        }
        let again = store.register(draft("b@x.com", "Lima")).await.unwrap();
        assert_eq!(again.record().patient_id, 2);
        assert_eq!(store.create(draft("d@x.com", "Reis")).await.patient_id, 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_for_one_email_create_one_record() {
        let store = std::sync::Arc::new(PatientStore::new());

        let (first, second) = tokio::join!(
            tokio::spawn({
                let store = store.clone();
                async move { store.register(draft("a@x.com", "Silva")).await }
            }),
            tokio::spawn({
                let store = store.clone();
                async move { store.register(draft("A@x.com ", "Souza")).await }
            }),
        );
        let outcomes = [first.unwrap().unwrap(), second.unwrap().unwrap()];

        assert_eq!(store.len().await, 1);
        assert_eq!(outcomes.iter().filter(|o| matches!(o, SaveOutcome::Created(_))).count(), 1);
        assert!(outcomes.iter().all(|o| o.record().patient_id == 1));
    }
}
