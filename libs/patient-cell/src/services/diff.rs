use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::{ChangeSet, PatientRecord, SaveOutcome};

/// Describe what changed between two versions of a patient record.
///
/// Without a previous version the whole record is new. Otherwise each
/// top-level section that differs contributes the keys whose values changed
/// (or appeared), one level deep.
pub fn diff_records(previous: Option<&PatientRecord>, current: &PatientRecord) -> ChangeSet {
    let Some(previous) = previous else {
        return ChangeSet::NewRecord;
    };

    let sections = sections_of(previous)
        .into_iter()
        .zip(sections_of(current))
        .filter_map(|((name, old), (_, new))| {
            diff_section(&old, &new).map(|changes| (name.to_string(), changes))
        })
        .collect::<BTreeMap<_, _>>();

    ChangeSet::Sections(sections)
}

impl SaveOutcome {
    pub fn change_set(&self) -> ChangeSet {
        match self {
            SaveOutcome::Created(record) => diff_records(None, record),
            SaveOutcome::Updated { previous, current } => diff_records(Some(previous), current),
        }
    }
}

fn sections_of(record: &PatientRecord) -> [(&'static str, Value); 3] {
    [
        ("personal_information", to_json(&record.personal_information)),
        ("demographic_information", to_json(&record.demographic_information)),
        ("medical_history", to_json(&record.medical_history)),
    ]
}

fn to_json<T: Serialize>(section: &T) -> Value {
    serde_json::to_value(section).unwrap_or_default()
}

fn diff_section(old: &Value, new: &Value) -> Option<Map<String, Value>> {
    if old == new {
        return None;
    }

    let new_fields = new.as_object()?;
    let old_fields = old.as_object();
    let changes: Map<String, Value> = new_fields
        .iter()
        .filter(|(key, value)| old_fields.and_then(|o| o.get(*key)) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    (!changes.is_empty()).then_some(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    use extraction_cell::{DemographicInfo, Illness, MedicalHistory};

    use crate::models::{PatientAddress, PersonalDetails};

    fn record() -> PatientRecord {
        let now = Utc::now();
        PatientRecord {
            patient_id: 1,
            personal_information: PersonalDetails {
                first_name: "Ana".to_string(),
                last_name: "Silva".to_string(),
                date_of_birth: "1990-01-01".to_string(),
                gender: "female".to_string(),
                email: "a@x.com".to_string(),
                address: PatientAddress::default(),
            },
            demographic_information: DemographicInfo::default(),
            medical_history: MedicalHistory::default(),
            registered_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_no_previous_is_new_record() {
        let changes = diff_records(None, &record());
        assert_eq!(changes, ChangeSet::NewRecord);
        assert_eq!(serde_json::to_value(&changes).unwrap(), json!({"new_record": true}));
    }

    #[test]
    fn test_identical_records_have_no_changes() {
        let old = record();
        let mut new = old.clone();
        new.updated_at = Utc::now();

        let changes = diff_records(Some(&old), &new);
        assert!(changes.is_empty());
        assert_eq!(serde_json::to_value(&changes).unwrap(), json!({}));
    }

    #[test]
    fn test_reports_only_changed_keys() {
        let old = record();
        let mut new = old.clone();
        new.personal_information.last_name = "Souza".to_string();

        let changes = diff_records(Some(&old), &new);

        assert_eq!(
            serde_json::to_value(&changes).unwrap(),
            json!({"personal_information": {"last_name": "Souza"}})
        );
    }

    #[test]
    fn test_nested_change_reports_whole_top_level_key() {
        let old = record();
        let mut new = old.clone();
        new.personal_information.address.city = "Recife".to_string();
        new.medical_history.illnesses.push(Illness { condition: "asthma".to_string() });

        let changes = diff_records(Some(&old), &new);

        let personal = changes.section("personal_information").unwrap();
        assert_eq!(personal.len(), 1);
        assert_eq!(personal["address"]["city"], "Recife");
        assert_eq!(
            changes.section("medical_history").unwrap()["illnesses"],
            json!([{"condition": "asthma"}])
        );
        assert!(changes.section("demographic_information").is_none());
    }

    #[test]
    fn test_diff_section_reports_added_keys() {
        let old = json!({"a": 1});
        let new = json!({"a": 1, "b": 2});
        assert_eq!(diff_section(&old, &new), Some(json!({"b": 2}).as_object().unwrap().clone()));
    }
}
