//! Simple symptom-list requests.

use serde::Serialize;
use serde_json::Value;

use crate::intake::error::{FieldError, FieldErrorReason, ValidationError};
use crate::intake::model::{MainSymptom, Onset, Progression, Severity};
use crate::intake::walker::{Presence, Walker};

/// A validated simple request. Symptoms and duration are normalized
/// (trimmed and lowercased).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosisRequest {
    pub symptoms: Vec<String>,
    pub patient_age: u8,
    pub severity_level: Severity,
    pub duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onset: Option<Onset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progression: Option<Progression>,
}

impl DiagnosisRequest {
    pub fn inferred_symptom(&self) -> Option<MainSymptom> {
        MainSymptom::infer(self.symptoms.as_slice())
    }
}

pub fn validate_simple_bytes(body: &[u8]) -> Result<DiagnosisRequest, ValidationError> {
    let payload: Value = serde_json::from_slice(body).map_err(|e| {
        ValidationError::single(FieldError::new(
            "body",
            FieldErrorReason::InvalidFormat,
            format!("malformed JSON: {e}"),
        ))
    })?;
    validate_simple(&payload)
}

pub fn validate_simple(payload: &Value) -> Result<DiagnosisRequest, ValidationError> {
    let Value::Object(root) = payload else {
        return Err(ValidationError::single(FieldError::new(
            "body",
            FieldErrorReason::WrongType,
            "request body must be a JSON object",
        )));
    };

    let mut w = Walker::default();

    let symptoms: Vec<String> = w
        .string_list(root, "", "symptoms", 1..=3, 2..=100)
        .into_iter()
        .map(|(_, s)| s.trim().to_lowercase())
        .collect();
    let age = w.integer(root, "", "patient_age", Presence::Required, 12..=100);
    let severity = match w.variant::<Severity>(root, "", "severity_level", Presence::Optional) {
        Some(Severity::None) => {
            w.fail(
                "severity_level",
                FieldErrorReason::UnknownVariant,
                "unknown variant `none`, expected one of `mild`, `moderate`, `severe`",
            );
            None
        }
        Some(level) => Some(level),
        // Absent or null takes the default; anything else already failed.
        None => match root.get("severity_level") {
            None | Some(Value::Null) => Some(Severity::Moderate),
            Some(_) => None,
        },
    };
    let duration = w.string(root, "", "duration", Presence::Required, 1..=50);
    let onset = w.variant::<Onset>(root, "", "onset", Presence::Optional);
    let progression = w.variant::<Progression>(root, "", "progression", Presence::Optional);

    match (age, severity, duration) {
        (Some(age), Some(severity_level), Some(duration)) if w.is_clean() => Ok(DiagnosisRequest {
            symptoms,
            patient_age: age as u8,
            severity_level,
            duration: duration.trim().to_lowercase(),
            onset,
            progression,
        }),
        _ => Err(ValidationError {
            errors: w.into_errors(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalizes_and_defaults() {
        let request = validate_simple(&json!({
            "symptoms": ["  Vaginal Discharge ", "ITCHING"],
            "patient_age": 25,
            "duration": " 3 Days "
        }))
        .unwrap();

        assert_eq!(request.symptoms, vec!["vaginal discharge", "itching"]);
        assert_eq!(request.severity_level, Severity::Moderate);
        assert_eq!(request.duration, "3 days");
        assert_eq!(request.onset, None);
        assert_eq!(request.inferred_symptom(), Some(MainSymptom::VaginalDischarge));
    }

    #[test]
    fn test_collects_all_errors() {
        let err = validate_simple(&json!({
            "symptoms": ["a", "b", "c", "d"],
            "patient_age": 11,
            "severity_level": "none",
            "onset": "slow"
        }))
        .unwrap_err();

        let summary: Vec<_> = err.errors.iter().map(|e| (e.path.as_str(), e.reason)).collect();
        assert_eq!(
            summary,
            vec![
                ("symptoms", FieldErrorReason::TooLong),
                ("symptoms[0]", FieldErrorReason::TooShort),
                ("symptoms[1]", FieldErrorReason::TooShort),
                ("symptoms[2]", FieldErrorReason::TooShort),
                ("symptoms[3]", FieldErrorReason::TooShort),
                ("patient_age", FieldErrorReason::OutOfRange),
                ("severity_level", FieldErrorReason::UnknownVariant),
                ("duration", FieldErrorReason::Missing),
                ("onset", FieldErrorReason::UnknownVariant),
            ]
        );
    }

    #[test]
    fn test_empty_symptom_list() {
        let err = validate_simple(&json!({ "symptoms": [], "patient_age": 30, "duration": "1 day" })).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].path, "symptoms");
        assert_eq!(err.errors[0].reason, FieldErrorReason::TooShort);
    }

    #[test]
    fn test_long_duration_rejected() {
        let err = validate_simple(&json!({
            "symptoms": ["pelvic pain"],
            "patient_age": 30,
            "duration": "x".repeat(51)
        }))
        .unwrap_err();
        assert_eq!(err.errors[0].reason, FieldErrorReason::TooLong);
    }
}
