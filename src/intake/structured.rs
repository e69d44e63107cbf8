//! Structured diagnosis request validation.
//!
//! Pass 1 checks the fixed shape: required sections, types, ranges and
//! enumerations. Pass 2 runs once `primary_complaint.main_symptom` parsed
//! and checks what depends on other fields: the symptom sub-shape and
//! medication/allergy conflicts. Both passes feed one error list.

use serde::Deserialize;
use serde_json::Value;

use crate::intake::error::{FieldError, FieldErrorReason, ValidationError};
use crate::intake::model::{
    AssociatedSymptoms, BleedingPattern, CycleContext, DischargeCharacteristics,
    DysmenorrheaPattern, FlowVolume, HealthcareInteraction, MainSymptom, MedicalContext, Onset,
    PainCharacter, PainCharacteristics, PainTiming, PatientConcerns, PatientProfile,
    PrimaryComplaint, Progression, ReproductiveHistory, Severity, StructuredDiagnosisRequest,
    SymptomDetails,
};
use crate::intake::walker::{join, Object, Presence, Walker};

use Presence::{Optional, Required};

const ROOT: &str = "body";
const SHORT_TEXT: std::ops::RangeInclusive<usize> = 1..=100;
const LONG_TEXT: std::ops::RangeInclusive<usize> = 1..=1000;
const LIST_ITEMS: std::ops::RangeInclusive<usize> = 0..=50;
const LIST_ITEM_TEXT: std::ops::RangeInclusive<usize> = 1..=200;

/// Validate raw request bytes. Malformed JSON is a single `invalid_format`
/// error on the body.
pub fn validate_structured_bytes(body: &[u8]) -> Result<StructuredDiagnosisRequest, ValidationError> {
    let payload: Value = serde_json::from_slice(body).map_err(|e| {
        ValidationError::single(FieldError::new(
            ROOT,
            FieldErrorReason::InvalidFormat,
            format!("malformed JSON: {e}"),
        ))
    })?;
    validate_structured(&payload)
}

/// Validate a structured intake payload, returning the typed request or
/// every field error found.
pub fn validate_structured(payload: &Value) -> Result<StructuredDiagnosisRequest, ValidationError> {
    let Value::Object(root) = payload else {
        return Err(ValidationError::single(FieldError::new(
            ROOT,
            FieldErrorReason::WrongType,
            "request body must be a JSON object",
        )));
    };

    let mut w = Walker::default();

    // Pass 1
    check_patient_profile(&mut w, root);
    let main_symptom = check_primary_complaint(&mut w, root);
    let details = w.object(root, "", "symptom_specific_details", Required);
    check_reproductive_history(&mut w, root);
    check_associated_symptoms(&mut w, root);
    let medical = check_medical_context(&mut w, root);
    check_healthcare_interaction(&mut w, root);
    check_patient_concerns(&mut w, root);

    // Pass 2
    if let (Some(symptom), Some(details)) = (main_symptom, details) {
        check_symptom_details(&mut w, details, symptom);
    }
    if let Some(medical) = medical {
        check_allergy_conflicts(&mut w, &medical);
    }

    match main_symptom {
        Some(symptom) if w.is_clean() => decode(payload, symptom),
        _ => Err(ValidationError {
            errors: w.into_errors(),
        }),
    }
}

fn check_patient_profile(w: &mut Walker, root: &Object) {
    let Some(profile) = w.object(root, "", "patient_profile", Required) else {
        return;
    };
    let path = "patient_profile";
    w.integer(profile, path, "age", Required, 12..=100);
    w.string(profile, path, "request_id", Required, 3..=100);
    if let Some(ts) = w.string(profile, path, "timestamp", Required, 1..=64) {
        if chrono::DateTime::parse_from_rfc3339(ts).is_err() {
            w.fail(
                join(path, "timestamp"),
                FieldErrorReason::InvalidFormat,
                "must be an RFC 3339 timestamp such as 2025-07-21T06:03:52Z",
            );
        }
    }
}

fn check_primary_complaint(w: &mut Walker, root: &Object) -> Option<MainSymptom> {
    let complaint = w.object(root, "", "primary_complaint", Required)?;
    let path = "primary_complaint";
    let symptom = w.variant::<MainSymptom>(complaint, path, "main_symptom", Required);
    w.string(complaint, path, "duration", Required, 1..=50);
    w.variant::<Severity>(complaint, path, "severity", Required);
    w.variant::<Onset>(complaint, path, "onset", Required);
    w.variant::<Progression>(complaint, path, "progression", Required);
    symptom
}

fn check_reproductive_history(w: &mut Walker, root: &Object) {
    let Some(history) = w.object(root, "", "reproductive_history", Optional) else {
        return;
    };
    let base = "reproductive_history";

    let path = join(base, "pregnancy_status");
    if let Some(pregnancy) = w.object(history, base, "pregnancy_status", Required) {
        w.boolean(pregnancy, &path, "could_be_pregnant", Required);
        w.string(pregnancy, &path, "pregnancy_test_result", Optional, SHORT_TEXT);
        w.string(pregnancy, &path, "test_date", Optional, SHORT_TEXT);
    }

    let path = join(base, "sexual_activity");
    if let Some(activity) = w.object(history, base, "sexual_activity", Required) {
        w.boolean(activity, &path, "sexually_active", Required);
        w.string(activity, &path, "last_intercourse", Optional, SHORT_TEXT);
        w.string(activity, &path, "contraception_method", Optional, SHORT_TEXT);
    }

    let path = join(base, "menstrual_history");
    if let Some(menstrual) = w.object(history, base, "menstrual_history", Required) {
        w.integer(menstrual, &path, "menarche_age", Required, 8..=18);
        w.integer(menstrual, &path, "cycle_frequency", Required, 21..=35);
        w.integer(menstrual, &path, "period_duration", Required, 2..=10);
        w.variant::<FlowVolume>(menstrual, &path, "flow_volume", Optional);
        w.variant::<Severity>(menstrual, &path, "dysmenorrhea", Optional);
        w.boolean(menstrual, &path, "clots_normal", Optional);
    }
}

fn check_associated_symptoms(w: &mut Walker, root: &Object) {
    let Some(associated) = w.object(root, "", "associated_symptoms", Optional) else {
        return;
    };
    let base = "associated_symptoms";

    let path = join(base, "pain");
    if let Some(pain) = w.object(associated, base, "pain", Required) {
        w.variant::<Severity>(pain, &path, "pelvic_pain", Required);
        for key in ["back_pain", "cramping", "vulvar_irritation"] {
            w.variant::<Severity>(pain, &path, key, Optional);
        }
    }

    let path = join(base, "systemic");
    if let Some(systemic) = w.object(associated, base, "systemic", Required) {
        w.variant::<Severity>(systemic, &path, "fatigue", Required);
        w.variant::<Severity>(systemic, &path, "dizziness", Optional);
        w.boolean(systemic, &path, "nausea", Required);
        w.boolean(systemic, &path, "fever", Required);
    }
}

/// Medication and allergy entries that passed pass 1, with their paths.
struct MedicationLists {
    medications: Vec<(String, String)>,
    allergies: Vec<String>,
}

fn check_medical_context(w: &mut Walker, root: &Object) -> Option<MedicationLists> {
    let context = w.object(root, "", "medical_context", Optional)?;
    let path = "medical_context";

    let mut medications = Vec::new();
    for key in ["current_medications", "recent_medications"] {
        medications.extend(
            w.string_list(context, path, key, LIST_ITEMS, LIST_ITEM_TEXT)
                .into_iter()
                .map(|(item_path, name)| (item_path, name.to_lowercase())),
        );
    }
    let allergies = w
        .string_list(context, path, "allergies", LIST_ITEMS, LIST_ITEM_TEXT)
        .into_iter()
        .map(|(_, allergy)| allergy.trim().to_lowercase())
        .collect();
    for key in ["medical_conditions", "previous_gynecological_issues", "family_history"] {
        w.string_list(context, path, key, LIST_ITEMS, LIST_ITEM_TEXT);
    }

    Some(MedicationLists { medications, allergies })
}

fn check_healthcare_interaction(w: &mut Walker, root: &Object) {
    let Some(interaction) = w.object(root, "", "healthcare_interaction", Optional) else {
        return;
    };
    let path = "healthcare_interaction";
    w.boolean(interaction, path, "previous_consultation", Required);
    w.string(interaction, path, "consultation_outcome", Optional, LONG_TEXT);
    w.boolean(interaction, path, "investigations_done", Required);
    w.string(interaction, path, "investigation_results", Optional, LONG_TEXT);
    w.string(interaction, path, "current_treatment", Optional, LONG_TEXT);
}

fn check_patient_concerns(w: &mut Walker, root: &Object) {
    let Some(concerns) = w.object(root, "", "patient_concerns", Optional) else {
        return;
    };
    let path = "patient_concerns";
    w.string(concerns, path, "main_worry", Required, LONG_TEXT);
    w.string(concerns, path, "impact_on_life", Required, LONG_TEXT);
    w.string(concerns, path, "additional_notes", Optional, LONG_TEXT);
}

/// Require the sub-shape that matches `symptom`. Other sub-objects present
/// alongside it are ignored.
fn check_symptom_details(w: &mut Walker, details: &Object, symptom: MainSymptom) {
    let base = "symptom_specific_details";
    let key = symptom.detail_key();
    let path = join(base, key);
    let Some(shape) = w.object(details, base, key, Required) else {
        return;
    };

    match symptom {
        MainSymptom::VaginalDischarge => {
            w.string(shape, &path, "color", Required, SHORT_TEXT);
            w.string(shape, &path, "consistency", Required, SHORT_TEXT);
            w.string(shape, &path, "odor", Required, SHORT_TEXT);
            w.variant::<Severity>(shape, &path, "associated_itching", Required);
        }
        MainSymptom::ExcessiveVaginalBleeding => {
            w.variant::<FlowVolume>(shape, &path, "flow_volume", Required);
            w.integer(shape, &path, "pads_per_day", Required, 0..=50);
            w.boolean(shape, &path, "clots_present", Required);
            w.boolean(shape, &path, "bleeding_between_periods", Required);
        }
        MainSymptom::PelvicPain => {
            w.string(shape, &path, "location", Required, SHORT_TEXT);
            w.variant::<PainCharacter>(shape, &path, "character", Required);
            w.boolean(shape, &path, "radiates", Required);
        }
        MainSymptom::MissedPeriod => {
            if let Some(date) = w.string(shape, &path, "last_period_start", Required, 1..=10) {
                if chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
                    w.fail(
                        join(&path, "last_period_start"),
                        FieldErrorReason::InvalidFormat,
                        "must be a calendar date in YYYY-MM-DD form",
                    );
                }
            }
            w.integer(shape, &path, "days_late", Required, 0..=365);
        }
        MainSymptom::PainfulPeriods => {
            w.integer(shape, &path, "pain_days", Required, 1..=10);
            w.variant::<PainTiming>(shape, &path, "pain_timing", Required);
            w.boolean(shape, &path, "relieved_by_analgesics", Required);
        }
    }
}

/// A medication the patient takes that names one of their allergies.
fn check_allergy_conflicts(w: &mut Walker, lists: &MedicationLists) {
    for (path, medication) in &lists.medications {
        if let Some(allergy) = lists
            .allergies
            .iter()
            .find(|allergy| !allergy.is_empty() && medication.contains(allergy.as_str()))
        {
            w.fail(
                path.clone(),
                FieldErrorReason::AllergyConflict,
                format!("medication conflicts with reported allergy to '{allergy}'"),
            );
        }
    }
}

#[derive(Deserialize)]
struct RawRequest {
    patient_profile: PatientProfile,
    primary_complaint: PrimaryComplaint,
    reproductive_history: Option<ReproductiveHistory>,
    associated_symptoms: Option<AssociatedSymptoms>,
    medical_context: Option<MedicalContext>,
    healthcare_interaction: Option<HealthcareInteraction>,
    patient_concerns: Option<PatientConcerns>,
}

/// Build the typed request from a payload that passed both passes. Only the
/// sub-shape selected by `symptom` is decoded; sibling objects are ignored.
fn decode(payload: &Value, symptom: MainSymptom) -> Result<StructuredDiagnosisRequest, ValidationError> {
    let key = symptom.detail_key();
    let path = format!("symptom_specific_details.{key}");
    let raw: RawRequest = serde_json::from_value(payload.clone()).map_err(|e| {
        ValidationError::single(FieldError::new(ROOT, FieldErrorReason::InvalidFormat, e.to_string()))
    })?;
    let shape = payload
        .get("symptom_specific_details")
        .and_then(|details| details.get(key))
        .cloned()
        .ok_or_else(|| {
            ValidationError::single(FieldError::new(path.as_str(), FieldErrorReason::Missing, "field is required"))
        })?;
    let invalid = |e: serde_json::Error| {
        ValidationError::single(FieldError::new(path.as_str(), FieldErrorReason::InvalidFormat, e.to_string()))
    };

    let symptom_specific_details = match symptom {
        MainSymptom::VaginalDischarge => SymptomDetails::Discharge {
            discharge_characteristics: serde_json::from_value::<DischargeCharacteristics>(shape).map_err(invalid)?,
        },
        MainSymptom::ExcessiveVaginalBleeding => SymptomDetails::Bleeding {
            bleeding_pattern: serde_json::from_value::<BleedingPattern>(shape).map_err(invalid)?,
        },
        MainSymptom::PelvicPain => SymptomDetails::PelvicPain {
            pain_characteristics: serde_json::from_value::<PainCharacteristics>(shape).map_err(invalid)?,
        },
        MainSymptom::MissedPeriod => SymptomDetails::MissedPeriod {
            cycle_context: serde_json::from_value::<CycleContext>(shape).map_err(invalid)?,
        },
        MainSymptom::PainfulPeriods => SymptomDetails::PainfulPeriods {
            dysmenorrhea_pattern: serde_json::from_value::<DysmenorrheaPattern>(shape).map_err(invalid)?,
        },
    };

    Ok(StructuredDiagnosisRequest {
        patient_profile: raw.patient_profile,
        primary_complaint: raw.primary_complaint,
        symptom_specific_details,
        reproductive_history: raw.reproductive_history,
        associated_symptoms: raw.associated_symptoms,
        medical_context: raw.medical_context,
        healthcare_interaction: raw.healthcare_interaction,
        patient_concerns: raw.patient_concerns,
    })
}
