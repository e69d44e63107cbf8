//! Validated intake types.
//!
//! Values of these types only exist after validation succeeded; optional
//! fields that were absent stay absent when serialized again.

use serde::{Deserialize, Serialize};

/// Primary symptoms the intake accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MainSymptom {
    ExcessiveVaginalBleeding,
    VaginalDischarge,
    PelvicPain,
    MissedPeriod,
    PainfulPeriods,
}

impl MainSymptom {
    pub const ALL: [MainSymptom; 5] = [
        MainSymptom::ExcessiveVaginalBleeding,
        MainSymptom::VaginalDischarge,
        MainSymptom::PelvicPain,
        MainSymptom::MissedPeriod,
        MainSymptom::PainfulPeriods,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MainSymptom::ExcessiveVaginalBleeding => "excessive_vaginal_bleeding",
            MainSymptom::VaginalDischarge => "vaginal_discharge",
            MainSymptom::PelvicPain => "pelvic_pain",
            MainSymptom::MissedPeriod => "missed_period",
            MainSymptom::PainfulPeriods => "painful_periods",
        }
    }

    /// Key of the `symptom_specific_details` sub-object this symptom requires.
    pub fn detail_key(&self) -> &'static str {
        match self {
            MainSymptom::ExcessiveVaginalBleeding => "bleeding_pattern",
            MainSymptom::VaginalDischarge => "discharge_characteristics",
            MainSymptom::PelvicPain => "pain_characteristics",
            MainSymptom::MissedPeriod => "cycle_context",
            MainSymptom::PainfulPeriods => "dysmenorrhea_pattern",
        }
    }

    /// Best-effort match of free-text symptoms ("vaginal discharge") to a
    /// primary symptom. Used for simple requests, which carry no enumeration.
    pub fn infer<S: AsRef<str>>(symptoms: &[S]) -> Option<MainSymptom> {
        symptoms.iter().find_map(|text| {
            let normalized = text.as_ref().trim().to_lowercase().replace([' ', '-'], "_");
            MainSymptom::ALL
                .into_iter()
                .find(|s| normalized.contains(s.as_str()))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None,
    Mild,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Onset {
    Sudden,
    Gradual,
    Chronic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Progression {
    Stable,
    Improving,
    Worsening,
    Fluctuating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowVolume {
    Light,
    Moderate,
    Heavy,
    VeryHeavy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PainCharacter {
    Sharp,
    Dull,
    Cramping,
    Burning,
    Throbbing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PainTiming {
    BeforePeriod,
    DuringPeriod,
    AfterPeriod,
    Constant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub age: u8,
    pub request_id: String,
    /// RFC 3339 timestamp, kept exactly as submitted.
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryComplaint {
    pub main_symptom: MainSymptom,
    pub duration: String,
    pub severity: Severity,
    pub onset: Onset,
    pub progression: Progression,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DischargeCharacteristics {
    pub color: String,
    pub consistency: String,
    pub odor: String,
    pub associated_itching: Severity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BleedingPattern {
    pub flow_volume: FlowVolume,
    pub pads_per_day: u8,
    pub clots_present: bool,
    pub bleeding_between_periods: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PainCharacteristics {
    pub location: String,
    pub character: PainCharacter,
    pub radiates: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleContext {
    /// Calendar date, `YYYY-MM-DD`.
    pub last_period_start: String,
    pub days_late: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DysmenorrheaPattern {
    pub pain_days: u8,
    pub pain_timing: PainTiming,
    pub relieved_by_analgesics: bool,
}

/// Symptom-specific details, one variant per [`MainSymptom`].
///
/// Serializes to the same single-key object the client sent, e.g.
/// `{"discharge_characteristics": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SymptomDetails {
    Discharge {
        discharge_characteristics: DischargeCharacteristics,
    },
    Bleeding {
        bleeding_pattern: BleedingPattern,
    },
    PelvicPain {
        pain_characteristics: PainCharacteristics,
    },
    MissedPeriod {
        cycle_context: CycleContext,
    },
    PainfulPeriods {
        dysmenorrhea_pattern: DysmenorrheaPattern,
    },
}

impl SymptomDetails {
    pub fn symptom(&self) -> MainSymptom {
        match self {
            SymptomDetails::Discharge { .. } => MainSymptom::VaginalDischarge,
            SymptomDetails::Bleeding { .. } => MainSymptom::ExcessiveVaginalBleeding,
            SymptomDetails::PelvicPain { .. } => MainSymptom::PelvicPain,
            SymptomDetails::MissedPeriod { .. } => MainSymptom::MissedPeriod,
            SymptomDetails::PainfulPeriods { .. } => MainSymptom::PainfulPeriods,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PregnancyStatus {
    pub could_be_pregnant: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pregnancy_test_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SexualActivity {
    pub sexually_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_intercourse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contraception_method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenstrualHistory {
    pub menarche_age: u8,
    pub cycle_frequency: u8,
    pub period_duration: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_volume: Option<FlowVolume>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dysmenorrhea: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clots_normal: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReproductiveHistory {
    pub pregnancy_status: PregnancyStatus,
    pub sexual_activity: SexualActivity,
    pub menstrual_history: MenstrualHistory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PainSymptoms {
    pub pelvic_pain: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_pain: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cramping: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulvar_irritation: Option<Severity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemicSymptoms {
    pub fatigue: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dizziness: Option<Severity>,
    pub nausea: bool,
    pub fever: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociatedSymptoms {
    pub pain: PainSymptoms,
    pub systemic: SystemicSymptoms,
}

/// Patient medication context. Entries are free text; comparisons downstream
/// are case-insensitive and duplicates are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalContext {
    #[serde(default)]
    pub current_medications: Vec<String>,
    #[serde(default)]
    pub recent_medications: Vec<String>,
    #[serde(default)]
    pub medical_conditions: Vec<String>,
    #[serde(default)]
    pub previous_gynecological_issues: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub family_history: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthcareInteraction {
    pub previous_consultation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultation_outcome: Option<String>,
    pub investigations_done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investigation_results: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_treatment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientConcerns {
    pub main_worry: String,
    pub impact_on_life: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
}

/// A fully validated structured intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuredDiagnosisRequest {
    pub patient_profile: PatientProfile,
    pub primary_complaint: PrimaryComplaint,
    pub symptom_specific_details: SymptomDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reproductive_history: Option<ReproductiveHistory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associated_symptoms: Option<AssociatedSymptoms>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_context: Option<MedicalContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcare_interaction: Option<HealthcareInteraction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_concerns: Option<PatientConcerns>,
}

impl StructuredDiagnosisRequest {
    pub fn main_symptom(&self) -> MainSymptom {
        self.primary_complaint.main_symptom
    }

    pub fn could_be_pregnant(&self) -> bool {
        self.reproductive_history
            .as_ref()
            .is_some_and(|h| h.pregnancy_status.could_be_pregnant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_symptom_has_distinct_detail_key() {
        let mut keys: Vec<_> = MainSymptom::ALL.iter().map(|s| s.detail_key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), MainSymptom::ALL.len());
    }

    #[test]
    fn test_symptom_names_match_serde() {
        for symptom in MainSymptom::ALL {
            assert_eq!(
                serde_json::to_value(symptom).unwrap(),
                serde_json::Value::String(symptom.as_str().to_string())
            );
        }
    }

    #[test]
    fn test_infer_from_free_text() {
        assert_eq!(
            MainSymptom::infer(&["itching", "Vaginal Discharge"]),
            Some(MainSymptom::VaginalDischarge)
        );
        assert_eq!(MainSymptom::infer(&["pelvic-pain"]), Some(MainSymptom::PelvicPain));
        assert_eq!(MainSymptom::infer(&["headache"]), None);
    }

    #[test]
    fn test_details_serialize_as_single_key_object() {
        let details = SymptomDetails::MissedPeriod {
            cycle_context: CycleContext {
                last_period_start: "2025-06-01".to_string(),
                days_late: 9,
            },
        };
        assert_eq!(
            serde_json::to_value(&details).unwrap(),
            serde_json::json!({ "cycle_context": { "last_period_start": "2025-06-01", "days_late": 9 } })
        );
        assert_eq!(details.symptom(), MainSymptom::MissedPeriod);
    }
}
