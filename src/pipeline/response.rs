//! Successful response bodies.

use serde::Serialize;

use crate::generator::{GeneratedDiagnosis, Investigation, PossibleDiagnosis, TreatmentSuggestion};
use crate::intake::MainSymptom;
use crate::rate_limit::QuotaStatus;
use crate::safety::{RiskAssessment, SafetyAssessment};

/// Diagnosis plus the safety review of its suggestions.
///
/// Only suggestions that passed the assessor appear in
/// `recommended_medications`; withheld ones are listed in `safety_assessment`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisResponse {
    pub request_id: String,
    pub patient_age: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_symptom: Option<MainSymptom>,
    pub possible_diagnoses: Vec<PossibleDiagnosis>,
    pub clinical_reasoning: String,
    pub differential_considerations: Vec<String>,
    pub safety_assessment: SafetyAssessment,
    pub risk_assessment: RiskAssessment,
    pub recommended_investigations: Vec<Investigation>,
    pub recommended_medications: Vec<TreatmentSuggestion>,
    pub patient_education: Vec<String>,
    pub confidence_score: f64,
    pub disclaimer: String,
    pub timestamp: String,
}

/// Patient fields echoed back in the response.
pub(crate) struct Subject {
    pub request_id: String,
    pub patient_age: u8,
    pub primary_symptom: Option<MainSymptom>,
}

impl DiagnosisResponse {
    pub(crate) fn assemble(
        subject: Subject,
        diagnosis: GeneratedDiagnosis,
        safety: SafetyAssessment,
        risk: RiskAssessment,
        disclaimer: &str,
        timestamp: String,
    ) -> Self {
        Self {
            request_id: subject.request_id,
            patient_age: subject.patient_age,
            primary_symptom: subject.primary_symptom,
            possible_diagnoses: diagnosis.possible_diagnoses,
            clinical_reasoning: diagnosis.clinical_reasoning,
            differential_considerations: diagnosis.differential_considerations,
            recommended_medications: safety.recommended_medications.clone(),
            safety_assessment: safety,
            risk_assessment: risk,
            recommended_investigations: diagnosis.recommended_investigations,
            patient_education: diagnosis.patient_education,
            confidence_score: diagnosis.confidence_score,
            disclaimer: disclaimer.to_string(),
            timestamp,
        }
    }
}

/// Body of the validation-only endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub request_id: String,
    pub primary_symptom: MainSymptom,
}

/// A response body plus the caller's quota after this request, when metered.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub body: T,
    pub quota: Option<QuotaStatus>,
}
