//! Generator request and response types.

use serde::{Deserialize, Serialize};

use crate::intake::{DiagnosisRequest, StructuredDiagnosisRequest};

/// A validated intake of either kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "intake", rename_all = "snake_case")]
pub enum Intake {
    Simple(DiagnosisRequest),
    Structured(StructuredDiagnosisRequest),
}

/// What is sent to the generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub request_id: String,
    #[serde(flatten)]
    pub intake: Intake,
}

/// A proposed medication. Not trusted until the safety assessor has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentSuggestion {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PossibleDiagnosis {
    pub name: String,
    pub confidence_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investigation {
    pub name: String,
    pub priority: String,
    pub reason: String,
}

/// Generator output as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDiagnosis {
    pub possible_diagnoses: Vec<PossibleDiagnosis>,
    #[serde(default)]
    pub suggestions: Vec<TreatmentSuggestion>,
    pub clinical_reasoning: String,
    #[serde(default)]
    pub differential_considerations: Vec<String>,
    #[serde(default)]
    pub recommended_investigations: Vec<Investigation>,
    #[serde(default)]
    pub patient_education: Vec<String>,
    pub confidence_score: f64,
}

impl GeneratedDiagnosis {
    /// Structural sanity checks on generator output. Returns the first
    /// problem found.
    pub fn check(&self) -> Result<(), String> {
        if self.possible_diagnoses.is_empty() {
            return Err("no possible diagnoses".to_string());
        }
        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(format!("confidence_score {} outside 0..=1", self.confidence_score));
        }
        if let Some(d) = self
            .possible_diagnoses
            .iter()
            .find(|d| d.name.trim().is_empty() || !(0.0..=1.0).contains(&d.confidence_score))
        {
            return Err(format!("invalid diagnosis entry '{}'", d.name));
        }
        if self.suggestions.iter().any(|s| s.name.trim().is_empty()) {
            return Err("treatment suggestion without a name".to_string());
        }
        Ok(())
    }
}
