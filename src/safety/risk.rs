//! Red flags and urgency classification.

use serde::Serialize;

use crate::intake::{
    DiagnosisRequest, FlowVolume, MainSymptom, Onset, Progression, Severity, StructuredDiagnosisRequest,
    SymptomDetails,
};
use crate::safety::SafetyAssessment;

/// Coarse triage level, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Low,
    Moderate,
    High,
    Urgent,
}

impl UrgencyLevel {
    fn raised(self) -> Self {
        match self {
            UrgencyLevel::Low => UrgencyLevel::Moderate,
            UrgencyLevel::Moderate => UrgencyLevel::High,
            UrgencyLevel::High | UrgencyLevel::Urgent => UrgencyLevel::Urgent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedFlag {
    FeverWithPelvicPain,
    PossiblePregnancyWithBleedingOrPain,
    HeavyBleeding,
    DizzinessWithBleeding,
    SuddenSeverePelvicPain,
}

impl RedFlag {
    /// Critical flags on their own make a request urgent.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            RedFlag::PossiblePregnancyWithBleedingOrPain
                | RedFlag::DizzinessWithBleeding
                | RedFlag::SuddenSeverePelvicPain
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            RedFlag::FeverWithPelvicPain => "fever with pelvic pain may indicate pelvic inflammatory disease",
            RedFlag::PossiblePregnancyWithBleedingOrPain => {
                "possible pregnancy with bleeding or pelvic pain; ectopic pregnancy must be excluded"
            }
            RedFlag::HeavyBleeding => "very heavy bleeding (8 or more pads a day or very heavy flow)",
            RedFlag::DizzinessWithBleeding => "dizziness with bleeding may indicate significant blood loss",
            RedFlag::SuddenSeverePelvicPain => {
                "sudden severe pelvic pain may indicate torsion or rupture"
            }
        }
    }
}

/// The inputs risk classification looks at, taken from either intake kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskFactors {
    pub complaint: Option<MainSymptom>,
    pub severity: Severity,
    pub onset: Option<Onset>,
    pub progression: Option<Progression>,
    pub fever: bool,
    pub pelvic_pain: bool,
    pub bleeding: bool,
    pub heavy_bleeding: bool,
    pub could_be_pregnant: bool,
    pub dizziness: Severity,
}

impl From<&StructuredDiagnosisRequest> for RiskFactors {
    fn from(request: &StructuredDiagnosisRequest) -> Self {
        let complaint = &request.primary_complaint;
        let systemic = request.associated_symptoms.as_ref().map(|a| &a.systemic);
        let associated_pelvic = request
            .associated_symptoms
            .as_ref()
            .is_some_and(|a| a.pain.pelvic_pain >= Severity::Moderate);

        let heavy_bleeding = match &request.symptom_specific_details {
            SymptomDetails::Bleeding { bleeding_pattern } => {
                bleeding_pattern.flow_volume == FlowVolume::VeryHeavy || bleeding_pattern.pads_per_day >= 8
            }
            _ => false,
        };

        Self {
            complaint: Some(complaint.main_symptom),
            severity: complaint.severity,
            onset: Some(complaint.onset),
            progression: Some(complaint.progression),
            fever: systemic.is_some_and(|s| s.fever),
            pelvic_pain: complaint.main_symptom == MainSymptom::PelvicPain || associated_pelvic,
            bleeding: complaint.main_symptom == MainSymptom::ExcessiveVaginalBleeding,
            heavy_bleeding,
            could_be_pregnant: request.could_be_pregnant(),
            dizziness: systemic.and_then(|s| s.dizziness).unwrap_or(Severity::None),
        }
    }
}

impl From<&DiagnosisRequest> for RiskFactors {
    fn from(request: &DiagnosisRequest) -> Self {
        let mentions = |needle: &str| request.symptoms.iter().any(|s| s.contains(needle));

        Self {
            complaint: request.inferred_symptom(),
            severity: request.severity_level,
            onset: request.onset,
            progression: request.progression,
            fever: mentions("fever"),
            pelvic_pain: mentions("pelvic"),
            bleeding: mentions("bleeding"),
            heavy_bleeding: mentions("heavy bleeding") || mentions("soaking"),
            could_be_pregnant: false,
            dizziness: if mentions("dizz") || mentions("faint") {
                Severity::Moderate
            } else {
                Severity::None
            },
        }
    }
}

impl RiskFactors {
    pub fn red_flags(&self) -> Vec<RedFlag> {
        let mut flags = Vec::new();
        if self.fever && self.pelvic_pain {
            flags.push(RedFlag::FeverWithPelvicPain);
        }
        if self.could_be_pregnant && (self.bleeding || self.pelvic_pain) {
            flags.push(RedFlag::PossiblePregnancyWithBleedingOrPain);
        }
        if self.heavy_bleeding {
            flags.push(RedFlag::HeavyBleeding);
        }
        if self.bleeding && self.dizziness >= Severity::Moderate {
            flags.push(RedFlag::DizzinessWithBleeding);
        }
        if self.pelvic_pain && self.onset == Some(Onset::Sudden) && self.severity == Severity::Severe {
            flags.push(RedFlag::SuddenSeverePelvicPain);
        }
        flags
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub urgency_level: UrgencyLevel,
    pub red_flags: Vec<String>,
}

impl RiskAssessment {
    /// Severity sets the base, worsening raises it one step, unresolved
    /// safety gaps need at least moderate, and red flags need at least high.
    pub fn evaluate(factors: &RiskFactors, safety: &SafetyAssessment) -> Self {
        let flags = factors.red_flags();

        let mut level = if factors.severity == Severity::Severe {
            UrgencyLevel::Moderate
        } else {
            UrgencyLevel::Low
        };
        if factors.progression == Some(Progression::Worsening) {
            level = level.raised();
        }
        if safety.has_gaps() {
            level = level.max(UrgencyLevel::Moderate);
        }
        if flags.iter().any(RedFlag::is_critical) || flags.len() >= 2 {
            level = UrgencyLevel::Urgent;
        } else if !flags.is_empty() {
            level = level.max(UrgencyLevel::High);
        }

        Self {
            urgency_level: level,
            red_flags: flags.iter().map(|f| f.description().to_string()).collect(),
        }
    }
}
