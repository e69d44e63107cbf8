//! Treatment safety checks and triage.
//!
//! # Data Flow
//! ```text
//! MedicalContext + generated suggestions + complaint
//!     → knowledge.rs (alias → ingredient → class → role)
//!     → assessor.rs (allergy conflicts, contraindications, substitutes, interactions)
//!     → SafetyAssessment
//!
//! symptoms + severity + SafetyAssessment
//!     → risk.rs (red flags, urgency)
//!     → RiskAssessment
//! ```
//!
//! # Design Decisions
//! - Conflicts are never dropped: an allergic suggestion is moved out of the
//!   recommended set and reported, not silently deleted
//! - A missing substitute is a [`SafetyGap`], reported inside a successful response
//! - Everything is recomputed per request; nothing is cached

pub mod assessor;
pub mod knowledge;
pub mod risk;

use serde::Serialize;
use thiserror::Error;

pub use assessor::{SafetyAssessment, SafetyAssessor};
pub use knowledge::{DrugClass, TherapeuticRole};
pub use risk::{RedFlag, RiskAssessment, RiskFactors, UrgencyLevel};

/// Non-terminal safety finding surfaced as a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SafetyGap {
    #[error("no known safe alternative for '{medication}'; manual review required")]
    NoAlternativeKnown { medication: String },
}
