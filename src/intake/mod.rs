//! Diagnosis request intake and validation.
//!
//! # Data Flow
//! ```text
//! raw JSON body
//!     → walker.rs (typed field checks, every error collected with its path)
//!     → structured.rs pass 1 (shape, ranges, enumerations)
//!     → structured.rs pass 2 (sub-shape selected by main_symptom, allergy conflicts)
//!     → model.rs (typed StructuredDiagnosisRequest)
//! ```
//!
//! # Design Decisions
//! - Validation never stops at the first problem; a single response lists
//!   every field a client has to fix
//! - The symptom-specific details are a tagged union keyed by `MainSymptom`;
//!   adding a symptom without its sub-shape fails to compile
//! - Enumerations are matched exactly, never case-folded or coerced
//! - Unknown extra fields are ignored

pub mod error;
pub mod model;
pub mod simple;
pub mod structured;
mod walker;

pub use error::{FieldError, FieldErrorReason, ValidationError};
pub use model::{
    AssociatedSymptoms, BleedingPattern, CycleContext, DischargeCharacteristics,
    DysmenorrheaPattern, FlowVolume, HealthcareInteraction, MainSymptom, MedicalContext,
    MenstrualHistory, Onset, PainCharacter, PainCharacteristics, PainSymptoms, PainTiming,
    PatientConcerns, PatientProfile, PregnancyStatus, PrimaryComplaint, Progression,
    ReproductiveHistory, Severity, SexualActivity, StructuredDiagnosisRequest, SymptomDetails,
    SystemicSymptoms,
};
pub use simple::{validate_simple, validate_simple_bytes, DiagnosisRequest};
pub use structured::{validate_structured, validate_structured_bytes};
