//! Field-level validation errors.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Machine-readable reason attached to every field error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorReason {
    Missing,
    WrongType,
    OutOfRange,
    TooShort,
    TooLong,
    InvalidFormat,
    UnknownVariant,
    AllergyConflict,
}

impl FieldErrorReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldErrorReason::Missing => "missing",
            FieldErrorReason::WrongType => "wrong_type",
            FieldErrorReason::OutOfRange => "out_of_range",
            FieldErrorReason::TooShort => "too_short",
            FieldErrorReason::TooLong => "too_long",
            FieldErrorReason::InvalidFormat => "invalid_format",
            FieldErrorReason::UnknownVariant => "unknown_variant",
            FieldErrorReason::AllergyConflict => "allergy_conflict",
        }
    }
}

/// One problem with one field, addressed by a dotted path such as
/// `symptom_specific_details.discharge_characteristics.associated_itching`
/// or `medical_context.current_medications[1]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub path: String,
    pub reason: FieldErrorReason,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, reason: FieldErrorReason, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.path, self.reason.as_str(), self.message)
    }
}

/// Every field error found in one payload. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request validation failed with {} error(s)", .errors.len())]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn single(error: FieldError) -> Self {
        Self { errors: vec![error] }
    }

    /// Errors reported for exactly `path`.
    pub fn at<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a FieldError> + 'a {
        self.errors.iter().filter(move |e| e.path == path)
    }
}
