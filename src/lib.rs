//! Diagnosis gateway library.
//!
//! Intake gateway in front of an AI diagnosis generator: authenticates
//! callers, enforces per-identity quotas, validates symptom intake, runs the
//! generator and screens its treatment suggestions against the patient's
//! allergies, conditions and medications.

// Request pipeline
pub mod auth;
pub mod generator;
pub mod intake;
pub mod pipeline;
pub mod rate_limit;
pub mod safety;

// Serving surface
pub mod health;
pub mod http;

// Cross-cutting concerns
pub mod clock;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use pipeline::Pipeline;
