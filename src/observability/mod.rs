//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, request id in every span)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (JSON lines or pretty)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through all stage transitions
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
