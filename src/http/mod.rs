//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (request id, trace, timeout, body limit)
//!     → extract.rs (pipeline snapshot + credentials + peer address)
//!     → handlers.rs (call the pipeline)
//!     → error.rs (status, error body, Retry-After / X-RateLimit-* headers)
//! ```
//!
//! # Routes
//! ```text
//! GET  /
//! POST /api/v1/diagnosis
//! POST /api/v1/diagnosis/structured
//! POST /api/v1/diagnosis/structured/test   (only when enabled)
//! POST /api/v1/diagnosis/validate
//! GET  /api/v1/diagnosis/quota
//! GET  /api/v1/health, /api/v1/health/live, /api/v1/health/ready
//! ```

pub mod error;
pub mod extract;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use extract::{Caller, X_REQUEST_ID};
pub use server::{build_generator, AppState, GatewayServer};
