//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! SIGTERM/SIGINT (signals.rs)
//!     → Shutdown::trigger (shutdown.rs)
//!     → server stops accepting, drains in-flight requests
//!     → reload loop and counter sweeper exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
