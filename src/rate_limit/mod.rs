//! Fixed-window rate limiting over a shared counter store.
//!
//! # Data Flow
//! ```text
//! Principal (or peer address)
//!     → key.rs (RateLimitKey)
//!     → limiter.rs (window index = floor(now / window), atomic increment)
//!     → store.rs (CounterStore: increment_with_expiry / peek)
//!     → Decision (admit / reject with retry-after)
//! ```
//!
//! # Design Decisions
//! - Fixed windows keep one counter per key and window (O(1) memory per key).
//!   The cost is boundary bursting: a caller can spend a full quota at the end
//!   of one window and another at the start of the next, so up to 2x quota
//!   can pass within `window_secs` seconds spanning the boundary.
//! - Increment and check are one atomic store operation; the limiter never
//!   reads a counter and then writes it back.
//! - Store outages follow the configured `StoreFailurePolicy`, fixed at
//!   construction.

pub mod key;
pub mod limiter;
pub mod store;

use thiserror::Error;

pub use key::RateLimitKey;
pub use limiter::{Decision, QuotaStatus, RateLimiter};
pub use store::{CounterStore, MemoryCounterStore, StoreError};

/// Terminal rate-limit outcome for a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    #[error("rate limit exceeded, retry after {retry_after_secs} seconds")]
    QuotaExceeded { retry_after_secs: u64 },
}
