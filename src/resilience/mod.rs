//! Resilience helpers for calls that leave the process.
//!
//! # Design Decisions
//! - Every external call has a deadline (set on the client)
//! - Retries are bounded and spaced with jittered exponential backoff
//! - Only failures that say "try again later" are retried

pub mod backoff;

pub use backoff::Backoff;
