//! Fixed-window limiter.

use std::sync::Arc;

use serde::Serialize;

use crate::clock::TimeSource;
use crate::config::StoreFailurePolicy;
use crate::observability::metrics;
use crate::rate_limit::{CounterStore, RateLimitError, RateLimitKey, StoreError};

/// Quota position of a caller inside the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    pub limit: u64,
    pub remaining: u64,
    pub window_seconds: u64,
    /// Seconds until the current window closes.
    pub reset_after_seconds: u64,
}

/// Outcome of one `check_and_record` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admit(QuotaStatus),
    /// Store unreachable under the fail-open policy; nothing was counted.
    AdmitUnmetered,
    Reject { retry_after_secs: u64 },
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Decision::Reject { .. })
    }

    /// Admitted quota status (if metered), or the terminal error.
    pub fn into_result(self) -> Result<Option<QuotaStatus>, RateLimitError> {
        match self {
            Decision::Admit(status) => Ok(Some(status)),
            Decision::AdmitUnmetered => Ok(None),
            Decision::Reject { retry_after_secs } => {
                Err(RateLimitError::QuotaExceeded { retry_after_secs })
            }
        }
    }
}

struct Window {
    index: u64,
    reset_after: u64,
}

fn current_window(now: u64, window_secs: u64) -> Window {
    let index = now / window_secs;
    let start = index * window_secs;
    Window {
        index,
        // Always >= 1 because now < start + window_secs.
        reset_after: start + window_secs - now,
    }
}

fn storage_key(key: &RateLimitKey, index: u64) -> String {
    format!("rate_limit:{key}:{index}")
}

/// Admits or rejects callers against a quota per fixed window.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn TimeSource>,
    policy: StoreFailurePolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, clock: Arc<dyn TimeSource>, policy: StoreFailurePolicy) -> Self {
        Self { store, clock, policy }
    }

    pub fn policy(&self) -> StoreFailurePolicy {
        self.policy
    }

    pub fn store(&self) -> &Arc<dyn CounterStore> {
        &self.store
    }

    /// Count one request for `key` and decide whether it is admitted.
    pub async fn check_and_record(&self, key: &RateLimitKey, quota: u64, window_secs: u64) -> Decision {
        let window_secs = window_secs.max(1);
        let window = current_window(self.clock.now(), window_secs);

        match self
            .store
            .increment_with_expiry(&storage_key(key, window.index), window_secs)
            .await
        {
            Ok(count) if count > quota => {
                tracing::warn!(client = %key, count, quota, retry_after = window.reset_after, "Rate limit exceeded");
                metrics::record_rate_limited("quota_exceeded");
                Decision::Reject {
                    retry_after_secs: window.reset_after,
                }
            }
            Ok(count) => Decision::Admit(QuotaStatus {
                limit: quota,
                remaining: quota - count,
                window_seconds: window_secs,
                reset_after_seconds: window.reset_after,
            }),
            Err(e) => self.on_store_failure(key, &e, window.reset_after),
        }
    }

    fn on_store_failure(&self, key: &RateLimitKey, error: &StoreError, reset_after: u64) -> Decision {
        metrics::record_store_error();
        match self.policy {
            StoreFailurePolicy::FailOpen => {
                tracing::warn!(client = %key, error = %error, "Counter store unavailable, admitting unmetered");
                Decision::AdmitUnmetered
            }
            StoreFailurePolicy::FailClosed => {
                tracing::error!(client = %key, error = %error, "Counter store unavailable, rejecting");
                metrics::record_rate_limited("store_unavailable");
                Decision::Reject {
                    retry_after_secs: reset_after,
                }
            }
        }
    }

    /// Decision for a check that never got an answer from the store.
    pub fn store_unreachable(&self, key: &RateLimitKey, error: &StoreError, window_secs: u64) -> Decision {
        let window = current_window(self.clock.now(), window_secs.max(1));
        self.on_store_failure(key, error, window.reset_after)
    }

    /// Read-only view of the caller's quota for the current window.
    pub async fn status(&self, key: &RateLimitKey, quota: u64, window_secs: u64) -> Result<QuotaStatus, StoreError> {
        let window_secs = window_secs.max(1);
        let window = current_window(self.clock.now(), window_secs);
        let used = self
            .store
            .peek(&storage_key(key, window.index))
            .await?
            .unwrap_or(0);

        Ok(QuotaStatus {
            limit: quota,
            remaining: quota.saturating_sub(used),
            window_seconds: window_secs,
            reset_after_seconds: window.reset_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTimeSource;
    use crate::rate_limit::MemoryCounterStore;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct DownStore;

    #[async_trait]
    impl CounterStore for DownStore {
        async fn increment_with_expiry(&self, _key: &str, _ttl: u64) -> Result<u64, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
        async fn peek(&self, _key: &str) -> Result<Option<u64>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    /// Fails every other call.
    struct FlakyStore {
        inner: MemoryCounterStore,
        calls: AtomicU32,
    }

    #[async_trait]
    impl CounterStore for FlakyStore {
        async fn increment_with_expiry(&self, key: &str, ttl: u64) -> Result<u64, StoreError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
                return Err(StoreError::Unavailable("timeout".to_string()));
            }
            self.inner.increment_with_expiry(key, ttl).await
        }
        async fn peek(&self, key: &str) -> Result<Option<u64>, StoreError> {
            self.inner.peek(key).await
        }
    }

    fn limiter(clock: Arc<ManualTimeSource>) -> RateLimiter {
        RateLimiter::new(
            Arc::new(MemoryCounterStore::new(clock.clone())),
            clock,
            StoreFailurePolicy::FailOpen,
        )
    }

    fn key() -> RateLimitKey {
        RateLimitKey::for_address("10.1.2.3".parse().unwrap())
    }

    #[tokio::test]
    async fn test_quota_then_reject_with_retry_after() {
        // 101 requests in one hour under 100/3600s.
        let clock = Arc::new(ManualTimeSource::new(7_200));
        let limiter = limiter(clock.clone());

        for i in 1..=100u64 {
            let decision = limiter.check_and_record(&key(), 100, 3600).await;
            assert!(decision.is_admitted(), "request {i} should be admitted");
            clock.advance(30);
        }

        match limiter.check_and_record(&key(), 100, 3600).await {
            Decision::Reject { retry_after_secs } => {
                assert!(retry_after_secs > 0);
                assert_eq!(retry_after_secs, 3600 - 100 * 30);
            }
            other => panic!("expected reject, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_counter_resets_at_window_boundary() {
        let clock = Arc::new(ManualTimeSource::new(59));
        let limiter = limiter(clock.clone());

        assert!(limiter.check_and_record(&key(), 1, 60).await.is_admitted());
        assert!(!limiter.check_and_record(&key(), 1, 60).await.is_admitted());

        clock.set(60);
        assert!(limiter.check_and_record(&key(), 1, 60).await.is_admitted());
    }

    #[tokio::test]
    async fn test_admit_reports_remaining() {
        let clock = Arc::new(ManualTimeSource::new(10));
        let limiter = limiter(clock);

        let Decision::Admit(status) = limiter.check_and_record(&key(), 3, 60).await else {
            panic!("expected admit");
        };
        assert_eq!(status.remaining, 2);
        assert_eq!(status.reset_after_seconds, 50);

        let peeked = limiter.status(&key(), 3, 60).await.unwrap();
        assert_eq!(peeked.remaining, 2);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let clock = Arc::new(ManualTimeSource::new(0));
        let limiter = limiter(clock);
        let other = RateLimitKey::for_address("10.9.9.9".parse().unwrap());

        assert!(limiter.check_and_record(&key(), 1, 60).await.is_admitted());
        assert!(limiter.check_and_record(&other, 1, 60).await.is_admitted());
    }

    #[tokio::test]
    async fn test_concurrent_requests_never_exceed_quota() {
        let clock = Arc::new(ManualTimeSource::new(0));
        let limiter = limiter(clock);

        let mut handles = Vec::new();
        for _ in 0..200 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.check_and_record(&key(), 50, 60).await.is_admitted()
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 50);
    }

    #[tokio::test]
    async fn test_store_failure_policies() {
        let clock = Arc::new(ManualTimeSource::new(30));

        let open = RateLimiter::new(Arc::new(DownStore), clock.clone(), StoreFailurePolicy::FailOpen);
        assert_eq!(open.check_and_record(&key(), 1, 60).await, Decision::AdmitUnmetered);

        let closed = RateLimiter::new(Arc::new(DownStore), clock, StoreFailurePolicy::FailClosed);
        assert_eq!(
            closed.check_and_record(&key(), 1, 60).await,
            Decision::Reject { retry_after_secs: 30 }
        );
    }

    #[tokio::test]
    async fn test_flaky_store_never_flips_policy() {
        let clock = Arc::new(ManualTimeSource::new(0));
        let store = FlakyStore {
            inner: MemoryCounterStore::new(clock.clone()),
            calls: AtomicU32::new(0),
        };
        let limiter = RateLimiter::new(Arc::new(store), clock, StoreFailurePolicy::FailClosed);

        for call in 0..10 {
            let decision = limiter.check_and_record(&key(), 100, 60).await;
            if call % 2 == 1 {
                // Every failed store call gets the same deterministic answer.
                assert!(matches!(decision, Decision::Reject { .. }));
            } else {
                assert!(matches!(decision, Decision::Admit(_)));
            }
        }
    }

    proptest! {
        #[test]
        fn prop_first_quota_requests_admitted_next_rejected(
            quota in 1u64..40,
            window in 1u64..7200,
            start in 0u64..1_000_000,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let clock = Arc::new(ManualTimeSource::new(start));
                let limiter = limiter(clock);
                for _ in 0..quota {
                    assert!(limiter.check_and_record(&key(), quota, window).await.is_admitted());
                }
                match limiter.check_and_record(&key(), quota, window).await {
                    Decision::Reject { retry_after_secs } => assert!(retry_after_secs > 0 && retry_after_secs <= window),
                    other => panic!("expected reject, got {other:?}"),
                }
            });
        }
    }
}
