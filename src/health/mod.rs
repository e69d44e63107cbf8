//! Service health reporting.
//!
//! # Probes
//! ```text
//! /health        counter store ping + generator probe → healthy | degraded
//! /health/live   process is serving                   → alive
//! /health/ready  generator reachable                  → ready | not_ready
//! ```
//!
//! # Design Decisions
//! - Dependency probes run concurrently, each under its own timeout
//! - A degraded dependency never makes `/health` itself fail; readiness is
//!   the probe orchestrators should act on

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::pipeline::Pipeline;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ComponentHealth {
    fn from_probe<E: std::fmt::Display>(result: Result<Result<(), E>, tokio::time::error::Elapsed>) -> Self {
        match result {
            Ok(Ok(())) => Self {
                status: HealthStatus::Healthy,
                detail: None,
            },
            Ok(Err(e)) => Self {
                status: HealthStatus::Unhealthy,
                detail: Some(e.to_string()),
            },
            Err(_) => Self {
                status: HealthStatus::Unhealthy,
                detail: Some(format!("no answer within {}s", PROBE_TIMEOUT.as_secs())),
            },
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub service: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
    pub components: BTreeMap<&'static str, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Readiness {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.reason.is_none()
    }
}

/// Probe the counter store and the generator.
pub async fn check(pipeline: &Pipeline, environment: &str, uptime: Duration) -> HealthReport {
    let store = pipeline.limiter().store().clone();
    let generator = pipeline.generator().clone();

    let (store, generator) = tokio::join!(
        tokio::time::timeout(PROBE_TIMEOUT, store.ping()),
        tokio::time::timeout(PROBE_TIMEOUT, generator.health_check()),
    );
    let store = ComponentHealth::from_probe(store);
    let generator = ComponentHealth::from_probe(generator);

    let status = if store.is_healthy() && generator.is_healthy() {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };
    if status != HealthStatus::Healthy {
        tracing::warn!(store = ?store.status, generator = ?generator.status, "Health check degraded");
    }

    HealthReport {
        status,
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        environment: environment.to_string(),
        uptime_seconds: uptime.as_secs(),
        timestamp: pipeline.now_rfc3339(),
        components: BTreeMap::from([("counter_store", store), ("generator", generator)]),
    }
}

/// Ready when the generator answers; nothing useful can be served otherwise.
pub async fn readiness(pipeline: &Pipeline) -> Readiness {
    let probe = ComponentHealth::from_probe(
        tokio::time::timeout(PROBE_TIMEOUT, pipeline.generator().health_check()).await,
    );
    match probe.detail {
        None => Readiness {
            status: "ready",
            reason: None,
        },
        Some(reason) => Readiness {
            status: "not_ready",
            reason: Some(format!("diagnosis generator unavailable: {reason}")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemTimeSource;
    use crate::config::GatewayConfig;
    use crate::generator::UnconfiguredGenerator;
    use crate::rate_limit::MemoryCounterStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unconfigured_generator_degrades() {
        let clock = Arc::new(SystemTimeSource);
        let pipeline = Pipeline::new(
            &GatewayConfig::default(),
            Arc::new(MemoryCounterStore::new(clock.clone())),
            Arc::new(UnconfiguredGenerator),
            clock,
        );

        let report = check(&pipeline, "test", Duration::from_secs(5)).await;
        assert_eq!(report.status, HealthStatus::Degraded);
        assert!(report.components["counter_store"].is_healthy());
        assert!(!report.components["generator"].is_healthy());
        assert_eq!(report.uptime_seconds, 5);

        let ready = readiness(&pipeline).await;
        assert!(!ready.is_ready());
        assert_eq!(ready.status, "not_ready");
    }
}
