//! End-to-end: real listener, HTTP generator upstream, SDK client.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;

use diagnosis_gateway::clock::ManualTimeSource;
use diagnosis_gateway::http::{build_generator, GatewayServer};
use diagnosis_gateway::rate_limit::CounterStore;
use gateway_sdk::{Credentials, DiagnosisClient, SdkError, SimpleDiagnosisRequest};

mod common;
use common::{API_KEY, SERVICE};

#[tokio::test]
async fn test_full_flow_through_sdk() {
    let (endpoint, upstream_calls) =
        common::start_mock_generator(serde_json::to_value(common::diagnosis()).unwrap()).await;

    let mut config = common::test_config();
    config.generator.endpoint = Some(endpoint);
    let generator = build_generator(&config.generator).unwrap();
    let (addr, shutdown, config_updates) =
        common::spawn_gateway(GatewayServer::new(config.clone(), generator)).await;
    let base = format!("http://{addr}");

    let service = DiagnosisClient::new(&base, Credentials::service_key(API_KEY, SERVICE));

    // Structured diagnosis: the penicillin allergy withholds amoxicillin.
    let response = service
        .diagnose_structured(&common::structured_payload())
        .await
        .unwrap();
    assert_eq!(response.request_id, "req_allergy_002");
    assert_eq!(response.safety_assessment.allergic_medications, vec!["Amoxicillin"]);
    assert_eq!(response.recommended_medications.len(), 1);
    assert_eq!(response.recommended_medications[0].name, "Fluconazole");
    assert_eq!(upstream_calls.load(Ordering::SeqCst), 1);

    let quota = service.quota().await.unwrap();
    assert_eq!(quota.limit, 3);
    assert_eq!(quota.remaining, 2);

    // Validation failures come back typed, with every field error.
    let err = service
        .validate(&json!({ "patient_profile": { "age": 200 } }))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
    match err {
        SdkError::Api { body, .. } => {
            assert_eq!(body.error_code, "VALIDATION_ERROR");
            assert!(body.errors.len() > 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Bearer callers get their own quota.
    let user = DiagnosisClient::new(&base, Credentials::bearer(common::live_bearer_token("user-42")));
    let simple = user
        .diagnose(&SimpleDiagnosisRequest {
            symptoms: vec!["Vaginal Discharge".to_string(), "itching".to_string()],
            patient_age: 31,
            severity_level: None,
            duration: "2 days".to_string(),
            onset: None,
            progression: None,
        })
        .await
        .unwrap();
    assert!(!simple.possible_diagnoses.is_empty());
    assert_eq!(user.quota().await.unwrap().remaining, 2);

    let anonymous = DiagnosisClient::new(&base, Credentials::Anonymous);
    let err = anonymous.quota().await.unwrap_err();
    assert_eq!(err.error_code(), Some("AUTHENTICATION_ERROR"));

    let health = anonymous.health().await.unwrap();
    assert_eq!(health["status"], "healthy");

    // Hot reload: a tighter quota applies without a restart.
    let mut tighter = config;
    tighter.rate_limit.requests = 1;
    config_updates.send(tighter).unwrap();
    let fresh = DiagnosisClient::new(&base, Credentials::bearer(common::live_bearer_token("user-99")));
    let mut reloaded = false;
    for _ in 0..50 {
        if fresh.quota().await.unwrap().limit == 1 {
            reloaded = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(reloaded, "reloaded config never took effect");

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_outage_surfaces_as_503() {
    let mut config = common::test_config();
    // Nothing listens on port 9 locally.
    config.generator.endpoint = Some("http://127.0.0.1:9/generate".to_string());
    let generator = build_generator(&config.generator).unwrap();
    let (addr, shutdown, _updates) = common::spawn_gateway(GatewayServer::new(config, generator)).await;

    let client = DiagnosisClient::new(&format!("http://{addr}"), Credentials::service_key(API_KEY, SERVICE));
    let err = client
        .diagnose_structured(&common::structured_payload())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    assert_eq!(err.error_code(), Some("GENERATION_ERROR"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_expired_counters_are_swept_when_limiting_starts_disabled() {
    let mut config = common::test_config();
    config.rate_limit.enabled = false;
    config.rate_limit.sweep_interval_secs = 1;
    let clock = Arc::new(ManualTimeSource::new(common::NOW));
    let server = GatewayServer::with_clock(config.clone(), common::ScriptedGenerator::ok(), clock.clone());
    let counters = server.counters();

    let (_addr, shutdown, config_updates) = common::spawn_gateway(server).await;

    // Limiting switched on by a reload leaves per-window keys behind.
    let mut enabled = config;
    enabled.rate_limit.enabled = true;
    config_updates.send(enabled).unwrap();
    counters.increment_with_expiry("rl:service:intake:28333333", 60).await.unwrap();
    assert_eq!(counters.len(), 1);

    clock.advance(61);
    let mut swept = false;
    for _ in 0..60 {
        if counters.is_empty() {
            swept = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(swept, "expired counters were never swept");

    shutdown.trigger();
}
