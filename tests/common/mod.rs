//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use diagnosis_gateway::auth::{TokenClaims, TokenCodec};
use diagnosis_gateway::clock::ManualTimeSource;
use diagnosis_gateway::config::GatewayConfig;
use diagnosis_gateway::generator::{
    DiagnosisGenerator, GeneratedDiagnosis, GenerationError, GenerationRequest, PossibleDiagnosis,
    TreatmentSuggestion,
};
use diagnosis_gateway::{GatewayServer, Shutdown};

pub const API_KEY: &str = "svc-key-0123456789abcdef";
pub const JWT_SECRET: &str = "jwt-secret-0123456789abcdef0123456789";
pub const SERVICE: &str = "intake";
pub const NOW: u64 = 1_700_000_000;

pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.environment = "test".to_string();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.auth.api_key = API_KEY.to_string();
    config.auth.jwt_secret = JWT_SECRET.to_string();
    config.auth.allowed_services = vec![SERVICE.to_string()];
    config.rate_limit.requests = 3;
    config.rate_limit.window_secs = 60;
    config.generator.max_attempts = 2;
    config.generator.base_delay_ms = 1;
    config.generator.max_delay_ms = 5;
    config.security.max_body_size = 16 * 1024;
    config.observability.metrics_enabled = false;
    config
}

fn suggestion(name: &str, reason: &str) -> TreatmentSuggestion {
    TreatmentSuggestion {
        name: name.to_string(),
        dosage: "150mg".to_string(),
        frequency: "once".to_string(),
        duration: "1 day".to_string(),
        reason: reason.to_string(),
        notes: None,
    }
}

pub fn diagnosis() -> GeneratedDiagnosis {
    GeneratedDiagnosis {
        possible_diagnoses: vec![PossibleDiagnosis {
            name: "Vaginal candidiasis".to_string(),
            confidence_score: 0.8,
            description: Some("Yeast overgrowth".to_string()),
        }],
        suggestions: vec![
            suggestion("Fluconazole", "candidiasis"),
            suggestion("Amoxicillin", "secondary infection"),
        ],
        clinical_reasoning: "White discharge with severe itching".to_string(),
        differential_considerations: vec!["Bacterial vaginosis".to_string()],
        recommended_investigations: vec![],
        patient_education: vec!["Avoid scented products".to_string()],
        confidence_score: 0.8,
    }
}

/// Generator returning canned output and counting calls.
pub struct ScriptedGenerator {
    output: Result<GeneratedDiagnosis, GenerationError>,
    calls: AtomicU32,
}

impl ScriptedGenerator {
    pub fn ok() -> Arc<Self> {
        Self::returning(Ok(diagnosis()))
    }

    pub fn returning(output: Result<GeneratedDiagnosis, GenerationError>) -> Arc<Self> {
        Arc::new(Self {
            output,
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiagnosisGenerator for ScriptedGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<GeneratedDiagnosis, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output.clone()
    }
}

pub fn server(config: GatewayConfig, generator: Arc<dyn DiagnosisGenerator>) -> GatewayServer {
    GatewayServer::with_clock(config, generator, Arc::new(ManualTimeSource::new(NOW)))
}

pub fn structured_payload() -> Value {
    json!({
        "patient_profile": { "age": 29, "request_id": "req_allergy_002", "timestamp": "2025-01-15T10:30:00Z" },
        "primary_complaint": {
            "main_symptom": "vaginal_discharge",
            "duration": "3 days",
            "severity": "moderate",
            "onset": "gradual",
            "progression": "stable"
        },
        "symptom_specific_details": {
            "discharge_characteristics": {
                "color": "white",
                "consistency": "cottage cheese",
                "odor": "none",
                "associated_itching": "severe"
            }
        },
        "medical_context": { "allergies": ["penicillin"], "medical_conditions": [] }
    })
}

pub fn simple_payload() -> Value {
    json!({
        "symptoms": ["vaginal discharge", "itching"],
        "patient_age": 29,
        "severity_level": "moderate",
        "duration": "3 days"
    })
}

/// Sign a token valid around `NOW`.
pub fn bearer_token(subject: &str, scope: Option<&str>) -> String {
    TokenCodec::new(JWT_SECRET)
        .sign(&TokenClaims {
            sub: subject.to_string(),
            iat: NOW - 60,
            exp: NOW + 3600,
            scope: scope.map(str::to_string),
        })
        .unwrap()
}

/// Sign a token valid around the real clock.
pub fn live_bearer_token(subject: &str) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    TokenCodec::new(JWT_SECRET)
        .sign(&TokenClaims {
            sub: subject.to_string(),
            iat: now,
            exp: now + 3600,
            scope: None,
        })
        .unwrap()
}

/// Start an upstream generator over HTTP. Returns the generate endpoint URL
/// and the call counter.
pub async fn start_mock_generator(body: Value) -> (String, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let router = Router::new()
        .route(
            "/generate",
            post(move || {
                let counter = counter.clone();
                let body = body.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(body)
                }
            }),
        )
        .route("/health", get(|| async { "ok" }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}/generate"), calls)
}

/// Run a gateway on a real ephemeral port.
pub async fn spawn_gateway(server: GatewayServer) -> (SocketAddr, Shutdown, mpsc::UnboundedSender<GatewayConfig>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();

    let stop = shutdown.clone();
    tokio::spawn(async move {
        server.run(listener, updates_rx, &stop).await.unwrap();
    });
    (addr, shutdown, updates_tx)
}
