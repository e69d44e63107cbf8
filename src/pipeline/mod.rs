//! Request pipeline coordination.
//!
//! # Data Flow
//! ```text
//! Received
//!     → Authenticated (IdentityResolver + endpoint scope)
//!     → RateChecked (RateLimiter, keyed by principal or peer address)
//!     → Validated (simple or structured intake)
//!     → AwaitingGeneration (retrying DiagnosisGenerator)
//!     → Assessed (SafetyAssessor + RiskAssessment)
//!     → Completed
//! any live stage → Failed (first error wins, nothing later runs)
//! ```
//!
//! # Design Decisions
//! - The coordinator only orders and short-circuits; generator retries live
//!   in `RetryingGenerator`
//! - The counter increment runs on its own task so a disconnecting caller
//!   cannot leave it half done
//! - A `Pipeline` is immutable; config reloads build a new one

pub mod error;
pub mod response;
pub mod stage;

use std::sync::Arc;

use crate::auth::{AuthError, Credentials, IdentityResolver, Principal, SCOPE_SIMPLE, SCOPE_STRUCTURED};
use crate::clock::{self, TimeSource};
use crate::config::{AuthConfig, GatewayConfig, RateLimitConfig};
use crate::generator::{DiagnosisGenerator, GenerationRequest, Intake, RetryingGenerator};
use crate::intake::{validate_simple_bytes, validate_structured_bytes, MainSymptom, MedicalContext};
use crate::observability::metrics;
use crate::rate_limit::{CounterStore, QuotaStatus, RateLimitKey, RateLimiter, StoreError};
use crate::safety::{RiskAssessment, RiskFactors, SafetyAssessor};

pub use error::PipelineError;
pub use response::{DiagnosisResponse, Outcome, ValidationReport};
pub use stage::{Stage, StageTracker};

use response::Subject;

/// Per-request inputs that do not come from the body.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Transport-level id (`x-request-id`).
    pub request_id: String,
    pub credentials: Credentials,
}

/// Everything a request needs, built from one config snapshot.
#[derive(Clone)]
pub struct Pipeline {
    resolver: IdentityResolver,
    limiter: RateLimiter,
    generator: Arc<dyn DiagnosisGenerator>,
    assessor: SafetyAssessor,
    auth: AuthConfig,
    rate_limit: RateLimitConfig,
    disclaimer: String,
    test_endpoint: bool,
    clock: Arc<dyn TimeSource>,
}

impl Pipeline {
    /// Build from config. `generator` is wrapped in bounded retries here;
    /// `store` is shared across reloads so counters survive them.
    pub fn new(
        config: &GatewayConfig,
        store: Arc<dyn CounterStore>,
        generator: Arc<dyn DiagnosisGenerator>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            resolver: IdentityResolver::new(&config.auth, clock.clone()),
            limiter: RateLimiter::new(store, clock.clone(), config.rate_limit.store_failure_policy),
            generator: Arc::new(RetryingGenerator::from_config(generator, &config.generator)),
            assessor: SafetyAssessor::new(),
            auth: config.auth.clone(),
            rate_limit: config.rate_limit.clone(),
            disclaimer: config.medical_disclaimer.clone(),
            test_endpoint: config.security.enable_test_endpoint,
            clock,
        }
    }

    pub fn auth_config(&self) -> &AuthConfig {
        &self.auth
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn generator(&self) -> &Arc<dyn DiagnosisGenerator> {
        &self.generator
    }

    pub fn test_endpoint_enabled(&self) -> bool {
        self.test_endpoint
    }

    pub fn now_rfc3339(&self) -> String {
        clock::rfc3339(self.clock.now())
    }

    /// `POST /diagnosis`: symptom list intake.
    pub async fn diagnose_simple(
        &self,
        call: &CallContext,
        body: &[u8],
    ) -> Result<Outcome<DiagnosisResponse>, PipelineError> {
        let mut tracker = StageTracker::new(call.request_id.as_str());
        let result = self.run_simple(&mut tracker, call, body).await;
        settle(&mut tracker, result)
    }

    /// `POST /diagnosis/structured`.
    pub async fn diagnose_structured(
        &self,
        call: &CallContext,
        body: &[u8],
    ) -> Result<Outcome<DiagnosisResponse>, PipelineError> {
        let mut tracker = StageTracker::new(call.request_id.as_str());
        let result = self.run_structured(&mut tracker, call, body, true).await;
        settle(&mut tracker, result)
    }

    /// `POST /diagnosis/structured/test`: no authentication, limited by peer
    /// address. Only routed when the test endpoint is enabled.
    pub async fn diagnose_structured_unauthenticated(
        &self,
        call: &CallContext,
        body: &[u8],
    ) -> Result<Outcome<DiagnosisResponse>, PipelineError> {
        let mut tracker = StageTracker::new(call.request_id.as_str());
        let result = self.run_structured(&mut tracker, call, body, false).await;
        settle(&mut tracker, result)
    }

    /// `POST /diagnosis/validate`: the structured validator alone.
    pub async fn validate_only(
        &self,
        call: &CallContext,
        body: &[u8],
    ) -> Result<Outcome<ValidationReport>, PipelineError> {
        let mut tracker = StageTracker::new(call.request_id.as_str());
        let result = self.run_validation(&mut tracker, call, body).await;
        settle(&mut tracker, result)
    }

    /// `GET /diagnosis/quota`: the caller's position in the current window.
    /// Reads the store without counting.
    pub async fn quota(&self, call: &CallContext) -> Result<QuotaStatus, PipelineError> {
        let mut tracker = StageTracker::new(call.request_id.as_str());
        let result = match self.authenticate(&mut tracker, &call.credentials, None) {
            Ok(principal) => self
                .limiter
                .status(
                    &RateLimitKey::for_principal(&principal),
                    self.rate_limit.requests,
                    self.rate_limit.window_secs,
                )
                .await
                .map_err(PipelineError::from),
            Err(e) => Err(e),
        };
        settle(&mut tracker, result)
    }

    async fn run_simple(
        &self,
        tracker: &mut StageTracker,
        call: &CallContext,
        body: &[u8],
    ) -> Result<Outcome<DiagnosisResponse>, PipelineError> {
        let principal = self.authenticate(tracker, &call.credentials, Some(SCOPE_SIMPLE))?;
        let quota = self.rate_check(tracker, RateLimitKey::for_principal(&principal)).await?;

        let request = validate_simple_bytes(body).inspect_err(|_| metrics::record_validation_failure("simple"))?;
        tracker.advance(Stage::Validated);

        let factors = RiskFactors::from(&request);
        let subject = Subject {
            request_id: call.request_id.clone(),
            patient_age: request.patient_age,
            primary_symptom: request.inferred_symptom(),
        };
        let generation = GenerationRequest {
            request_id: call.request_id.clone(),
            intake: Intake::Simple(request),
        };

        let body = self
            .generate_and_assess(tracker, generation, &MedicalContext::default(), &factors, subject)
            .await?;
        Ok(Outcome { body, quota })
    }

    async fn run_structured(
        &self,
        tracker: &mut StageTracker,
        call: &CallContext,
        body: &[u8],
        authenticated: bool,
    ) -> Result<Outcome<DiagnosisResponse>, PipelineError> {
        let key = if authenticated {
            let principal = self.authenticate(tracker, &call.credentials, Some(SCOPE_STRUCTURED))?;
            RateLimitKey::for_principal(&principal)
        } else {
            tracing::warn!(request_id = %call.request_id, "Authentication bypassed on test endpoint");
            tracker.advance(Stage::Authenticated);
            RateLimitKey::derive(None, call.credentials.remote_addr)
        };
        let quota = self.rate_check(tracker, key).await?;

        let request =
            validate_structured_bytes(body).inspect_err(|_| metrics::record_validation_failure("structured"))?;
        tracker.advance(Stage::Validated);

        let context = request.medical_context.clone().unwrap_or_default();
        let factors = RiskFactors::from(&request);
        let subject = Subject {
            request_id: request.patient_profile.request_id.clone(),
            patient_age: request.patient_profile.age,
            primary_symptom: Some(request.main_symptom()),
        };
        let generation = GenerationRequest {
            request_id: subject.request_id.clone(),
            intake: Intake::Structured(request),
        };

        let body = self
            .generate_and_assess(tracker, generation, &context, &factors, subject)
            .await?;
        Ok(Outcome { body, quota })
    }

    async fn run_validation(
        &self,
        tracker: &mut StageTracker,
        call: &CallContext,
        body: &[u8],
    ) -> Result<Outcome<ValidationReport>, PipelineError> {
        let principal = self.authenticate(tracker, &call.credentials, Some(SCOPE_STRUCTURED))?;
        let quota = self.rate_check(tracker, RateLimitKey::for_principal(&principal)).await?;

        let request =
            validate_structured_bytes(body).inspect_err(|_| metrics::record_validation_failure("structured"))?;
        tracker.advance(Stage::Validated);

        Ok(Outcome {
            body: ValidationReport {
                valid: true,
                request_id: request.patient_profile.request_id.clone(),
                primary_symptom: request.main_symptom(),
            },
            quota,
        })
    }

    fn authenticate(
        &self,
        tracker: &mut StageTracker,
        credentials: &Credentials,
        scope: Option<&str>,
    ) -> Result<Principal, PipelineError> {
        let resolved = self.resolver.resolve(credentials).and_then(|principal| {
            if let Some(scope) = scope {
                principal.require_scope(scope)?;
            }
            Ok(principal)
        });
        let principal = resolved.inspect_err(|e: &AuthError| metrics::record_auth_failure(e.kind()))?;

        tracing::debug!(
            request_id = %tracker.request_id(),
            identity = %principal.identity_id(),
            identity_kind = principal.identity_kind().as_str(),
            "Caller authenticated"
        );
        tracker.advance(Stage::Authenticated);
        Ok(principal)
    }

    async fn rate_check(
        &self,
        tracker: &mut StageTracker,
        key: RateLimitKey,
    ) -> Result<Option<QuotaStatus>, PipelineError> {
        if !self.rate_limit.enabled {
            tracker.advance(Stage::RateChecked);
            return Ok(None);
        }

        let (quota, window) = (self.rate_limit.requests, self.rate_limit.window_secs);
        let limiter = self.limiter.clone();
        let task_key = key.clone();
        let decision = match tokio::spawn(async move { limiter.check_and_record(&task_key, quota, window).await }).await {
            Ok(decision) => decision,
            Err(e) => {
                let error = StoreError::Unavailable(format!("rate limit task failed: {e}"));
                self.limiter.store_unreachable(&key, &error, window)
            }
        };

        let status = decision.into_result()?;
        tracker.advance(Stage::RateChecked);
        Ok(status)
    }

    async fn generate_and_assess(
        &self,
        tracker: &mut StageTracker,
        generation: GenerationRequest,
        context: &MedicalContext,
        factors: &RiskFactors,
        subject: Subject,
    ) -> Result<DiagnosisResponse, PipelineError> {
        tracker.advance(Stage::AwaitingGeneration);
        let diagnosis = self.generator.generate(&generation).await?;

        let complaint: Option<MainSymptom> = subject.primary_symptom;
        let safety = self.assessor.assess(context, &diagnosis.suggestions, complaint);
        let risk = RiskAssessment::evaluate(factors, &safety);
        tracker.advance(Stage::Assessed);

        if !safety.allergic_medications.is_empty() || safety.has_gaps() {
            tracing::warn!(
                request_id = %tracker.request_id(),
                allergic = ?safety.allergic_medications,
                gaps = safety.gaps.len(),
                "Safety findings attached to response"
            );
        }

        let response = DiagnosisResponse::assemble(subject, diagnosis, safety, risk, &self.disclaimer, self.now_rfc3339());
        tracker.advance(Stage::Completed);
        tracing::info!(
            request_id = %tracker.request_id(),
            urgency = ?response.risk_assessment.urgency_level,
            "Diagnosis completed"
        );
        Ok(response)
    }
}

/// Record a failure against the last stage reached.
fn settle<T>(tracker: &mut StageTracker, result: Result<T, PipelineError>) -> Result<T, PipelineError> {
    if let Err(e) = &result {
        let stage = tracker.fail();
        metrics::record_pipeline_failure(stage.as_str());
        tracing::warn!(
            request_id = %tracker.request_id(),
            stage = %stage,
            error_kind = e.kind(),
            error = %e,
            "Request rejected"
        );
    }
    result
}
