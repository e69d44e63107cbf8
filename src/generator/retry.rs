//! Bounded retries around a generator.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::GeneratorConfig;
use crate::generator::{DiagnosisGenerator, GeneratedDiagnosis, GenerationError, GenerationRequest};
use crate::observability::metrics;
use crate::resilience::Backoff;

/// Retries `UpstreamUnavailable` up to `max_attempts` total attempts.
/// Malformed output is returned immediately.
#[derive(Clone)]
pub struct RetryingGenerator {
    inner: Arc<dyn DiagnosisGenerator>,
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryingGenerator {
    pub fn new(inner: Arc<dyn DiagnosisGenerator>, max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(inner: Arc<dyn DiagnosisGenerator>, config: &GeneratorConfig) -> Self {
        Self::new(
            inner,
            config.max_attempts,
            Backoff::new(config.base_delay_ms, config.max_delay_ms),
        )
    }
}

#[async_trait]
impl DiagnosisGenerator for RetryingGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedDiagnosis, GenerationError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.inner.generate(request).await {
                Ok(diagnosis) => {
                    metrics::record_generation_attempt("success");
                    return Ok(diagnosis);
                }
                Err(e) => {
                    metrics::record_generation_attempt(e.kind());
                    if !e.is_retryable() || attempt >= self.max_attempts {
                        tracing::error!(
                            request_id = %request.request_id,
                            attempt,
                            error = %e,
                            "Diagnosis generation failed"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff.delay(attempt);
                    tracing::warn!(
                        request_id = %request.request_id,
                        attempt,
                        delay = ?delay,
                        error = %e,
                        "Retrying diagnosis generation"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn health_check(&self) -> Result<(), GenerationError> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{Intake, PossibleDiagnosis};
    use crate::intake::{DiagnosisRequest, Severity};
    use std::sync::Mutex;

    /// Replays scripted results, then keeps returning the last one.
    struct Scripted {
        results: Mutex<Vec<Result<GeneratedDiagnosis, GenerationError>>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(mut results: Vec<Result<GeneratedDiagnosis, GenerationError>>) -> Arc<Self> {
            results.reverse();
            Arc::new(Self {
                results: Mutex::new(results),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl DiagnosisGenerator for Scripted {
        async fn generate(&self, _request: &GenerationRequest) -> Result<GeneratedDiagnosis, GenerationError> {
            *self.calls.lock().unwrap() += 1;
            let mut results = self.results.lock().unwrap();
            if results.len() > 1 {
                results.pop().unwrap()
            } else {
                results[0].clone()
            }
        }
    }

    fn ok() -> Result<GeneratedDiagnosis, GenerationError> {
        Ok(GeneratedDiagnosis {
            possible_diagnoses: vec![PossibleDiagnosis {
                name: "Dysmenorrhea".to_string(),
                confidence_score: 0.7,
                description: None,
            }],
            suggestions: vec![],
            clinical_reasoning: String::new(),
            differential_considerations: vec![],
            recommended_investigations: vec![],
            patient_education: vec![],
            confidence_score: 0.7,
        })
    }

    fn down() -> Result<GeneratedDiagnosis, GenerationError> {
        Err(GenerationError::UpstreamUnavailable("connection reset".to_string()))
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            request_id: "req-retry".to_string(),
            intake: Intake::Simple(DiagnosisRequest {
                symptoms: vec!["painful periods".to_string()],
                patient_age: 22,
                severity_level: Severity::Mild,
                duration: "1 day".to_string(),
                onset: None,
                progression: None,
            }),
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let inner = Scripted::new(vec![down(), down(), ok()]);
        let generator = RetryingGenerator::new(inner.clone(), 3, Backoff::new(1, 5));

        assert!(generator.generate(&request()).await.is_ok());
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let inner = Scripted::new(vec![down()]);
        let generator = RetryingGenerator::new(inner.clone(), 3, Backoff::new(1, 5));

        let err = generator.generate(&request()).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test]
    async fn test_malformed_output_is_not_retried() {
        let inner = Scripted::new(vec![Err(GenerationError::UpstreamMalformedOutput("not json".to_string()))]);
        let generator = RetryingGenerator::new(inner.clone(), 5, Backoff::new(1, 5));

        assert!(generator.generate(&request()).await.is_err());
        assert_eq!(inner.calls(), 1);
    }
}
