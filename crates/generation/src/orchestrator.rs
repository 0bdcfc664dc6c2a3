//! Resilient generation orchestrator.
//!
//! One [`ResilientGenerator`] can serve any number of concurrent calls. All
//! retry state (attempt counter, backoff timer) lives on the stack of the
//! individual call, so independent calls never affect each other. Dropping
//! the returned future cancels the call, including any pending backoff.

use std::sync::Arc;

use storyloom_core::error::GenerationError;
use storyloom_core::generation::{GeneratedText, GenerationRequest, TextGenerator};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::retry::RetryPolicy;

/// How the retry loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// The generator answered.
    Success { text: GeneratedText, attempts: u32 },
    /// Every attempt failed with a retryable error.
    Exhausted { error: GenerationError, attempts: u32 },
    /// An attempt failed with an error that retrying cannot fix.
    Rejected { error: GenerationError, attempts: u32 },
}

impl AttemptOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Rejected { attempts, .. } => *attempts,
        }
    }
}

/// Why a template was returned instead of generated output.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FallbackReason {
    #[error("retries exhausted: {0}")]
    RetriesExhausted(GenerationError),

    #[error("non-retryable error: {0}")]
    NonRetryable(GenerationError),

    #[error("unparseable response: {0}")]
    Unparseable(GenerationError),
}

impl FallbackReason {
    pub fn error(&self) -> &GenerationError {
        match self {
            Self::RetriesExhausted(e) | Self::NonRetryable(e) | Self::Unparseable(e) => e,
        }
    }
}

/// Where a result came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Provenance {
    /// Produced by the generator (hard success).
    Generated { attempts: u32 },
    /// Produced by a deterministic template (degraded success).
    Fallback { attempts: u32, reason: FallbackReason },
}

impl Provenance {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// Generator calls made, including failed ones.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Generated { attempts } | Self::Fallback { attempts, .. } => *attempts,
        }
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            Self::Generated { .. } => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// A usable value plus how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated<T> {
    pub value: T,
    pub provenance: Provenance,
}

impl<T> Generated<T> {
    pub fn is_degraded(&self) -> bool {
        self.provenance.is_degraded()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Wraps a [`TextGenerator`] with retries, backoff, attempt timeouts and
/// template fallback.
#[derive(Clone)]
pub struct ResilientGenerator {
    generator: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
}

impl ResilientGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>, policy: RetryPolicy) -> Self {
        Self { generator, policy }
    }

    pub fn with_default_policy(generator: Arc<dyn TextGenerator>) -> Self {
        Self::new(generator, RetryPolicy::default())
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Run the retry loop for one logical call.
    pub async fn call(&self, request: GenerationRequest) -> AttemptOutcome {
        self.run(&request, Uuid::new_v4()).await
    }

    /// Generate, parse, and fall back to `fallback()` on any terminal
    /// failure. Never returns an error.
    pub async fn generate_with<T, P, F>(
        &self,
        request: GenerationRequest,
        parse: P,
        fallback: F,
    ) -> Generated<T>
    where
        P: FnOnce(&str) -> Result<T, GenerationError>,
        F: FnOnce() -> T,
    {
        let call_id = Uuid::new_v4();
        let (reason, attempts) = match self.run(&request, call_id).await {
            AttemptOutcome::Success { text, attempts } => match parse(&text.text) {
                Ok(value) => {
                    return Generated {
                        value,
                        provenance: Provenance::Generated { attempts },
                    };
                }
                Err(e) => (FallbackReason::Unparseable(e), attempts),
            },
            AttemptOutcome::Exhausted { error, attempts } => {
                (FallbackReason::RetriesExhausted(error), attempts)
            }
            AttemptOutcome::Rejected { error, attempts } => {
                (FallbackReason::NonRetryable(error), attempts)
            }
        };

        warn!(
            call_id = %call_id,
            generator = %self.generator.name(),
            attempts,
            reason = %reason,
            "Generation degraded: returning template fallback"
        );
        Generated {
            value: fallback(),
            provenance: Provenance::Fallback { attempts, reason },
        }
    }

    async fn run(&self, request: &GenerationRequest, call_id: Uuid) -> AttemptOutcome {
        let name = self.generator.name();
        let max_attempts = self.policy.attempts();
        let timeout = self.policy.attempt_timeout;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let delay = self.policy.delay_before(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            debug!(
                call_id = %call_id,
                generator = %name,
                attempt,
                max_attempts,
                "Generation attempt"
            );

            let result =
                match tokio::time::timeout(timeout, self.generator.generate_text(request.clone()))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(GenerationError::Timeout(format!(
                        "Generator '{}' did not answer within {}s",
                        name,
                        timeout.as_secs()
                    ))),
                };

            match result {
                Ok(text) => {
                    if attempt > 1 {
                        info!(
                            call_id = %call_id,
                            generator = %name,
                            attempts = attempt,
                            "Generation succeeded after retry"
                        );
                    }
                    return AttemptOutcome::Success {
                        text,
                        attempts: attempt,
                    };
                }
                Err(error) if !error.is_retryable() => {
                    warn!(
                        call_id = %call_id,
                        generator = %name,
                        attempt,
                        error = %error,
                        "Generation failed with non-retryable error"
                    );
                    return AttemptOutcome::Rejected {
                        error,
                        attempts: attempt,
                    };
                }
                Err(error) if attempt >= max_attempts => {
                    warn!(
                        call_id = %call_id,
                        generator = %name,
                        attempts = attempt,
                        error = %error,
                        "Generation retries exhausted"
                    );
                    return AttemptOutcome::Exhausted {
                        error,
                        attempts: attempt,
                    };
                }
                Err(error) => {
                    warn!(
                        call_id = %call_id,
                        generator = %name,
                        attempt,
                        error = %error,
                        retry_in_ms = self.policy.delay_before(attempt + 1).as_millis() as u64,
                        "Generation attempt failed, retrying"
                    );
                }
            }
        }
    }
}

impl std::fmt::Debug for ResilientGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientGenerator")
            .field("generator", &self.generator.name())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;
    use storyloom_core::generation::GenerationResult;
    use tokio::time::Instant;

    /// Returns scripted results in order, recording when each call arrived.
    struct ScriptedGenerator {
        script: Mutex<VecDeque<GenerationResult<GeneratedText>>>,
        call_times: Mutex<Vec<Instant>>,
    }

    impl ScriptedGenerator {
        fn new(script: Vec<GenerationResult<GeneratedText>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                call_times: Mutex::new(Vec::new()),
            })
        }

        fn always(error: GenerationError) -> Arc<Self> {
            Self::new(vec![Err(error); 16])
        }

        fn calls(&self) -> usize {
            self.call_times.lock().unwrap().len()
        }

        fn gaps(&self) -> Vec<Duration> {
            let times = self.call_times.lock().unwrap();
            times.windows(2).map(|w| w[1] - w[0]).collect()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate_text(
            &self,
            _request: GenerationRequest,
        ) -> GenerationResult<GeneratedText> {
            self.call_times.lock().unwrap().push(Instant::now());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::Network("script exhausted".into())))
        }
    }

    /// Hangs on the first call, answers on later ones.
    struct SlowThenFastGenerator {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl TextGenerator for SlowThenFastGenerator {
        fn name(&self) -> &str {
            "slow"
        }

        async fn generate_text(
            &self,
            _request: GenerationRequest,
        ) -> GenerationResult<GeneratedText> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if call == 1 {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(GeneratedText::new("finally"))
        }
    }

    /// One script per prompt, so concurrent calls through a single
    /// orchestrator can be told apart.
    struct RoutedGenerator {
        scripts: Mutex<HashMap<String, VecDeque<GenerationResult<GeneratedText>>>>,
        call_times: Mutex<HashMap<String, Vec<Instant>>>,
    }

    impl RoutedGenerator {
        fn new(routes: Vec<(&str, Vec<GenerationResult<GeneratedText>>)>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(
                    routes
                        .into_iter()
                        .map(|(prompt, script)| (prompt.to_string(), script.into()))
                        .collect(),
                ),
                call_times: Mutex::new(HashMap::new()),
            })
        }

        fn calls_for(&self, prompt: &str) -> Vec<Instant> {
            self.call_times
                .lock()
                .unwrap()
                .get(prompt)
                .cloned()
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl TextGenerator for RoutedGenerator {
        fn name(&self) -> &str {
            "routed"
        }

        async fn generate_text(
            &self,
            request: GenerationRequest,
        ) -> GenerationResult<GeneratedText> {
            self.call_times
                .lock()
                .unwrap()
                .entry(request.prompt.clone())
                .or_default()
                .push(Instant::now());
            self.scripts
                .lock()
                .unwrap()
                .get_mut(&request.prompt)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Err(GenerationError::Network("script exhausted".into())))
        }
    }

    /// Paused-clock timers fire on millisecond ticks.
    fn assert_about(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(10),
            "expected ~{expected:?}, got {actual:?}"
        );
    }

    fn network() -> GenerationError {
        GenerationError::Network("connection reset".into())
    }

    fn parse_upper(text: &str) -> Result<String, GenerationError> {
        if text.is_empty() {
            return Err(GenerationError::Parse("empty body".into()));
        }
        Ok(text.to_uppercase())
    }

    #[tokio::test(start_paused = true)]
    async fn retries_then_succeeds_with_growing_delays() {
        let generator = ScriptedGenerator::new(vec![
            Err(network()),
            Err(GenerationError::Api {
                status_code: 503,
                message: "Service Unavailable".into(),
            }),
            Ok(GeneratedText::new("the tide turns")),
        ]);
        let resilient = ResilientGenerator::with_default_policy(generator.clone());

        let outcome = resilient.call(GenerationRequest::new("next chapter")).await;

        assert_eq!(
            outcome,
            AttemptOutcome::Success {
                text: GeneratedText::new("the tide turns"),
                attempts: 3,
            }
        );
        assert_eq!(generator.calls(), 3);
        let gaps = generator.gaps();
        assert_eq!(gaps.len(), 2);
        assert_about(gaps[0], Duration::from_secs(1));
        assert_about(gaps[1], Duration::from_secs(2));
        assert!(gaps[1] > gaps[0]);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_short_circuits() {
        let generator = ScriptedGenerator::new(vec![
            Err(GenerationError::Api {
                status_code: 400,
                message: "bad request".into(),
            }),
            Ok(GeneratedText::new("never reached")),
        ]);
        let resilient = ResilientGenerator::with_default_policy(generator.clone());

        let result = resilient
            .generate_with(GenerationRequest::new("p"), parse_upper, || "TEMPLATE".to_string())
            .await;

        assert_eq!(generator.calls(), 1);
        assert_eq!(result.value, "TEMPLATE");
        assert!(matches!(
            result.provenance.fallback_reason(),
            Some(FallbackReason::NonRetryable(GenerationError::Api { status_code: 400, .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_fall_back() {
        let generator = ScriptedGenerator::always(network());
        let resilient = ResilientGenerator::with_default_policy(generator.clone());

        let result = resilient
            .generate_with(GenerationRequest::new("p"), parse_upper, || "TEMPLATE".to_string())
            .await;

        assert_eq!(generator.calls(), 3);
        assert!(result.is_degraded());
        assert_eq!(result.provenance.attempts(), 3);
        assert!(matches!(
            result.provenance.fallback_reason(),
            Some(FallbackReason::RetriesExhausted(GenerationError::Network(_)))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn unparseable_success_falls_back() {
        let generator = ScriptedGenerator::new(vec![Ok(GeneratedText::new(""))]);
        let resilient = ResilientGenerator::with_default_policy(generator.clone());

        let result = resilient
            .generate_with(GenerationRequest::new("p"), parse_upper, || "TEMPLATE".to_string())
            .await;

        assert_eq!(generator.calls(), 1);
        assert_eq!(result.value, "TEMPLATE");
        assert_eq!(result.provenance.attempts(), 1);
        assert!(matches!(
            result.provenance.fallback_reason(),
            Some(FallbackReason::Unparseable(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn parsed_success_is_not_degraded() {
        let generator = ScriptedGenerator::new(vec![Ok(GeneratedText::new("act one"))]);
        let resilient = ResilientGenerator::with_default_policy(generator);

        let result = resilient
            .generate_with(GenerationRequest::new("p"), parse_upper, || "TEMPLATE".to_string())
            .await;

        assert_eq!(result.value, "ACT ONE");
        assert_eq!(result.provenance, Provenance::Generated { attempts: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn hung_attempt_times_out_and_retries() {
        let generator = Arc::new(SlowThenFastGenerator {
            calls: Mutex::new(0),
        });
        let policy = RetryPolicy {
            attempt_timeout: Duration::from_secs(5),
            ..RetryPolicy::default()
        };
        let resilient = ResilientGenerator::new(generator.clone(), policy);

        let started = Instant::now();
        let outcome = resilient.call(GenerationRequest::new("p")).await;

        assert_eq!(outcome.attempts(), 2);
        assert!(matches!(outcome, AttemptOutcome::Success { .. }));
        assert_eq!(*generator.calls.lock().unwrap(), 2);
        // 5s timeout plus 1s backoff.
        assert_about(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn single_attempt_policy_does_not_retry() {
        let generator = ScriptedGenerator::always(network());
        let resilient = ResilientGenerator::new(generator.clone(), RetryPolicy::no_retry());

        let outcome = resilient.call(GenerationRequest::new("p")).await;

        assert!(matches!(outcome, AttemptOutcome::Exhausted { attempts: 1, .. }));
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_calls_keep_separate_state() {
        let generator = RoutedGenerator::new(vec![
            ("a", vec![Ok(GeneratedText::new("a"))]),
            ("b", vec![Err(network()), Ok(GeneratedText::new("b"))]),
        ]);
        let resilient = ResilientGenerator::with_default_policy(generator.clone());

        let (a, b) = tokio::join!(
            resilient.call(GenerationRequest::new("a")),
            resilient.call(GenerationRequest::new("b")),
        );

        assert_eq!(
            a,
            AttemptOutcome::Success {
                text: GeneratedText::new("a"),
                attempts: 1,
            }
        );
        assert_eq!(
            b,
            AttemptOutcome::Success {
                text: GeneratedText::new("b"),
                attempts: 2,
            }
        );

        let a_calls = generator.calls_for("a");
        let b_calls = generator.calls_for("b");
        assert_eq!(a_calls.len(), 1);
        assert_eq!(b_calls.len(), 2);
        // Both start together; only "b" waits out a backoff.
        assert_eq!(a_calls[0], b_calls[0]);
        assert_about(b_calls[1] - b_calls[0], Duration::from_secs(1));
    }
}
