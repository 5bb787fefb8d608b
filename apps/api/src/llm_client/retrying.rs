//! Cache-aware, rate-limited, retrying wrapper around a `TextGenerator`.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::retry::{countdown, Decision, ProgressSink, RetryEvent, RetryPolicy};
use super::{ApiFailure, LlmError, TextGenerator};
use crate::session::{Fingerprint, RateLimiter, ResponseCache};

/// Result text plus whether it came from the session cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub text: String,
    pub cached: bool,
}

#[derive(Clone)]
pub struct RetryingClient {
    generator: Arc<dyn TextGenerator>,
    model: String,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(generator: Arc<dyn TextGenerator>, model: impl Into<String>) -> Self {
        Self::with_policy(generator, model, RetryPolicy::default())
    }

    pub fn with_policy(
        generator: Arc<dyn TextGenerator>,
        model: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            generator,
            model: model.into(),
            policy,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Runs one call sequence for `prompt`.
    ///
    /// 1. A cache hit on `fingerprint` returns immediately: no rate-limit check, no network.
    /// 2. Otherwise the rate limiter must allow the call; a refusal is `LlmError::Throttled`.
    /// 3. Up to `max_attempts` network attempts follow a warm-up delay, with waits between
    ///    failures chosen by `RetryPolicy`.
    /// 4. Success is cached under `fingerprint` when one was given. Failures write nothing.
    pub async fn invoke(
        &self,
        cache: &mut ResponseCache,
        limiter: &mut RateLimiter,
        prompt: &str,
        fingerprint: Option<&Fingerprint>,
        progress: &dyn ProgressSink,
    ) -> Result<Completion, LlmError> {
        if let Some(fp) = fingerprint {
            if let Some(hit) = cache.lookup(fp) {
                debug!("Cache hit for {}", fp.as_str());
                progress.on_event(RetryEvent::CacheHit);
                return Ok(Completion {
                    text: hit.to_string(),
                    cached: true,
                });
            }
        }

        let acquire = limiter.try_acquire();
        if !acquire.allowed {
            warn!(
                "Call refused by rate limiter: {:.1}s remaining",
                acquire.remaining_wait_seconds
            );
            return Err(LlmError::Throttled {
                remaining_wait_seconds: acquire.remaining_wait_seconds,
            });
        }
        limiter.record_dispatch();

        let text = self.call_with_retry(prompt, progress).await?;

        if let Some(fp) = fingerprint {
            cache.store(fp.clone(), text.clone());
        }

        Ok(Completion {
            text,
            cached: false,
        })
    }

    async fn call_with_retry(
        &self,
        prompt: &str,
        progress: &dyn ProgressSink,
    ) -> Result<String, LlmError> {
        let max_attempts = self.policy.max_attempts;
        tokio::time::sleep(self.policy.warm_up).await;

        for attempt in 0..max_attempts {
            progress.on_event(RetryEvent::Attempt {
                attempt: attempt + 1,
                max_attempts,
            });

            let failure = match self.generator.generate(&self.model, prompt).await {
                Ok(text) => {
                    progress.on_event(RetryEvent::Succeeded {
                        attempt: attempt + 1,
                    });
                    return Ok(text);
                }
                Err(failure) => failure,
            };

            progress.on_event(RetryEvent::Failed {
                attempt: attempt + 1,
                kind: failure.kind,
                message: failure.message.clone(),
            });

            match self.policy.decide(attempt, failure.kind) {
                Decision::Retry { wait } => {
                    wait_with_progress(wait, attempt + 1, &failure, progress).await;
                }
                Decision::GiveUp => {
                    info!(
                        "Giving up after {max_attempts} attempts ({:?}): {}",
                        failure.kind, failure.message
                    );
                    return Err(LlmError::exhausted(max_attempts, failure));
                }
            }
        }

        // `decide` always gives up on the final attempt; max_attempts of zero lands here.
        Err(LlmError::exhausted(
            max_attempts,
            ApiFailure::new(None, None, "no attempts were made"),
        ))
    }
}

/// Sleeps for `wait` in one-second ticks, reporting the remaining time before each tick.
async fn wait_with_progress(
    wait: Duration,
    attempt: u32,
    failure: &ApiFailure,
    progress: &dyn ProgressSink,
) {
    let mut remaining = wait;
    for remaining_secs in countdown(wait) {
        progress.on_event(RetryEvent::Waiting {
            attempt,
            kind: failure.kind,
            remaining_secs,
        });
        let step = remaining.min(Duration::from_secs(1));
        tokio::time::sleep(step).await;
        remaining -= step;
    }
}
