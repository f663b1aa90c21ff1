//! Completion client: one prompt, one model, bounded rate-limit retries.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::ports::{Clock, CompletionError, CompletionRequest, LlmClient};

/// Upper bound (exclusive) of the random jitter added to each backoff, in ms.
pub const DEFAULT_MAX_JITTER_MS: u64 = 1000;

/// Bounded exponential backoff applied to rate-limited requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per model, including the first one. At least 1.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub base_delay: Duration,
    /// Exclusive upper bound of the uniform jitter added to each delay.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            max_jitter: Duration::from_millis(DEFAULT_MAX_JITTER_MS),
        }
    }
}

impl RetryPolicy {
    /// The deterministic part of the delay after attempt `attempt` (0-indexed):
    /// `base * 2^attempt`, saturating.
    #[must_use]
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Full delay after attempt `attempt`: `base * 2^attempt` plus jitter in
    /// `[0, max_jitter)`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, rng: &mut impl Rng) -> Duration {
        let ceiling = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = if ceiling == 0 {
            0
        } else {
            rng.gen_range(0..ceiling)
        };
        self.base_delay_for(attempt)
            .saturating_add(Duration::from_millis(jitter))
    }
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Wraps an [`LlmClient`] with the rate-limit retry loop.
pub struct CompletionClient<'a> {
    llm: &'a dyn LlmClient,
    clock: &'a dyn Clock,
    policy: RetryPolicy,
    sampling: Sampling,
}

impl<'a> CompletionClient<'a> {
    /// Creates a client over the given ports.
    #[must_use]
    pub fn new(
        llm: &'a dyn LlmClient,
        clock: &'a dyn Clock,
        policy: RetryPolicy,
        sampling: Sampling,
    ) -> Self {
        Self {
            llm,
            clock,
            policy,
            sampling,
        }
    }

    /// Requests a completion of `prompt` from `model`.
    ///
    /// Rate-limited attempts are retried after an exponential backoff until
    /// `max_attempts` is reached. Every other error is returned as-is on the
    /// first occurrence.
    ///
    /// # Errors
    ///
    /// - [`CompletionError::RetriesExhausted`] when every attempt was rate limited.
    /// - [`CompletionError::EmptyCompletion`] when the model answered with no text.
    /// - Any non-rate-limit error from the underlying client.
    pub async fn complete(&self, prompt: &str, model: &str) -> Result<String, CompletionError> {
        let request = CompletionRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            max_tokens: self.sampling.max_tokens,
            temperature: self.sampling.temperature,
        };
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 0..max_attempts {
            match self.llm.complete(&request).await {
                Ok(response) if response.text.trim().is_empty() => {
                    return Err(CompletionError::EmptyCompletion {
                        model: model.to_string(),
                    });
                }
                Ok(response) => {
                    debug!(
                        model,
                        attempt,
                        prompt_tokens = response.prompt_tokens,
                        completion_tokens = response.completion_tokens,
                        "completion received"
                    );
                    return Ok(response.text);
                }
                Err(err) if err.is_rate_limit() => {
                    if attempt + 1 == max_attempts {
                        break;
                    }
                    let delay = self.policy.delay_for(attempt, &mut rand::thread_rng());
                    warn!(
                        model,
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "rate limited, backing off"
                    );
                    self.clock.sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }

        Err(CompletionError::RetriesExhausted {
            model: model.to_string(),
            attempts: max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::replaying::{llm_cassette, ReplayingLlmClient, VirtualClock};
    use crate::ports::CompletionResponse;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SAMPLING: Sampling = Sampling {
        max_tokens: 64,
        temperature: 0.0,
    };

    fn ok(text: &str) -> Result<CompletionResponse, CompletionError> {
        Ok(CompletionResponse {
            text: text.into(),
            prompt_tokens: 1,
            completion_tokens: 1,
        })
    }

    fn limited() -> Result<CompletionResponse, CompletionError> {
        Err(CompletionError::RateLimited {
            message: "429".into(),
        })
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_jitter: Duration::from_millis(1000),
        }
    }

    fn within(delay: Duration, floor_ms: u64) -> bool {
        let floor = Duration::from_millis(floor_ms);
        delay >= floor && delay < floor + Duration::from_millis(1000)
    }

    #[test]
    fn delay_stays_within_exponential_window() {
        let policy = policy();
        let mut rng = StdRng::seed_from_u64(7);
        for attempt in 0..5 {
            let floor_ms = 100 * 2u64.pow(attempt);
            for _ in 0..200 {
                let delay = policy.delay_for(attempt, &mut rng);
                assert!(within(delay, floor_ms), "attempt {attempt}: {delay:?}");
            }
        }
    }

    #[test]
    fn zero_jitter_is_exact() {
        let policy = RetryPolicy {
            max_jitter: Duration::ZERO,
            ..policy()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(policy.delay_for(3, &mut rng), Duration::from_millis(800));
    }

    #[test]
    fn huge_attempt_index_saturates() {
        let policy = policy();
        let ceiling = Duration::from_millis(100).saturating_mul(u32::MAX);
        assert_eq!(policy.base_delay_for(64), ceiling);
    }

    #[tokio::test]
    async fn success_on_first_attempt_does_not_sleep() {
        let llm = ReplayingLlmClient::new(&llm_cassette([("m", ok("type A = 1;"))]));
        let clock = VirtualClock::default();
        let client = CompletionClient::new(&llm, &clock, policy(), SAMPLING);

        assert_eq!(client.complete("p", "m").await.unwrap(), "type A = 1;");
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn rate_limits_back_off_then_succeed() {
        let cassette = llm_cassette([("m", limited()), ("m", limited()), ("m", ok("x"))]);
        let llm = ReplayingLlmClient::new(&cassette);
        let clock = VirtualClock::default();
        let client = CompletionClient::new(&llm, &clock, policy(), SAMPLING);

        assert_eq!(client.complete("p", "m").await.unwrap(), "x");

        let sleeps = clock.sleeps();
        assert_eq!(sleeps.len(), 2);
        assert!(within(sleeps[0], 100));
        assert!(within(sleeps[1], 200));
    }

    #[tokio::test]
    async fn exhausting_attempts_fails_without_trailing_sleep() {
        let steps = std::iter::repeat_with(|| ("m", limited())).take(5);
        let llm = ReplayingLlmClient::new(&llm_cassette(steps));
        let clock = VirtualClock::default();
        let client = CompletionClient::new(&llm, &clock, policy(), SAMPLING);

        let err = client.complete("p", "m").await.unwrap_err();
        assert_eq!(
            err,
            CompletionError::RetriesExhausted {
                model: "m".into(),
                attempts: 5,
            }
        );
        assert_eq!(clock.sleeps().len(), 4);
        assert_eq!(llm.remaining(), 0);
    }

    #[tokio::test]
    async fn non_rate_limit_error_is_not_retried() {
        let boom = CompletionError::Api {
            status: 500,
            message: "boom".into(),
        };
        let cassette = llm_cassette([("m", Err(boom)), ("m", ok("never reached"))]);
        let llm = ReplayingLlmClient::new(&cassette);
        let clock = VirtualClock::default();
        let client = CompletionClient::new(&llm, &clock, policy(), SAMPLING);

        let err = client.complete("p", "m").await.unwrap_err();
        assert!(matches!(err, CompletionError::Api { status: 500, .. }));
        assert!(clock.sleeps().is_empty());
        assert_eq!(llm.remaining(), 1);
    }

    #[tokio::test]
    async fn blank_completion_is_an_error() {
        let llm = ReplayingLlmClient::new(&llm_cassette([("m", ok("  \n"))]));
        let clock = VirtualClock::default();
        let client = CompletionClient::new(&llm, &clock, policy(), SAMPLING);

        let err = client.complete("p", "m").await.unwrap_err();
        assert_eq!(err, CompletionError::EmptyCompletion { model: "m".into() });
    }

    #[tokio::test]
    async fn zero_max_attempts_still_tries_once() {
        let llm = ReplayingLlmClient::new(&llm_cassette([("m", ok("y"))]));
        let clock = VirtualClock::default();
        let policy = RetryPolicy {
            max_attempts: 0,
            ..policy()
        };
        let client = CompletionClient::new(&llm, &clock, policy, SAMPLING);

        assert_eq!(client.complete("p", "m").await.unwrap(), "y");
    }
}
