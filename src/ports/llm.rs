//! LLM client port for language-model completions.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boxed future type alias used by [`LlmClient`] to keep the trait dyn-compatible.
pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CompletionResponse, CompletionError>> + Send + 'a>>;

/// A request to generate a completion from an LLM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionRequest {
    /// The model identifier (e.g. `"gpt-4o"`).
    pub model: String,
    /// The rendered prompt to send as the single user message.
    pub prompt: String,
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// The response from an LLM completion call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionResponse {
    /// The generated text. May be empty; callers decide whether that is acceptable.
    pub text: String,
    /// Number of prompt tokens consumed.
    pub prompt_tokens: u32,
    /// Number of completion tokens generated.
    pub completion_tokens: u32,
}

/// Failure of a completion call.
///
/// Serializable so recorded cassettes keep the error kind, not just its message.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum CompletionError {
    /// HTTP 429. The only kind that is retried with backoff.
    #[error("rate limited by completion API: {message}")]
    RateLimited {
        /// Body of the 429 response.
        message: String,
    },
    /// Any other non-success HTTP status.
    #[error("completion API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },
    /// The request never produced an HTTP response.
    #[error("completion request failed: {0}")]
    Transport(String),
    /// A 2xx response whose body could not be decoded.
    #[error("malformed completion response: {0}")]
    Malformed(String),
    /// A 2xx response with no usable text.
    #[error("model {model} returned an empty completion")]
    EmptyCompletion {
        /// Model that produced the empty completion.
        model: String,
    },
    /// Every attempt was rate limited.
    #[error("model {model} still rate limited after {attempts} attempts")]
    RetriesExhausted {
        /// Model that was being called.
        model: String,
        /// Number of attempts made.
        attempts: u32,
    },
}

impl CompletionError {
    /// Returns `true` for errors that warrant a backoff-and-retry.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Sends completion requests to a language model.
pub trait LlmClient: Send + Sync {
    /// Performs exactly one completion request. Retrying is the caller's concern.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails (network, auth, rate-limit, etc.).
    fn complete(&self, request: &CompletionRequest) -> CompletionFuture<'_>;
}
