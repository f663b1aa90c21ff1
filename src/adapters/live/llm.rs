//! Live adapter for the `LlmClient` port using the OpenAI chat-completions API.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::ports::llm::{
    CompletionError, CompletionFuture, CompletionRequest, CompletionResponse, LlmClient,
};

/// Live LLM client that calls an OpenAI-compatible chat-completions endpoint.
pub struct LiveLlmClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LiveLlmClient {
    /// Creates a new live LLM client for the given credential and base URL
    /// (e.g. `https://api.openai.com/v1`).
    #[must_use]
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Request body sent to the chat-completions API.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

/// A single message in the request.
#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Top-level response from the chat-completions API.
#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Token usage reported by the API.
#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Error envelope returned by the API on non-success statuses.
#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Maps a non-success status and its body to the matching error kind.
fn classify_failure(status: StatusCode, body: String) -> CompletionError {
    let message = serde_json::from_str::<ApiError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    if status == StatusCode::TOO_MANY_REQUESTS {
        CompletionError::RateLimited { message }
    } else {
        CompletionError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// Decodes a success body. Absent content decodes to an empty string.
fn parse_success(body: &str) -> Result<CompletionResponse, CompletionError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| CompletionError::Malformed(e.to_string()))?;
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();
    let (prompt_tokens, completion_tokens) = response
        .usage
        .map_or((0, 0), |u| (u.prompt_tokens, u.completion_tokens));
    Ok(CompletionResponse {
        text,
        prompt_tokens,
        completion_tokens,
    })
}

impl LlmClient for LiveLlmClient {
    fn complete(&self, request: &CompletionRequest) -> CompletionFuture<'_> {
        let request = request.clone();

        Box::pin(async move {
            let body = ChatRequest {
                model: &request.model,
                max_tokens: request.max_tokens,
                temperature: request.temperature,
                messages: vec![ChatMessage {
                    role: "user",
                    content: &request.prompt,
                }],
            };

            let response = self
                .client
                .post(self.endpoint())
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| CompletionError::Transport(e.to_string()))?;

            let status = response.status();
            let response_text = response
                .text()
                .await
                .map_err(|e| CompletionError::Transport(e.to_string()))?;

            if !status.is_success() {
                return Err(classify_failure(status, response_text));
            }
            parse_success(&response_text)
        })
    }
}
