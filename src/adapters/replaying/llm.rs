//! Replaying adapter for the `LlmClient` port.

use std::sync::Mutex;

use crate::cassette::format::Cassette;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{
    CompletionError, CompletionFuture, CompletionRequest, CompletionResponse, LlmClient,
};

/// Serves recorded LLM completions from a cassette.
///
/// Each served interaction must have been recorded for the same model as the
/// incoming request; a mismatch means the call sequence diverged from the
/// recording and panics.
pub struct ReplayingLlmClient {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingLlmClient {
    /// Create a replaying LLM client serving the given cassette.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        Self {
            replayer: Mutex::new(CassetteReplayer::new(cassette, "llm", "complete")),
        }
    }

    /// Number of recorded completions not yet served.
    ///
    /// # Panics
    ///
    /// Panics if the replayer lock is poisoned.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.replayer
            .lock()
            .expect("replayer lock poisoned")
            .remaining()
    }

    fn next(&self, request: &CompletionRequest) -> Result<CompletionResponse, CompletionError> {
        let interaction = {
            let mut replayer = self.replayer.lock().expect("replayer lock poisoned");
            replayer.next_interaction()
        };

        let recorded_model = interaction.input.get("model").and_then(|m| m.as_str());
        if let Some(recorded) = recorded_model {
            assert!(
                recorded == request.model,
                "Cassette mismatch at seq={}: recorded model {recorded:?}, requested {:?}",
                interaction.seq,
                request.model,
            );
        }

        serde_json::from_value(interaction.output).map_err(|e| {
            CompletionError::Malformed(format!("cassette seq {}: {e}", interaction.seq))
        })?
    }
}

impl LlmClient for ReplayingLlmClient {
    fn complete(&self, request: &CompletionRequest) -> CompletionFuture<'_> {
        let result = self.next(request);
        Box::pin(async move { result })
    }
}

/// Test fixture: an in-memory LLM cassette from `(model, result)` steps, in
/// call order.
#[cfg(test)]
pub(crate) fn llm_cassette<'a>(
    steps: impl IntoIterator<Item = (&'a str, Result<CompletionResponse, CompletionError>)>,
) -> Cassette {
    use crate::cassette::format::Interaction;

    let interactions = steps
        .into_iter()
        .zip(0u64..)
        .map(|((model, result), seq)| Interaction {
            seq,
            port: "llm".into(),
            method: "complete".into(),
            input: serde_json::json!({ "model": model }),
            output: serde_json::to_value(&result).expect("scripted step serializes"),
        })
        .collect();

    Cassette {
        name: "scripted".into(),
        recorded_at: chrono::Utc::now(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        interactions,
    }
}
