//! Two-tier model fallback around the completion client.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use super::completion::CompletionClient;
use super::{CompletionOutcome, RefactorRequest};
use crate::ports::CompletionError;
use crate::prompts;

/// Terminal failure for one file: both models were tried and both failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefactorError {
    /// The fallback model failed after the primary model had failed.
    #[error("refactoring {} failed on both models: {last_error}", .file_path.display())]
    RefactorFailed {
        /// File that could not be refactored.
        file_path: PathBuf,
        /// Error from the fallback attempt.
        last_error: CompletionError,
    },
}

/// Primary and fallback model identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelChain {
    /// Always tried first.
    pub primary: String,
    /// Tried once, only after the primary path is exhausted.
    pub fallback: String,
}

/// Runs a request on the primary model and, if that fails for any reason,
/// once on the fallback model.
pub struct FallbackOrchestrator<'a> {
    client: CompletionClient<'a>,
    models: ModelChain,
}

impl<'a> FallbackOrchestrator<'a> {
    /// Creates an orchestrator over a completion client.
    #[must_use]
    pub fn new(client: CompletionClient<'a>, models: ModelChain) -> Self {
        Self { client, models }
    }

    /// Refactors one file's source.
    ///
    /// # Errors
    ///
    /// Returns [`RefactorError::RefactorFailed`] carrying the fallback
    /// model's error when both tiers fail.
    pub async fn refactor(
        &self,
        request: &RefactorRequest,
    ) -> Result<CompletionOutcome, RefactorError> {
        let prompt = prompts::build(request);

        let primary_error = match self.client.complete(&prompt, &self.models.primary).await {
            Ok(text) => {
                return Ok(CompletionOutcome {
                    text,
                    used_fallback_model: false,
                    model: self.models.primary.clone(),
                });
            }
            Err(err) => err,
        };

        warn!(
            file = %request.file_path.display(),
            primary = %self.models.primary,
            fallback = %self.models.fallback,
            error = %primary_error,
            "primary model failed, trying fallback model"
        );

        match self.client.complete(&prompt, &self.models.fallback).await {
            Ok(text) => {
                info!(
                    file = %request.file_path.display(),
                    model = %self.models.fallback,
                    "fallback model succeeded"
                );
                Ok(CompletionOutcome {
                    text,
                    used_fallback_model: true,
                    model: self.models.fallback.clone(),
                })
            }
            Err(last_error) => Err(RefactorError::RefactorFailed {
                file_path: request.file_path.clone(),
                last_error,
            }),
        }
    }
}
