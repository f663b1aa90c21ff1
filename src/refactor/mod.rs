//! Retry and fallback orchestration around the completion call.

pub mod completion;
pub mod fallback;

use std::path::PathBuf;

pub use completion::{CompletionClient, RetryPolicy, Sampling};
pub use fallback::{FallbackOrchestrator, ModelChain, RefactorError};

/// One discovered file to be converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefactorRequest {
    /// Path of the original source file.
    pub file_path: PathBuf,
    /// Full text of the original source file.
    pub source_text: String,
    /// Whether the file holds a React class component.
    pub is_component: bool,
}

impl RefactorRequest {
    /// Extension the converted file gets: `tsx` for components, `ts` otherwise.
    #[must_use]
    pub fn target_extension(&self) -> &'static str {
        if self.is_component {
            "tsx"
        } else {
            "ts"
        }
    }

    /// Path of the converted file: same directory and stem, new extension.
    #[must_use]
    pub fn target_path(&self) -> PathBuf {
        self.file_path.with_extension(self.target_extension())
    }
}

/// Successful result of refactoring one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    /// Converted source text as returned by the model.
    pub text: String,
    /// Whether the fallback model produced it.
    pub used_fallback_model: bool,
    /// Model that produced it.
    pub model: String,
}
