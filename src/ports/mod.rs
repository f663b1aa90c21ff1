//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the migration core and an
//! external system (time, LLM, filesystem). Implementations live in
//! `src/adapters/`.

pub mod clock;
pub mod filesystem;
pub mod llm;

pub use clock::{Clock, SleepFuture};
pub use filesystem::{DirEntry, EntryKind, FileSystem, FsError};
pub use llm::{CompletionError, CompletionFuture, CompletionRequest, CompletionResponse, LlmClient};
