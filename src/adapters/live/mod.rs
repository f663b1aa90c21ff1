//! Live adapters for real external interactions.

pub mod clock;
pub mod filesystem;
pub mod llm;

pub use clock::LiveClock;
pub use filesystem::LiveFileSystem;
pub use llm::LiveLlmClient;
