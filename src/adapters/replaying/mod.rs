//! Replaying adapters that serve recorded interactions without touching the network.

pub mod clock;
pub mod llm;

pub use clock::VirtualClock;
#[cfg(test)]
pub(crate) use llm::llm_cassette;
pub use llm::ReplayingLlmClient;
