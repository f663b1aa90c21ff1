//! Recording adapters that capture interactions to cassettes.

pub mod llm;

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::warn;

use crate::cassette::recorder::CassetteRecorder;

pub use llm::RecordingLlmClient;

/// Record a `Result<T, E>` interaction.
///
/// Both halves are serialized with serde's externally tagged `Result`
/// representation (`{"Ok": v}` / `{"Err": e}`), so typed errors replay with
/// their kind intact. Serialization failures are logged and the interaction
/// is dropped; a broken recording never fails the run being recorded.
pub(crate) fn record_result<T, E, I>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) where
    T: Serialize,
    E: Serialize,
    I: Serialize,
{
    let input = serde_json::to_value(input);
    let output = serde_json::to_value(result);
    let (input_json, output_json) = match (input, output) {
        (Ok(input), Ok(output)) => (input, output),
        (Err(e), _) | (_, Err(e)) => {
            warn!(port, method, error = %e, "failed to serialize interaction, not recorded");
            return;
        }
    };

    match recorder.lock() {
        Ok(mut guard) => guard.record(port, method, input_json, output_json),
        Err(e) => warn!(port, method, error = %e, "recorder lock poisoned, not recorded"),
    }
}
