//! Service context bundling all port trait objects.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::adapters::live::{LiveClock, LiveFileSystem, LiveLlmClient};
use crate::adapters::recording::RecordingLlmClient;
use crate::adapters::replaying::{ReplayingLlmClient, VirtualClock};
use crate::cassette::format::Cassette;
use crate::cassette::recorder::CassetteRecorder;
use crate::config::{ConfigError, Settings};
use crate::ports::clock::Clock;
use crate::ports::filesystem::FileSystem;
use crate::ports::llm::LlmClient;

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors
/// wire up different adapter implementations (live, recording, replaying).
pub struct ServiceContext {
    /// Clock for the current time, backoff and throttling.
    pub clock: Box<dyn Clock>,
    /// Filesystem for reading sources and writing conversions.
    pub fs: Box<dyn FileSystem>,
    /// LLM client for completions.
    pub llm: Box<dyn LlmClient>,
    /// Cassette recorder shared with the recording LLM adapter; saved on drop.
    recorder: Option<Arc<Mutex<CassetteRecorder>>>,
}

impl ServiceContext {
    /// Creates a live context talking to the real completion API.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] when no credential is configured.
    pub fn live(settings: &Settings) -> Result<Self, ConfigError> {
        let api_key = settings.require_api_key()?;
        Ok(Self {
            clock: Box::new(LiveClock),
            fs: Box::new(LiveFileSystem),
            llm: Box::new(LiveLlmClient::new(api_key, settings.base_url.clone())),
            recorder: None,
        })
    }

    /// Creates a live context whose completion calls are also recorded to a
    /// cassette at `path`, written when the context is dropped.
    ///
    /// This is the developer-only mechanism behind `TSMIGRATE_RECORD`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] when no credential is configured.
    pub fn recording(settings: &Settings, path: &Path) -> Result<Self, ConfigError> {
        let api_key = settings.require_api_key()?;
        let live_llm = Box::new(LiveLlmClient::new(api_key, settings.base_url.clone()));
        let name = path.file_stem().map_or_else(
            || "tsmigrate".to_string(),
            |s| s.to_string_lossy().into_owned(),
        );
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(path, name)));
        Ok(Self {
            clock: Box::new(LiveClock),
            fs: Box::new(LiveFileSystem),
            llm: Box::new(RecordingLlmClient::new(live_llm, Arc::clone(&recorder))),
            recorder: Some(recorder),
        })
    }

    /// Creates a context whose completions are served from a cassette.
    ///
    /// No credential is needed and no real time passes: backoff and
    /// throttle sleeps return immediately. Files are still read and written
    /// on the real filesystem.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be read or parsed.
    pub fn replaying(path: &Path) -> Result<Self, String> {
        let cassette = Cassette::load(path)?;
        Ok(Self {
            clock: Box::new(VirtualClock::default()),
            fs: Box::new(LiveFileSystem),
            llm: Box::new(ReplayingLlmClient::new(&cassette)),
            recorder: None,
        })
    }

    /// Assembles a context from arbitrary adapters.
    #[must_use]
    pub fn from_parts(
        clock: Box<dyn Clock>,
        fs: Box<dyn FileSystem>,
        llm: Box<dyn LlmClient>,
    ) -> Self {
        Self {
            clock,
            fs,
            llm,
            recorder: None,
        }
    }

    /// Writes the recorded cassette, if this is a recording context.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette cannot be written.
    pub fn save_recording(&self) -> Result<Option<PathBuf>, String> {
        let Some(recorder) = &self.recorder else {
            return Ok(None);
        };
        let guard = recorder
            .lock()
            .map_err(|e| format!("Recorder lock poisoned: {e}"))?;
        let path = guard
            .save()
            .map_err(|e| format!("Failed to write cassette: {e}"))?;
        Ok(Some(path.clone()))
    }
}

impl Drop for ServiceContext {
    fn drop(&mut self) {
        match self.save_recording() {
            Ok(Some(path)) => info!(cassette = %path.display(), "recording saved"),
            Ok(None) => {}
            Err(e) => warn!("failed to write cassette: {e}"),
        }
    }
}
