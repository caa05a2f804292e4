//! audioscribe - speech-to-text with subtitle export
//!
//! Converts audio files to text and time-aligned SRT/WebVTT subtitles using an
//! external whisper model, from the command line or over HTTP.

pub mod audio;
pub mod config;
pub mod error;
pub mod processing;
pub mod scratch;
pub mod store;
pub mod subtitles;
pub mod transcription;

#[cfg(feature = "api")]
pub mod api;

use std::sync::Arc;

// Re-export main types for easy access
pub use crate::audio::{AudioConverter, AudioFormat, AudioInput, CanonicalAudio};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Result, ScribeError};
pub use crate::processing::{BatchProcessor, BatchSummary, TranscribeOptions};
pub use crate::scratch::ScratchDir;
pub use crate::store::{ResultRecord, ResultStore};
pub use crate::subtitles::{render, ExportFormat};
pub use crate::transcription::{
    ModelCache, ModelTier, Segment, Transcriber, TranscriptionResult, WhisperCliEngine,
};

/// Transcriber backed by the whisper command-line engine described by `config`
pub fn whisper_transcriber(config: &Config) -> Arc<Transcriber> {
    let engine = Arc::new(WhisperCliEngine::new(config.transcription.clone()));
    Arc::new(Transcriber::new(Arc::new(ModelCache::new(engine))))
}
