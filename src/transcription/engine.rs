//! Recognition engine capability.
//!
//! The acoustic model is a black box: it is loaded once per [`ModelTier`] and
//! then asked to transcribe canonical audio files. Nothing outside this module
//! and its implementations knows how a model works internally.

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use super::types::{ModelTier, Segment};
use crate::error::Result;

/// Output of a model before defaults are applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTranscript {
    pub text: String,
    pub language: Option<String>,
    pub segments: Option<Vec<Segment>>,
    pub duration: Option<f64>,
}

/// Loads recognition models
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Short backend identifier for logs
    fn name(&self) -> &str;

    /// Construct a model for `tier`. Expected to be slow.
    async fn load(&self, tier: ModelTier) -> Result<Arc<dyn ModelHandle>>;
}

/// A loaded model, shared read-only between requests of the same tier
#[async_trait]
pub trait ModelHandle: Send + Sync + Debug {
    fn tier(&self) -> ModelTier;

    async fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<RawTranscript>;
}
