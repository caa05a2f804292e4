//! Transcription data model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ScribeError;

/// Language reported when the engine does not detect one
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Recognition model size/quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Tiny,
    #[default]
    Base,
    Small,
    Medium,
    Large,
}

impl ModelTier {
    pub const ALL: [ModelTier; 5] = [
        ModelTier::Tiny,
        ModelTier::Base,
        ModelTier::Small,
        ModelTier::Medium,
        ModelTier::Large,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Tiny => "tiny",
            ModelTier::Base => "base",
            ModelTier::Small => "small",
            ModelTier::Medium => "medium",
            ModelTier::Large => "large",
        }
    }

    /// Tier names in ascending size order
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|tier| tier.as_str()).collect()
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ModelTier {
    type Err = ScribeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tiny" => Ok(ModelTier::Tiny),
            "base" => Ok(ModelTier::Base),
            "small" => Ok(ModelTier::Small),
            "medium" => Ok(ModelTier::Medium),
            "large" => Ok(ModelTier::Large),
            _ => Err(ScribeError::InvalidModelTier(s.to_string())),
        }
    }
}

/// Timed piece of the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Transcribed text, untrimmed
    pub text: String,
}

impl Segment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Complete transcription result, immutable once produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Full transcription text
    text: String,
    /// Detected language, or "unknown"
    language: String,
    /// Segments in chronological order
    segments: Vec<Segment>,
    /// Audio duration in seconds, 0 when the engine did not report one
    duration: f64,
}

impl TranscriptionResult {
    pub fn new(text: String, language: String, segments: Vec<Segment>, duration: f64) -> Self {
        Self {
            text,
            language,
            segments,
            duration,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn has_segments(&self) -> bool {
        !self.segments.is_empty()
    }
}
