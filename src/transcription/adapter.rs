use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::cache::ModelCache;
use super::engine::RawTranscript;
use super::types::{ModelTier, Segment, TranscriptionResult, UNKNOWN_LANGUAGE};
use crate::error::{Result, ScribeError};

/// Single integration point between the core and the recognition engine
#[derive(Debug, Clone)]
pub struct Transcriber {
    cache: Arc<ModelCache>,
}

impl Transcriber {
    pub fn new(cache: Arc<ModelCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ModelCache> {
        &self.cache
    }

    /// Transcribe canonical audio with the model for `tier`
    pub async fn transcribe(
        &self,
        audio_path: &Path,
        tier: ModelTier,
        language: Option<&str>,
    ) -> Result<TranscriptionResult> {
        if !tokio::fs::try_exists(audio_path).await.unwrap_or(false) {
            return Err(ScribeError::FileNotFound(audio_path.to_path_buf()));
        }

        let language = language.map(str::trim).filter(|lang| !lang.is_empty());
        let model = self.cache.get(tier).await.map_err(into_transcription_error)?;

        info!(
            "🎤 Transcribing {} (model: {}, language: {})",
            audio_path.display(),
            tier,
            language.unwrap_or("auto")
        );
        let start_time = Instant::now();

        let raw = model
            .transcribe(audio_path, language)
            .await
            .map_err(into_transcription_error)?;

        let result = into_result(raw);
        info!(
            "🎉 Transcription completed in {:.1}s: {} characters, {} segments, language {}",
            start_time.elapsed().as_secs_f64(),
            result.text().len(),
            result.segments().len(),
            result.language()
        );

        Ok(result)
    }
}

/// Engine failures are opaque to callers
fn into_transcription_error(e: ScribeError) -> ScribeError {
    match e {
        ScribeError::Transcription(_) => e,
        other => ScribeError::Transcription(other.to_string()),
    }
}

/// Apply the defaults for fields the engine left out
pub(crate) fn into_result(raw: RawTranscript) -> TranscriptionResult {
    let language = raw
        .language
        .map(|lang| lang.trim().to_string())
        .filter(|lang| !lang.is_empty())
        .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string());

    let segments: Vec<Segment> = raw
        .segments
        .unwrap_or_default()
        .into_iter()
        .map(|mut segment| {
            segment.start = segment.start.max(0.0);
            if segment.end < segment.start {
                warn!(
                    "Segment ends before it starts ({:.3} < {:.3}), clamping",
                    segment.end, segment.start
                );
                segment.end = segment.start;
            }
            segment
        })
        .collect();

    let duration = raw.duration.unwrap_or(0.0);
    debug!("Mapped transcript: {} segments, duration {:.2}s", segments.len(), duration);

    TranscriptionResult::new(raw.text, language, segments, duration)
}
