//! Transcript export: plain text, SRT and WebVTT.
//!
//! Rendering is pure. The same input always produces byte-identical output.

pub mod timestamp;
pub mod srt;
pub mod vtt;

pub use srt::render_srt;
pub use timestamp::{format_timestamp, srt_timestamp, vtt_timestamp, SRT_SEPARATOR, VTT_SEPARATOR};
pub use vtt::render_vtt;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ScribeError};
use crate::transcription::{Segment, TranscriptionResult};

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Txt,
    Srt,
    Vtt,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Txt, ExportFormat::Srt, ExportFormat::Vtt];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Srt => "srt",
            ExportFormat::Vtt => "vtt",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Txt => "text/plain; charset=utf-8",
            ExportFormat::Srt => "application/x-subrip; charset=utf-8",
            ExportFormat::Vtt => "text/vtt; charset=utf-8",
        }
    }

    /// Subtitle formats need timed segments, plain text does not
    pub fn requires_segments(&self) -> bool {
        !matches!(self, ExportFormat::Txt)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ScribeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "txt" | "text" => Ok(ExportFormat::Txt),
            "srt" => Ok(ExportFormat::Srt),
            "vtt" | "webvtt" => Ok(ExportFormat::Vtt),
            _ => Err(ScribeError::InvalidExportFormat(s.to_string())),
        }
    }
}

/// Plain text export is the transcript as-is
pub fn render_plain_text(text: &str) -> String {
    text.to_string()
}

/// Render a transcription result in the requested format
///
/// Subtitle formats fail with `EmptySegments` when the result has no timed segments.
pub fn render(result: &TranscriptionResult, format: ExportFormat) -> Result<String> {
    if format.requires_segments() && !result.has_segments() {
        return Err(ScribeError::EmptySegments(format.to_string()));
    }

    Ok(match format {
        ExportFormat::Txt => render_plain_text(result.text()),
        ExportFormat::Srt => render_srt(result.segments()),
        ExportFormat::Vtt => render_vtt(result.segments()),
    })
}

/// Numbered `[start - end] text` lines for console display
pub fn render_listing(segments: &[Segment]) -> String {
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            format!(
                "{}. [{} - {}] {}\n",
                i + 1,
                srt_timestamp(segment.start),
                srt_timestamp(segment.end),
                segment.text.trim()
            )
        })
        .collect()
}
