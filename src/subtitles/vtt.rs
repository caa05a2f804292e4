//! WebVTT rendering

use super::timestamp::vtt_timestamp;
use crate::transcription::Segment;

pub const VTT_HEADER: &str = "WEBVTT";

/// Render segments as a WebVTT document. Cues carry no identifiers.
pub fn render_vtt(segments: &[Segment]) -> String {
    let mut vtt_content = String::with_capacity(VTT_HEADER.len() + 2 + segments.len() * 48);
    vtt_content.push_str(VTT_HEADER);
    vtt_content.push_str("\n\n");

    for segment in segments {
        vtt_content.push_str(&vtt_timestamp(segment.start));
        vtt_content.push_str(" --> ");
        vtt_content.push_str(&vtt_timestamp(segment.end));
        vtt_content.push('\n');
        vtt_content.push_str(segment.text.trim());
        vtt_content.push_str("\n\n");
    }

    vtt_content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_cues() {
        let segments = vec![Segment::new(0.0, 1.0, " a"), Segment::new(3725.25, 3726.0, "b\n")];
        assert_eq!(
            render_vtt(&segments),
            "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\na\n\n01:02:05.250 --> 01:02:06.000\nb\n\n"
        );
    }

    #[test]
    fn test_empty_segments_header_only() {
        assert_eq!(render_vtt(&[]), "WEBVTT\n\n");
    }
}
