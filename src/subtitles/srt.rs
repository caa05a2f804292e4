//! SubRip (SRT) rendering

use std::fmt;

use super::timestamp::srt_timestamp;
use crate::transcription::Segment;

/// SRT cue
#[derive(Debug, Clone, PartialEq)]
pub struct SrtCue<'a> {
    /// 1-based sequence number
    pub index: usize,
    pub segment: &'a Segment,
}

impl fmt::Display for SrtCue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{} --> {}\n{}\n",
            self.index,
            srt_timestamp(self.segment.start),
            srt_timestamp(self.segment.end),
            self.segment.text.trim()
        )
    }
}

/// Render segments as an SRT document. No segments yields an empty string.
pub fn render_srt(segments: &[Segment]) -> String {
    let mut srt_content = String::new();

    for (i, segment) in segments.iter().enumerate() {
        let cue = SrtCue { index: i + 1, segment };
        srt_content.push_str(&cue.to_string());
        srt_content.push('\n');
    }

    srt_content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cue_display() {
        let segment = Segment::new(10.0, 15.0, "  Test subtitle ");
        let cue = SrtCue { index: 1, segment: &segment };
        assert_eq!(cue.to_string(), "1\n00:00:10,000 --> 00:00:15,000\nTest subtitle\n");
    }

    #[test]
    fn test_two_segments() {
        let segments = vec![Segment::new(0.0, 1.0, "a"), Segment::new(1.5, 2.5, " b ")];
        let srt = render_srt(&segments);

        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:01,000\na\n\n2\n00:00:01,500 --> 00:00:02,500\nb\n\n"
        );

        let blocks: Vec<&str> = srt.trim_end().split("\n\n").collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].starts_with("1\n"));
        assert!(blocks[1].starts_with("2\n"));
    }

    #[test]
    fn test_empty_segments() {
        assert_eq!(render_srt(&[]), "");
    }

    #[test]
    fn test_render_is_deterministic() {
        let segments = vec![
            Segment::new(0.0, 2.345, " first line"),
            Segment::new(2.345, 3725.25, "second line "),
        ];
        assert_eq!(render_srt(&segments), render_srt(&segments));
    }
}
