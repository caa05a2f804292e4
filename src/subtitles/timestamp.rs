//! Cue timestamp formatting shared by SRT and WebVTT.

/// Decimal separator used by SubRip (`HH:MM:SS,mmm`)
pub const SRT_SEPARATOR: char = ',';

/// Decimal separator used by WebVTT (`HH:MM:SS.mmm`)
pub const VTT_SEPARATOR: char = '.';

/// Format seconds as `HH:MM:SS<sep>mmm`.
///
/// Every field is truncated, never rounded. Negative and NaN inputs format
/// as zero. Hours grow past two digits when needed.
pub fn format_timestamp(seconds: f64, separator: char) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };

    let hours = (seconds / 3600.0).floor() as u64;
    let minutes = ((seconds % 3600.0) / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    let millis = ((seconds % 1.0) * 1000.0).floor() as u64;

    format!("{:02}:{:02}:{:02}{}{:03}", hours, minutes, secs, separator, millis)
}

pub fn srt_timestamp(seconds: f64) -> String {
    format_timestamp(seconds, SRT_SEPARATOR)
}

pub fn vtt_timestamp(seconds: f64) -> String {
    format_timestamp(seconds, VTT_SEPARATOR)
}
