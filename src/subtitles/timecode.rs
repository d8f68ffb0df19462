use crate::errors::TimecodeError;
use regex::Regex;
use std::sync::OnceLock;

fn timecode_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d+):(\d+):(\d+),(\d+)$").expect("timecode pattern is valid")
    })
}

/// Parse an SRT timecode (`HH:MM:SS,mmm`) into seconds.
///
/// Fields are taken at face value: no range checks, no clamping. The
/// millisecond field is a number of milliseconds, so `"00:00:01,5"` is 1.005s.
pub fn parse_timecode(text: &str) -> Result<f64, TimecodeError> {
    let trimmed = text.trim();
    let caps = timecode_pattern()
        .captures(trimmed)
        .ok_or_else(|| TimecodeError::Malformed(trimmed.to_string()))?;

    let mut fields = [0f64; 4];
    for (i, field) in fields.iter_mut().enumerate() {
        *field = caps[i + 1]
            .parse::<u64>()
            .map_err(|_| TimecodeError::Malformed(trimmed.to_string()))? as f64;
    }
    let [hours, minutes, seconds, millis] = fields;

    Ok(hours * 3600.0 + minutes * 60.0 + seconds + millis / 1000.0)
}

/// Format seconds as an SRT timecode, rounded to the nearest millisecond
pub fn format_timecode(seconds: f64) -> String {
    if seconds.is_nan() || seconds.is_infinite() || seconds < 0.0 {
        return "00:00:00,000".to_string();
    }

    let total_millis = (seconds * 1000.0).round() as u64;
    let millis = total_millis % 1000;
    let total_seconds = total_millis / 1000;
    let secs = total_seconds % 60;
    let total_minutes = total_seconds / 60;
    let minutes = total_minutes % 60;
    let hours = total_minutes / 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}
