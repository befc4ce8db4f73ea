//! Cue timestamps: `HH:MM:SS,mmm` (SRT) and `HH:MM:SS.mmm` (WebVTT).

/// Format `seconds` as `HH:MM:SS{separator}mmm`, flooring to whole milliseconds.
///
/// Negative and non-finite inputs are treated as zero.
pub fn format_timestamp(seconds: f64, separator: char) -> String {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    };

    let hours = (seconds / 3600.0).floor() as u64;
    let minutes = ((seconds % 3600.0) / 60.0).floor() as u64;
    let remaining = seconds % 60.0;
    let whole = remaining.floor();
    let millis = (((remaining - whole) * 1000.0).floor() as u64).min(999);

    format!(
        "{:02}:{:02}:{:02}{}{:03}",
        hours, minutes, whole as u64, separator, millis
    )
}

/// Parse a timestamp written by [`format_timestamp`] with either separator.
pub fn parse_timestamp(timestamp: &str) -> Option<f64> {
    let (clock, millis) = timestamp.trim().split_once([',', '.'])?;
    let mut fields = clock.split(':');
    let hours: u64 = fields.next()?.parse().ok()?;
    let minutes: u64 = fields.next()?.parse().ok()?;
    let seconds: u64 = fields.next()?.parse().ok()?;
    if fields.next().is_some() || minutes >= 60 || seconds >= 60 || millis.len() != 3 {
        return None;
    }
    let millis: u64 = millis.parse().ok()?;

    Some(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds as f64 + millis as f64 / 1000.0)
}

/// Parse a `start --> end` cue timing line.
pub fn parse_timing_line(line: &str) -> Option<(f64, f64)> {
    let (start, end) = line.split_once("-->")?;
    Some((parse_timestamp(start)?, parse_timestamp(end)?))
}
