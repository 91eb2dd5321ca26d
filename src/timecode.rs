use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;

// [HH:]MM:SS[.f{1,3}] followed by whitespace or end of line
static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(\d+):)?(\d{1,2}):(\d{1,2})(?:\.(\d{1,3}))?(?:\s+(.*))?$")
        .expect("timestamp pattern is valid")
});

const MS_PER_SECOND: u64 = 1000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// Formats milliseconds as `HH:MM:SS`, or `HH:MM:SS.mmm` when `with_ms` is set.
pub fn format_timestamp(ms: u64, with_ms: bool) -> String {
    let mut out = String::with_capacity(12);
    let _ = write!(
        &mut out,
        "{:02}:{:02}:{:02}",
        ms / MS_PER_HOUR,
        (ms % MS_PER_HOUR) / MS_PER_MINUTE,
        (ms % MS_PER_MINUTE) / MS_PER_SECOND
    );
    if with_ms {
        let _ = write!(&mut out, ".{:03}", ms % MS_PER_SECOND);
    }
    out
}

/// Splits an editor line into its leading timestamp and the trimmed title.
///
/// Returns `None` when the line does not start with a valid timestamp. The
/// title may be empty.
pub fn split_line(line: &str) -> Option<(u64, &str)> {
    let caps = LINE_RE.captures(line)?;

    let hours = match caps.get(1) {
        Some(h) => h.as_str().parse::<u64>().ok()?,
        None => 0,
    };
    let minutes = caps[2].parse::<u64>().ok()?;
    let seconds = caps[3].parse::<u64>().ok()?;
    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    let millis = match caps.get(4) {
        Some(frac) => fraction_to_ms(frac.as_str())?,
        None => 0,
    };

    let start = hours
        .checked_mul(MS_PER_HOUR)?
        .checked_add(minutes * MS_PER_MINUTE + seconds * MS_PER_SECOND + millis)?;
    let title = caps.get(5).map_or("", |t| t.as_str().trim());
    Some((start, title))
}

/// Parses a bare timestamp such as `01:02:03.500`.
pub fn parse_timestamp(s: &str) -> Option<u64> {
    match split_line(s.trim())? {
        (ms, "") => Some(ms),
        _ => None,
    }
}

// ".5" is half a second, not five milliseconds
fn fraction_to_ms(frac: &str) -> Option<u64> {
    let value = frac.parse::<u64>().ok()?;
    Some(match frac.len() {
        1 => value * 100,
        2 => value * 10,
        _ => value,
    })
}

/// Formats milliseconds the way Matroska chapter files store time:
/// `HH:MM:SS.nnnnnnnnn`.
pub fn format_matroska(ms: u64) -> String {
    format!(
        "{}.{:09}",
        format_timestamp(ms, false),
        (ms % MS_PER_SECOND) * 1_000_000
    )
}

/// Parses a Matroska `HH:MM:SS.nnnnnnnnn` timestamp, truncating to milliseconds.
pub fn parse_matroska(s: &str) -> Option<u64> {
    let parts: Vec<&str> = s.trim().split([':', '.']).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }

    let hours = parts[0].parse::<u64>().ok()?;
    let minutes = parts[1].parse::<u64>().ok()?;
    let seconds = parts[2].parse::<u64>().ok()?;
    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    let nanos = match parts.get(3) {
        Some(frac) if frac.len() <= 9 => {
            let value = frac.parse::<u64>().ok()?;
            value * 10u64.pow(9 - frac.len() as u32)
        }
        Some(_) => return None,
        None => 0,
    };

    hours
        .checked_mul(MS_PER_HOUR)?
        .checked_add(minutes * MS_PER_MINUTE + seconds * MS_PER_SECOND + nanos / 1_000_000)
}

/// Converts a player position in seconds to whole milliseconds.
/// Non-finite input maps to 0.
pub fn seconds_to_ms(seconds: f64) -> i64 {
    if seconds.is_finite() {
        (seconds * 1000.0).round() as i64
    } else {
        0
    }
}

pub fn ms_to_seconds(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

/// Whether any start in `starts` carries sub-second precision.
pub fn needs_ms(starts: impl IntoIterator<Item = u64>) -> bool {
    starts.into_iter().any(|start| start % MS_PER_SECOND != 0)
}
