//! Video-relative `m:ss` offsets and their mapping onto the replay timeline.

use chrono::{DateTime, Utc};

/// 2025-01-01T12:00:00Z. Offsets inside a clip are laid out from here.
pub const REPLAY_BASE_MS: i64 = 1_735_732_800_000;

/// Length given to an observation whose end is not recorded.
pub const DEFAULT_EVENT_DURATION_SECS: i64 = 15;

/// `"m:ss"` to seconds. Anything unparsable counts as zero.
pub fn timecode_seconds(input: &str) -> i64 {
    let mut parts = input.trim().split(':');
    let (Some(minutes), Some(seconds), None) = (parts.next(), parts.next(), parts.next()) else {
        return 0;
    };
    match (minutes.trim().parse::<i64>(), seconds.trim().parse::<i64>()) {
        (Ok(m), Ok(s)) if m >= 0 && s >= 0 => m
            .checked_mul(60)
            .and_then(|m| m.checked_add(s))
            .unwrap_or(0),
        _ => 0,
    }
}

/// First half of a `"0:12–0:27"` style range, or the trimmed input when it is not a range.
pub fn range_start(raw: &str) -> &str {
    match raw.split_once('–') {
        Some((start, _)) => start.trim(),
        None => raw.trim(),
    }
}

/// Epoch milliseconds of `time_str` on the replay timeline, shifted by `extra_secs`.
/// An offset too large for the timeline falls back to the base instant.
pub fn timecode_to_epoch_ms(time_str: &str, extra_secs: i64) -> i64 {
    timecode_seconds(time_str)
        .checked_add(extra_secs)
        .and_then(|secs| secs.checked_mul(1_000))
        .and_then(|ms| ms.checked_add(REPLAY_BASE_MS))
        .unwrap_or(REPLAY_BASE_MS)
}

/// Human readable UTC wall time for logs and the CLI.
pub fn format_epoch_ms(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| format!("{ms}ms"))
}
