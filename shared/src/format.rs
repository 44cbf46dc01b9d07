use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};

use crate::entity::PopulationRange;

/// Offset used for naive service timestamps and for display.
const KST_OFFSET_SECS: i32 = 9 * 3600;
/// Numbers above this are treated as epoch milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e12;

fn kst() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECS).unwrap_or(Utc.fix())
}

/// Parse an epoch value in seconds or milliseconds.
pub fn timestamp_from_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    if value >= EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value as i64)
    } else {
        DateTime::from_timestamp(value as i64, 0)
    }
}

/// Parse the textual `updated_at` forms the service has been seen to send:
/// RFC 3339, `YYYY-MM-DD HH:MM[:SS]` in KST, or a bare epoch number.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if text.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse::<f64>().ok().and_then(timestamp_from_epoch);
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .and_then(|naive| naive.and_local_timezone(kst()).single())
        .map(|dt| dt.with_timezone(&Utc))
}

/// `YYYY-MM-DD HH:MM` in KST.
pub fn format_kst(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&kst()).format("%Y-%m-%d %H:%M").to_string()
}

/// Group digits in threes: 12345 -> "12,345".
pub fn format_count(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// "min ~ max", collapsing to one number when both ends match.
pub fn format_population(range: &PopulationRange) -> String {
    if range.min == range.max {
        return format_count(range.min);
    }
    format!("{} ~ {}", format_count(range.min), format_count(range.max))
}
