//! ISO 8601 rendering of bucket steps and offsets.

use chrono::Duration;

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Render a duration as `P[nD][T[nH][nM][n[.fff]S]]`, `P0D` when zero.
///
/// Days are the largest unit so the value never depends on calendar
/// months. Negative durations get a leading minus sign.
pub fn format_iso8601(duration: Duration) -> String {
    let total_ms = duration.num_milliseconds();
    if total_ms == 0 {
        return "P0D".to_string();
    }

    let sign = if total_ms < 0 { "-" } else { "" };
    let mut rest = total_ms.unsigned_abs() as i64;

    let days = rest / MS_PER_DAY;
    rest %= MS_PER_DAY;
    let hours = rest / MS_PER_HOUR;
    rest %= MS_PER_HOUR;
    let minutes = rest / MS_PER_MINUTE;
    rest %= MS_PER_MINUTE;
    let seconds = rest / MS_PER_SECOND;
    let millis = rest % MS_PER_SECOND;

    let mut out = format!("{}P", sign);
    if days > 0 {
        out.push_str(&format!("{}D", days));
    }
    if hours > 0 || minutes > 0 || seconds > 0 || millis > 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{}H", hours));
        }
        if minutes > 0 {
            out.push_str(&format!("{}M", minutes));
        }
        if millis > 0 {
            let fraction = format!("{:03}", millis);
            out.push_str(&format!("{}.{}S", seconds, fraction.trim_end_matches('0')));
        } else if seconds > 0 {
            out.push_str(&format!("{}S", seconds));
        }
    }
    out
}

/// Parse the subset produced by [`format_iso8601`] (plus weeks)
pub fn parse_iso8601(value: &str) -> Option<Duration> {
    let (negative, body) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let body = body.strip_prefix('P')?;
    let (date_part, time_part) = match body.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (body, None),
    };

    let mut total_ms: f64 = 0.0;
    let mut seen_unit = false;

    let mut number = String::new();
    for c in date_part.chars() {
        match c {
            '0'..='9' | '.' => number.push(c),
            'W' | 'D' => {
                let n: f64 = number.parse().ok()?;
                let unit = if c == 'W' { 7 * MS_PER_DAY } else { MS_PER_DAY };
                total_ms += n * unit as f64;
                number.clear();
                seen_unit = true;
            }
            _ => return None,
        }
    }
    if !number.is_empty() {
        return None;
    }

    if let Some(time) = time_part {
        for c in time.chars() {
            match c {
                '0'..='9' | '.' => number.push(c),
                'H' | 'M' | 'S' => {
                    let n: f64 = number.parse().ok()?;
                    let unit = match c {
                        'H' => MS_PER_HOUR,
                        'M' => MS_PER_MINUTE,
                        _ => MS_PER_SECOND,
                    };
                    total_ms += n * unit as f64;
                    number.clear();
                    seen_unit = true;
                }
                _ => return None,
            }
        }
        if !number.is_empty() {
            return None;
        }
    }

    if !seen_unit {
        return None;
    }

    let ms = total_ms.round() as i64;
    Some(Duration::milliseconds(if negative { -ms } else { ms }))
}
