/*
 * interval.rs
 *
 * Fixed-point duration, millisecond precision. Parsed from a leading decimal
 * integer plus an optional unit suffix; no suffix means milliseconds (this
 * differs from the teacher's seconds-default `duration.rs` - here the
 * default unit is the one spec §4.1 specifies, milliseconds, because the
 * smallest interval this daemon schedules is `restart_initial` and operators
 * routinely want sub-second initial backoff).
 *
 * No floating point: everything is integer milliseconds internally, so
 * there's no rounding to reason about when doubling or comparing against
 * cooloff/maximum.
 */

use std::fmt;
use std::time::Duration;

use crate::error::{Result, SupervisorError};

/// A non-negative duration with millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Interval(u64);

impl Interval {
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.0)
    }

    /// `current.min(maximum)` after doubling, used by the backoff scheduler.
    #[must_use]
    pub fn saturating_double(self, cap: Self) -> Self {
        Self(self.0.saturating_mul(2).min(cap.0))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format(*self))
    }
}

/// Parse "500" (ms), "30s", "15m", "1h", "1d". No suffix means milliseconds.
///
/// # Examples
///
/// ```
/// use supervone::interval::{parse, Interval};
///
/// assert_eq!(parse("500").unwrap(), Interval::from_millis(500));
/// assert_eq!(parse("30s").unwrap(), Interval::from_millis(30_000));
/// assert_eq!(parse("15m").unwrap(), Interval::from_millis(900_000));
/// assert_eq!(parse("1h").unwrap(), Interval::from_millis(3_600_000));
/// assert_eq!(parse("1d").unwrap(), Interval::from_millis(86_400_000));
/// ```
pub fn parse(text: &str) -> Result<Interval> {
    let text = text.trim();
    let digit_end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());

    let (num_str, suffix) = text.split_at(digit_end);
    if num_str.is_empty() {
        return Err(SupervisorError::InvalidArgument(format!(
            "invalid interval '{text}': no leading digits"
        )));
    }

    let n: u64 = num_str
        .parse()
        .map_err(|_| SupervisorError::InvalidArgument(format!("invalid interval '{text}'")))?;

    let ms = match suffix {
        "" => n,
        "s" => n
            .checked_mul(1_000)
            .ok_or_else(|| overflow_err(text))?,
        "m" => n
            .checked_mul(60_000)
            .ok_or_else(|| overflow_err(text))?,
        "h" => n
            .checked_mul(3_600_000)
            .ok_or_else(|| overflow_err(text))?,
        "d" => n
            .checked_mul(86_400_000)
            .ok_or_else(|| overflow_err(text))?,
        other => {
            return Err(SupervisorError::InvalidArgument(format!(
                "invalid interval suffix '{other}' in '{text}'"
            )));
        }
    };

    Ok(Interval::from_millis(ms))
}

fn overflow_err(text: &str) -> SupervisorError {
    SupervisorError::InvalidArgument(format!("interval '{text}' overflows"))
}

/// Format for humans: largest non-zero unit down to seconds, or `<ms>ms`
/// when the total is under one second.
///
/// # Examples
///
/// ```
/// use supervone::interval::{format, Interval};
///
/// assert_eq!(format(Interval::from_millis(500)), "500ms");
/// assert_eq!(format(Interval::from_millis(1_000)), "1s");
/// assert_eq!(format(Interval::from_millis(90_000)), "1m 30s");
/// assert_eq!(format(Interval::from_millis(3_661_000)), "1h 1m 1s");
/// assert_eq!(format(Interval::from_millis(90_061_000)), "1d 1h 1m 1s");
/// ```
#[must_use]
pub fn format(interval: Interval) -> String {
    let total_ms = interval.as_millis();
    let total_secs = total_ms / 1_000;

    if total_secs == 0 {
        return format!("{total_ms}ms");
    }

    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let secs = total_secs % 60;

    let mut parts: Vec<String> = Vec::with_capacity(4);
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if days > 0 || hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if days > 0 || hours > 0 || minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    parts.push(format!("{secs}s"));

    parts.join(" ")
}
