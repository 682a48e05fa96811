//! Millisecond timestamps and the textual notations used by subtitles and
//! segment tables.

use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;

use anyhow::{bail, ensure, Context, Result};

/// Offset from the transcript origin, millisecond precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(secs * 1000)
    }

    /// Rounds to the nearest millisecond. Negative and non-finite input
    /// collapses to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() || secs <= 0.0 {
            return Self::ZERO;
        }
        Self((secs * 1000.0).round() as u64)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn saturating_sub(self, other: Timestamp) -> Timestamp {
        Timestamp(self.0.saturating_sub(other.0))
    }

    /// Signed distance `self - earlier` in milliseconds.
    pub fn signed_diff(self, earlier: Timestamp) -> i64 {
        self.0 as i64 - earlier.0 as i64
    }

    /// Table notation: `HH:MM:SS`, with `.mmm` only when the value is not on a
    /// whole second.
    pub fn to_table_string(self) -> String {
        let (h, m, s, ms) = self.parts();
        if ms == 0 {
            format!("{:02}:{:02}:{:02}", h, m, s)
        } else {
            format!("{:02}:{:02}:{:02}.{:03}", h, m, s, ms)
        }
    }

    /// Hours, minutes, seconds and milliseconds.
    pub(crate) fn parts(self) -> (u64, u64, u64, u64) {
        let ms = self.0 % 1000;
        let total_secs = self.0 / 1000;
        (total_secs / 3600, (total_secs % 3600) / 60, total_secs % 60, ms)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_table_string())
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(rhs.as_millis() as u64))
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    /// Saturates at zero when `rhs` is later than `self`.
    fn sub(self, rhs: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(rhs.0))
    }
}

impl From<Duration> for Timestamp {
    fn from(value: Duration) -> Self {
        Timestamp(value.as_millis() as u64)
    }
}

impl From<Timestamp> for Duration {
    fn from(value: Timestamp) -> Self {
        Duration::from_millis(value.0)
    }
}

/// Parses `HH:MM:SS`, `MM:SS`, either with an optional `.mmm` or `,mmm`
/// fraction of one to three digits.
pub fn parse_clock(raw: &str) -> Result<Timestamp> {
    let raw = raw.trim();
    ensure!(!raw.is_empty(), "empty timestamp");

    let (clock, fraction) = match raw.rfind(['.', ',']) {
        Some(pos) => (&raw[..pos], Some(&raw[pos + 1..])),
        None => (raw, None),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    ensure!(
        (2..=3).contains(&parts.len()),
        "timestamp '{}' must be MM:SS or HH:MM:SS",
        raw
    );

    let mut fields = parts.iter().rev();
    let seconds = parse_field(fields.next(), "seconds", raw)?;
    let minutes = parse_field(fields.next(), "minutes", raw)?;
    let hours = match fields.next() {
        Some(h) => parse_field(Some(h), "hours", raw)?,
        None => 0,
    };
    ensure!(seconds < 60, "seconds out of range in '{}'", raw);
    if parts.len() == 3 {
        ensure!(minutes < 60, "minutes out of range in '{}'", raw);
    }

    let millis = match fraction {
        Some(digits) => parse_fraction(digits, raw)?,
        None => 0,
    };

    let total = hours
        .checked_mul(60)
        .and_then(|m| m.checked_add(minutes))
        .and_then(|m| m.checked_mul(60))
        .and_then(|s| s.checked_add(seconds))
        .and_then(|s| s.checked_mul(1000))
        .and_then(|ms| ms.checked_add(millis));
    match total {
        Some(total) => Ok(Timestamp::from_millis(total)),
        None => bail!("timestamp '{}' is out of range", raw),
    }
}

/// Accepts plain seconds (`12.5`) or clock notation.
pub fn parse_time(raw: &str) -> Result<Timestamp> {
    if raw.contains(':') {
        return parse_clock(raw);
    }

    let seconds: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("Failed to parse seconds value '{}'", raw))?;
    ensure!(
        seconds.is_finite() && seconds >= 0.0,
        "Time values must be non-negative"
    );
    Ok(Timestamp::from_secs_f64(seconds))
}

fn parse_field(value: Option<&&str>, label: &str, raw: &str) -> Result<u64> {
    let value = value.copied().unwrap_or_default();
    ensure!(
        !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
        "invalid {} component '{}' in '{}'",
        label,
        value,
        raw
    );
    value
        .parse::<u64>()
        .with_context(|| format!("invalid {} component '{}'", label, value))
}

fn parse_fraction(digits: &str, raw: &str) -> Result<u64> {
    ensure!(
        (1..=3).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()),
        "invalid sub-second component in '{}'",
        raw
    );
    let value: u64 = digits.parse()?;
    Ok(value * 10u64.pow(3 - digits.len() as u32))
}
