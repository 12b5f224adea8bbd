//! Duration value object

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use crate::domain::error::DurationParseError;

/// Default cap on a single take (10 minutes)
pub const DEFAULT_MAX_CAPTURE_SECS: u64 = 600;

/// Default lifetime of cached restyle results (5 minutes)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Value object representing a time span.
/// Immutable and validated on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration {
    milliseconds: u64,
}

impl Duration {
    /// Create a Duration from milliseconds
    pub const fn from_millis(ms: u64) -> Self {
        Self { milliseconds: ms }
    }

    /// Create a Duration from seconds
    pub const fn from_secs(secs: u64) -> Self {
        Self {
            milliseconds: secs * 1000,
        }
    }

    /// Default cap on a single take (10 minutes)
    pub const fn default_max_capture() -> Self {
        Self::from_secs(DEFAULT_MAX_CAPTURE_SECS)
    }

    /// Default lifetime of cached restyle results (5 minutes)
    pub const fn default_cache_ttl() -> Self {
        Self::from_secs(DEFAULT_CACHE_TTL_SECS)
    }

    /// Get duration in seconds
    pub const fn as_secs(&self) -> u64 {
        self.milliseconds / 1000
    }

    /// Get duration in milliseconds
    pub const fn as_millis(&self) -> u64 {
        self.milliseconds
    }

    /// Convert to std::time::Duration
    pub const fn as_std(&self) -> StdDuration {
        StdDuration::from_millis(self.milliseconds)
    }
}

impl FromStr for Duration {
    type Err = DurationParseError;

    /// Parse a duration string.
    /// Supported formats: "30s", "5m", "2m30s", "90s"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim().to_ascii_lowercase();
        let number = |part: &str| {
            part.parse::<u64>().map_err(|_| DurationParseError {
                input: s.to_string(),
            })
        };

        let total_secs = if let Some(minutes) = input.strip_suffix('m') {
            number(minutes)? * 60
        } else if let Some(rest) = input.strip_suffix('s') {
            match rest.split_once('m') {
                Some((minutes, seconds)) => number(minutes)? * 60 + number(seconds)?,
                None => number(rest)?,
            }
        } else {
            return Err(DurationParseError {
                input: s.to_string(),
            });
        };

        if total_secs == 0 {
            return Err(DurationParseError {
                input: s.to_string(),
            });
        }

        Ok(Self::from_secs(total_secs))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_secs = self.as_secs();
        match (total_secs / 60, total_secs % 60) {
            (0, seconds) => write!(f, "{}s", seconds),
            (minutes, 0) => write!(f, "{}m", minutes),
            (minutes, seconds) => write!(f, "{}m{}s", minutes, seconds),
        }
    }
}
