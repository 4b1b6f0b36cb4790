//! # Time-Window Resolver
//!
//! Maps a symbolic range token (`5m`, `1d`, …) to the lower timestamp bound
//! of a "most recent N" window. The bound is computed from the `now` handed
//! in at query-issue time and never cached.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A recent-time-range selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowToken {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "20m")]
    TwentyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "5h")]
    FiveHours,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
    #[serde(rename = "1mo")]
    OneMonth,
}

impl WindowToken {
    pub const ALL: [WindowToken; 8] = [
        Self::OneMinute,
        Self::FiveMinutes,
        Self::TwentyMinutes,
        Self::OneHour,
        Self::FiveHours,
        Self::OneDay,
        Self::OneWeek,
        Self::OneMonth,
    ];

    /// Resolve a raw token. Unknown tokens fall back to one hour.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "1m" => Self::OneMinute,
            "5m" => Self::FiveMinutes,
            "20m" => Self::TwentyMinutes,
            "1h" => Self::OneHour,
            "5h" => Self::FiveHours,
            "1d" => Self::OneDay,
            "1w" => Self::OneWeek,
            "1mo" => Self::OneMonth,
            _ => Self::OneHour,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::TwentyMinutes => "20m",
            Self::OneHour => "1h",
            Self::FiveHours => "5h",
            Self::OneDay => "1d",
            Self::OneWeek => "1w",
            Self::OneMonth => "1mo",
        }
    }

    /// Length of the window. A month is 30 days.
    pub fn duration(&self) -> Duration {
        match self {
            Self::OneMinute => Duration::minutes(1),
            Self::FiveMinutes => Duration::minutes(5),
            Self::TwentyMinutes => Duration::minutes(20),
            Self::OneHour => Duration::hours(1),
            Self::FiveHours => Duration::hours(5),
            Self::OneDay => Duration::days(1),
            Self::OneWeek => Duration::days(7),
            Self::OneMonth => Duration::days(30),
        }
    }

    /// Oldest timestamp still inside the window ending at `now`.
    pub fn lower_bound(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.duration()
    }
}

impl fmt::Display for WindowToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
