//! Lookback periods and bar intervals offered to the user.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How far back a history request reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    OneDay,
    SixMonths,
    TwoYears,
    ThreeYears,
    FiveYears,
}

impl Period {
    /// All periods in the order they are offered.
    pub const ALL: [Period; 5] = [
        Period::OneDay,
        Period::SixMonths,
        Period::TwoYears,
        Period::ThreeYears,
        Period::FiveYears,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Period::OneDay => "1 Day",
            Period::SixMonths => "6 Months",
            Period::TwoYears => "2 Years",
            Period::ThreeYears => "3 Years",
            Period::FiveYears => "5 Years",
        }
    }

    /// Range code understood by the chart API.
    pub fn code(self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::SixMonths => "6mo",
            Period::TwoYears => "2y",
            Period::ThreeYears => "3y",
            Period::FiveYears => "5y",
        }
    }

    /// Intraday minutes for a single day, daily bars otherwise.
    pub fn interval(self) -> Interval {
        match self {
            Period::OneDay => Interval::OneMinute,
            _ => Interval::Daily,
        }
    }

    /// Calendar span covered by the period.
    pub fn span(self) -> Duration {
        match self {
            Period::OneDay => Duration::days(1),
            Period::SixMonths => Duration::days(183),
            Period::TwoYears => Duration::days(2 * 365),
            Period::ThreeYears => Duration::days(3 * 365),
            Period::FiveYears => Duration::days(5 * 365),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = String;

    /// Accepts either the range code ("6mo") or the label ("6 Months").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Period::ALL
            .into_iter()
            .find(|p| p.code().eq_ignore_ascii_case(s) || p.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown period '{s}'"))
    }
}

/// Width of a single bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    OneMinute,
    Daily,
}

impl Interval {
    pub fn code(self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::Daily => "1d",
        }
    }

    /// Smallest range that reliably contains a recent bar at this interval.
    pub(crate) fn latest_range(self) -> &'static str {
        match self {
            Interval::OneMinute => "1d",
            Interval::Daily => "5d",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
