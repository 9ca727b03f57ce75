//! Engine options and run parameters
//!
//! Binaries build these from `clap` arguments, which may also come from the
//! environment or a `.env` file.

use crate::error::ConfigError;
use crate::models::Plan;
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_SAFETY_MARGIN: f64 = 0.2;
pub const DEFAULT_TACCESS_DB: &str = "data/taccess.db";
pub const DEFAULT_PREVIEWER_DB: &str = "data/plan_previewer.db";

const DAY_FORMAT: &str = "%Y%m%d";

/// How an interface's bandwidth series is reduced to a single figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BandwidthReduction {
    /// Average of the positive daily peaks, same as in/out
    DailyPeakAverage,
    /// Highest sample over the whole window
    #[default]
    GlobalPeak,
}

impl fmt::Display for BandwidthReduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BandwidthReduction::DailyPeakAverage => write!(f, "daily-peak-average"),
            BandwidthReduction::GlobalPeak => write!(f, "global-peak"),
        }
    }
}

/// How strictly interface names are recognised as LAG groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LagMatching {
    /// `LAG` between `-`/`_` delimiters
    #[default]
    Delimited,
    /// `LAG` anywhere in the name
    Substring,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    pub bandwidth: BandwidthReduction,
    pub lag_matching: LagMatching,
    /// Share of measured bandwidth held back when judging an upgrade
    pub safety_margin: f64,
    /// Lowest plan offered as an upgrade target; the node's lowest plan when unset
    pub base_plan: Option<Plan>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            bandwidth: BandwidthReduction::default(),
            lag_matching: LagMatching::default(),
            safety_margin: DEFAULT_SAFETY_MARGIN,
            base_plan: None,
        }
    }
}

impl EngineOptions {
    pub fn validate(self) -> Result<Self, ConfigError> {
        if !(0.0..1.0).contains(&self.safety_margin) {
            return Err(ConfigError::InvalidSafetyMargin(self.safety_margin));
        }
        Ok(self)
    }
}

/// Inclusive range of telemetry days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl DayRange {
    pub fn parse(firstday: &str, lastday: &str) -> Result<Self, ConfigError> {
        let first = parse_day("firstday", firstday)?;
        let last = parse_day("lastday", lastday)?;
        if first > last {
            return Err(ConfigError::InvertedRange {
                first: firstday.trim().to_string(),
                last: lastday.trim().to_string(),
            });
        }
        Ok(Self { first, last })
    }

    pub fn first_key(&self) -> String {
        self.first.format(DAY_FORMAT).to_string()
    }

    pub fn last_key(&self) -> String {
        self.last.format(DAY_FORMAT).to_string()
    }

    pub fn contains_key(&self, day: &str) -> bool {
        NaiveDate::parse_from_str(day, DAY_FORMAT)
            .map(|d| d >= self.first && d <= self.last)
            .unwrap_or(false)
    }

    pub fn days(&self) -> i64 {
        (self.last - self.first).num_days() + 1
    }
}

impl fmt::Display for DayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.first_key(), self.last_key())
    }
}

fn parse_day(name: &'static str, value: &str) -> Result<NaiveDate, ConfigError> {
    let trimmed = value.trim();
    if trimmed.len() != 8 {
        return Err(ConfigError::InvalidDay {
            name,
            value: value.to_string(),
        });
    }
    NaiveDate::parse_from_str(trimmed, DAY_FORMAT).map_err(|_| ConfigError::InvalidDay {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_range() {
        let range = DayRange::parse("20240101", "20240107").unwrap();
        assert_eq!(range.days(), 7);
        assert_eq!(range.first_key(), "20240101");
        assert!(range.contains_key("20240107"));
        assert!(!range.contains_key("20240108"));
        assert!(!range.contains_key("garbage"));
    }

    #[test]
    fn test_inverted_range() {
        let err = DayRange::parse("20240107", "20240101").unwrap_err();
        assert!(matches!(err, ConfigError::InvertedRange { .. }));
    }

    #[test]
    fn test_malformed_day() {
        let err = DayRange::parse("2024-01-01", "20240107").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDay { name: "firstday", .. }));
        assert!(DayRange::parse("20240101", "20241301").is_err());
    }

    #[test]
    fn test_safety_margin_bounds() {
        assert!(EngineOptions::default().validate().is_ok());

        let options = EngineOptions {
            safety_margin: 1.0,
            ..EngineOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::InvalidSafetyMargin(_))
        ));
    }
}
