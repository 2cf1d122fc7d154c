//! The fixed set of activities a day is split into, together with the amount of time per day that
//! is considered healthy for each of them.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::tracking::error::TrackingError;

/// Inclusive range of minutes per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinuteRange {
    pub min: u32,
    pub max: u32,
}

impl MinuteRange {
    const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, minutes: u32) -> bool {
        self.min <= minutes && minutes <= self.max
    }

    pub fn min_hours(&self) -> f64 {
        self.min as f64 / 60.
    }

    pub fn max_hours(&self) -> f64 {
        self.max as f64 / 60.
    }
}

/// Activity categories known to the application. The set is closed, anything that can't be parsed
/// into one of these is rejected with [TrackingError::InvalidCategory].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActivityCategory {
    Academic,
    Sport,
    Entertainment,
    ExtraActivity,
    Sleep,
    HealthHygiene,
}

impl ActivityCategory {
    /// Every category in catalog order. Recommendations and comparisons are produced in this order.
    pub const ALL: [ActivityCategory; 6] = [
        ActivityCategory::Academic,
        ActivityCategory::Sport,
        ActivityCategory::Entertainment,
        ActivityCategory::ExtraActivity,
        ActivityCategory::Sleep,
        ActivityCategory::HealthHygiene,
    ];

    pub const fn recommended(&self) -> MinuteRange {
        match self {
            ActivityCategory::Academic => MinuteRange::new(360, 480),
            ActivityCategory::Sport => MinuteRange::new(60, 120),
            ActivityCategory::Entertainment => MinuteRange::new(60, 120),
            ActivityCategory::ExtraActivity => MinuteRange::new(60, 120),
            ActivityCategory::Sleep => MinuteRange::new(420, 540),
            ActivityCategory::HealthHygiene => MinuteRange::new(30, 60),
        }
    }

    /// Name shown to the user.
    pub const fn display_name(&self) -> &'static str {
        match self {
            ActivityCategory::Academic => "Academic",
            ActivityCategory::Sport => "Sport",
            ActivityCategory::Entertainment => "Entertainment",
            ActivityCategory::ExtraActivity => "Extra Activity",
            ActivityCategory::Sleep => "Sleep",
            ActivityCategory::HealthHygiene => "Health / Hygiene",
        }
    }

    /// Stable identifier used on the command line.
    pub const fn key(&self) -> &'static str {
        match self {
            ActivityCategory::Academic => "academic",
            ActivityCategory::Sport => "sport",
            ActivityCategory::Entertainment => "entertainment",
            ActivityCategory::ExtraActivity => "extra-activity",
            ActivityCategory::Sleep => "sleep",
            ActivityCategory::HealthHygiene => "health-hygiene",
        }
    }
}

impl Display for ActivityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Accepts the key (`extra-activity`), the variant name (`ExtraActivity`) or the display name
/// (`Extra Activity`), ignoring case.
impl FromStr for ActivityCategory {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        ActivityCategory::ALL
            .into_iter()
            .find(|category| {
                category
                    .key()
                    .chars()
                    .filter(|c| c.is_alphanumeric())
                    .eq(normalized.chars())
            })
            .ok_or_else(|| TrackingError::InvalidCategory(s.to_string()))
    }
}
