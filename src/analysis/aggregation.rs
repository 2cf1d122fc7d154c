use std::collections::BTreeMap;

use chrono::{Days, Months, NaiveDate};
use serde::Serialize;

use crate::{
    catalog::ActivityCategory,
    tracking::{error::TrackingError, session::Session},
};

/// Minutes spent per category. Categories without any time are simply absent and read as 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailyUsage {
    minutes: BTreeMap<ActivityCategory, u32>,
}

impl DailyUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_minutes(values: impl IntoIterator<Item = (ActivityCategory, u32)>) -> Self {
        let mut usage = Self::new();
        for (category, minutes) in values {
            usage.add(category, minutes);
        }
        usage
    }

    /// Builds usage out of category names, as they come from the outside world. Fails on the first
    /// name that isn't part of the catalog.
    pub fn from_named<N: AsRef<str>>(
        values: impl IntoIterator<Item = (N, u32)>,
    ) -> Result<Self, TrackingError> {
        let mut usage = Self::new();
        for (name, minutes) in values {
            usage.add(name.as_ref().parse()?, minutes);
        }
        Ok(usage)
    }

    pub fn add(&mut self, category: ActivityCategory, minutes: u32) {
        let entry = self.minutes.entry(category).or_default();
        *entry = entry.saturating_add(minutes);
    }

    pub fn minutes(&self, category: ActivityCategory) -> u32 {
        self.minutes.get(&category).copied().unwrap_or(0)
    }

    pub fn total_minutes(&self) -> u32 {
        self.minutes.values().fold(0u32, |sum, v| sum.saturating_add(*v))
    }

    pub fn is_empty(&self) -> bool {
        self.minutes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActivityCategory, u32)> + '_ {
        self.minutes.iter().map(|(category, minutes)| (*category, *minutes))
    }
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateSpan {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn day(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    /// The 7 days ending with `end`.
    pub fn week_ending(end: NaiveDate) -> Self {
        let start = end.checked_sub_days(Days::new(6)).unwrap_or(NaiveDate::MIN);
        Self::new(start, end)
    }

    /// Whole calendar month. Returns [None] for an invalid month.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let end = start
            .checked_add_months(Months::new(1))?
            .checked_sub_days(Days::new(1))?;
        Some(Self::new(start, end))
    }

    /// Number of calendar days covered. An inverted span covers nothing.
    pub fn days(&self) -> u32 {
        if self.end < self.start {
            0
        } else {
            (self.end - self.start).num_days() as u32 + 1
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Totals over a span together with the average per calendar day of the span.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeTotals {
    pub span: DateSpan,
    pub totals: DailyUsage,
    pub averages: BTreeMap<ActivityCategory, f64>,
}

impl RangeTotals {
    pub fn total(&self, category: ActivityCategory) -> u32 {
        self.totals.minutes(category)
    }

    pub fn average(&self, category: ActivityCategory) -> f64 {
        self.averages.get(&category).copied().unwrap_or(0.)
    }
}

fn accumulate<'a>(
    sessions: impl IntoIterator<Item = &'a Session>,
    mut include: impl FnMut(&Session) -> bool,
) -> DailyUsage {
    let mut usage = DailyUsage::new();
    for session in sessions {
        if session.is_completed() && include(session) {
            usage.add(session.category, session.duration_minutes);
        }
    }
    usage
}

/// Sums completed sessions that started on `date`. Running sessions and sessions shorter than a
/// minute don't count.
pub fn daily_usage<'a>(
    sessions: impl IntoIterator<Item = &'a Session>,
    date: NaiveDate,
) -> DailyUsage {
    accumulate(sessions, |v| v.session_date == date)
}

/// Sums completed sessions between `start` and `end` inclusive. Averages divide by the length of
/// the span, so days without data pull the average down.
pub fn range_totals<'a>(
    sessions: impl IntoIterator<Item = &'a Session>,
    start: NaiveDate,
    end: NaiveDate,
) -> RangeTotals {
    let span = DateSpan::new(start, end);
    let totals = accumulate(sessions, |v| span.contains(v.session_date));
    let days = span.days();

    let averages = totals
        .iter()
        .map(|(category, minutes)| {
            let average = if days == 0 {
                0.
            } else {
                minutes as f64 / days as f64
            };
            (category, average)
        })
        .collect();

    RangeTotals {
        span,
        totals,
        averages,
    }
}
