//! Compares usage of a day with the recommended ranges of [ActivityCategory] and turns deviations
//! into recommendations and a productivity score.

use std::fmt::Display;

use chrono::NaiveDate;
use serde::Serialize;

use crate::{catalog::ActivityCategory, tracking::session::UserId};

use super::aggregation::DailyUsage;

/// Academic time above this many minutes gets an additional reminder to take breaks.
pub const LONG_SESSION_MINUTES: u32 = 480;

/// Points deducted per 30 minutes of deviation.
const POINTS_PER_HALF_HOUR: f64 = 5.;
const MAX_DEDUCTION_PER_CATEGORY: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageStatus {
    Low,
    Optimal,
    High,
}

impl Display for UsageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UsageStatus::Low => write!(f, "LOW"),
            UsageStatus::Optimal => write!(f, "OPTIMAL"),
            UsageStatus::High => write!(f, "HIGH"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub category: ActivityCategory,
    pub actual_minutes: u32,
    pub recommended_min: u32,
    pub recommended_max: u32,
    pub status: UsageStatus,
    /// Distance to the closest bound of the range. 0 when optimal.
    pub difference_minutes: u32,
}

impl Comparison {
    pub fn actual_hours(&self) -> f64 {
        self.actual_minutes as f64 / 60.
    }

    pub fn difference_hours(&self) -> f64 {
        self.difference_minutes as f64 / 60.
    }

    pub fn recommended_min_hours(&self) -> f64 {
        self.recommended_min as f64 / 60.
    }

    pub fn recommended_max_hours(&self) -> f64 {
        self.recommended_max as f64 / 60.
    }

    pub fn is_low(&self) -> bool {
        self.status == UsageStatus::Low
    }

    pub fn is_high(&self) -> bool {
        self.status == UsageStatus::High
    }

    pub fn is_optimal(&self) -> bool {
        self.status == UsageStatus::Optimal
    }
}

/// Classifies `actual_minutes` against the range of `category`. Both bounds are optimal.
pub fn compare(actual_minutes: u32, category: ActivityCategory) -> Comparison {
    let range = category.recommended();
    let (status, difference_minutes) = if range.contains(actual_minutes) {
        (UsageStatus::Optimal, 0)
    } else if actual_minutes < range.min {
        (UsageStatus::Low, range.min - actual_minutes)
    } else {
        (UsageStatus::High, actual_minutes - range.max)
    };

    Comparison {
        category,
        actual_minutes,
        recommended_min: range.min,
        recommended_max: range.max,
        status,
        difference_minutes,
    }
}

/// Comparison of every catalog category, in catalog order. Missing categories count as 0 minutes.
pub fn compare_all(usage: &DailyUsage) -> Vec<Comparison> {
    ActivityCategory::ALL
        .into_iter()
        .map(|category| compare(usage.minutes(category), category))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationKind {
    LowTime,
    HighTime,
    CriticalSleep,
    BalanceIssue,
    NoSport,
    LongSession,
}

impl Display for RecommendationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RecommendationKind::LowTime => "LOW_TIME",
            RecommendationKind::HighTime => "HIGH_TIME",
            RecommendationKind::CriticalSleep => "CRITICAL_SLEEP",
            RecommendationKind::BalanceIssue => "BALANCE_ISSUE",
            RecommendationKind::NoSport => "NO_SPORT",
            RecommendationKind::LongSession => "LONG_SESSION",
        };
        write!(f, "{name}")
    }
}

/// Ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "LOW"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::High => write!(f, "HIGH"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub user_id: UserId,
    pub text: String,
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub based_on_date: NaiveDate,
}

/// Builds recommendations for a day. Produced fresh on every call, nothing is remembered between
/// calls.
///
/// Order: one LOW_TIME/HIGH_TIME per category out of range (catalog order), CRITICAL_SLEEP,
/// then the cross-category rules BALANCE_ISSUE, NO_SPORT and LONG_SESSION.
pub fn generate(user_id: UserId, usage: &DailyUsage, date: NaiveDate) -> Vec<Recommendation> {
    let comparisons = compare_all(usage);
    let comparison_of = |category: ActivityCategory| {
        comparisons
            .iter()
            .find(|v| v.category == category)
            .cloned()
            .unwrap_or_else(|| compare(0, category))
    };
    let recommendation = |kind, priority, text| Recommendation {
        user_id,
        text,
        kind,
        priority,
        based_on_date: date,
    };

    let mut recommendations = vec![];

    for comparison in &comparisons {
        match comparison.status {
            UsageStatus::Low => recommendations.push(recommendation(
                RecommendationKind::LowTime,
                low_time_priority(comparison.category),
                low_time_text(comparison),
            )),
            UsageStatus::High => recommendations.push(recommendation(
                RecommendationKind::HighTime,
                high_time_priority(comparison.category),
                high_time_text(comparison),
            )),
            UsageStatus::Optimal => {}
        }
    }

    // Emitted next to the LOW_TIME recommendation of sleep, not instead of it.
    let sleep = comparison_of(ActivityCategory::Sleep);
    if sleep.is_low() {
        recommendations.push(recommendation(
            RecommendationKind::CriticalSleep,
            Priority::High,
            critical_sleep_text(&sleep),
        ));
    }

    let academic = comparison_of(ActivityCategory::Academic);
    let entertainment = comparison_of(ActivityCategory::Entertainment);
    if academic.is_low() && entertainment.is_high() {
        recommendations.push(recommendation(
            RecommendationKind::BalanceIssue,
            Priority::High,
            balance_text(&academic, &entertainment),
        ));
    }

    let sport = comparison_of(ActivityCategory::Sport);
    if sport.actual_minutes == 0 {
        recommendations.push(recommendation(
            RecommendationKind::NoSport,
            Priority::Medium,
            no_sport_text(&sport),
        ));
    }

    if academic.actual_minutes > LONG_SESSION_MINUTES {
        recommendations.push(recommendation(
            RecommendationKind::LongSession,
            Priority::Medium,
            long_session_text(&academic),
        ));
    }

    recommendations
}

fn low_time_priority(category: ActivityCategory) -> Priority {
    match category {
        ActivityCategory::Sleep | ActivityCategory::Academic => Priority::High,
        _ => Priority::Medium,
    }
}

fn high_time_priority(category: ActivityCategory) -> Priority {
    match category {
        ActivityCategory::Entertainment => Priority::High,
        _ => Priority::Medium,
    }
}

fn low_time_text(comparison: &Comparison) -> String {
    format!(
        "Your {} time is below the recommended level. You spent {:.1} hours, but the recommended range is {:.1}-{:.1} hours. Try adding {:.1} hours.",
        comparison.category,
        comparison.actual_hours(),
        comparison.recommended_min_hours(),
        comparison.recommended_max_hours(),
        comparison.difference_hours(),
    )
}

fn high_time_text(comparison: &Comparison) -> String {
    format!(
        "Your {} time is above the recommended level. You spent {:.1} hours, but the recommended range is {:.1}-{:.1} hours. Try cutting back by {:.1} hours for a better balance.",
        comparison.category,
        comparison.actual_hours(),
        comparison.recommended_min_hours(),
        comparison.recommended_max_hours(),
        comparison.difference_hours(),
    )
}

fn critical_sleep_text(sleep: &Comparison) -> String {
    format!(
        "CRITICAL: You slept only {:.1} hours, {:.1} hours short of the minimum (recommended range {:.1}-{:.1} hours). Too little sleep hurts your health and your ability to focus. Make getting at least {:.1} hours of sleep tonight a priority.",
        sleep.actual_hours(),
        sleep.difference_hours(),
        sleep.recommended_min_hours(),
        sleep.recommended_max_hours(),
        sleep.recommended_min_hours(),
    )
}

fn balance_text(academic: &Comparison, entertainment: &Comparison) -> String {
    format!(
        "Balance alert: You spent {:.1} hours on entertainment (recommended {:.1}-{:.1} hours) but only {:.1} hours on academics (recommended {:.1}-{:.1} hours). Consider moving some entertainment time to studying.",
        entertainment.actual_hours(),
        entertainment.recommended_min_hours(),
        entertainment.recommended_max_hours(),
        academic.actual_hours(),
        academic.recommended_min_hours(),
        academic.recommended_max_hours(),
    )
}

fn no_sport_text(sport: &Comparison) -> String {
    format!(
        "You haven't logged any sport or exercise ({:.1} hours, recommended range {:.1}-{:.1} hours). Physical activity keeps you healthy and clears your head, so try to fit in at least {:.1} hours of exercise.",
        sport.actual_hours(),
        sport.recommended_min_hours(),
        sport.recommended_max_hours(),
        sport.recommended_min_hours(),
    )
}

fn long_session_text(academic: &Comparison) -> String {
    format!(
        "You've spent {:.1} hours on academic activities, {:.1} hours over the recommended range of {:.1}-{:.1} hours. Take regular breaks to stay focused and avoid burnout, for example 25 minutes of work followed by a 5 minute break.",
        academic.actual_hours(),
        academic.difference_hours(),
        academic.recommended_min_hours(),
        academic.recommended_max_hours(),
    )
}

/// Score between 0 and 100. Every category outside of its range costs 5 points per 30 minutes of
/// deviation, capped at 20 points. Deviations of Sleep and Academic cost double.
pub fn productivity_score(usage: &DailyUsage) -> u32 {
    let deductions: i32 = compare_all(usage)
        .iter()
        .filter(|v| !v.is_optimal())
        .map(|comparison| {
            let deduction = (comparison.difference_minutes as f64 / 30. * POINTS_PER_HALF_HOUR)
                .round() as i32;
            let deduction = deduction.min(MAX_DEDUCTION_PER_CATEGORY);
            match comparison.category {
                ActivityCategory::Sleep | ActivityCategory::Academic => deduction * 2,
                _ => deduction,
            }
        })
        .sum();

    (100 - deductions).clamp(0, 100) as u32
}

/// Most urgent first. Recommendations with the same priority keep their order.
pub fn sort_by_priority(recommendations: &mut [Recommendation]) {
    recommendations.sort_by(|a, b| b.priority.cmp(&a.priority));
}
