pub mod report;

use std::fmt::Write;

use ansi_term::Colour;

use crate::{
    analysis::{
        aggregation::RangeTotals,
        recommendation::{Priority, Recommendation, UsageStatus},
        summary::DailySummary,
    },
    catalog::ActivityCategory,
    tracking::session::Session,
    utils::time::{format_date, format_minutes, minutes_to_hours},
};

fn paint(text: String, colour: Colour, colored: bool) -> String {
    if colored {
        colour.bold().paint(text).to_string()
    } else {
        text
    }
}

pub fn paint_priority(priority: Priority, colored: bool) -> String {
    let colour = match priority {
        Priority::High => Colour::Red,
        Priority::Medium => Colour::Yellow,
        Priority::Low => Colour::Green,
    };
    paint(format!("{:<6}", priority.to_string()), colour, colored)
}

fn paint_status(status: UsageStatus, colored: bool) -> String {
    let colour = match status {
        UsageStatus::Low => Colour::Yellow,
        UsageStatus::Optimal => Colour::Green,
        UsageStatus::High => Colour::Red,
    };
    paint(format!("{:<7}", status.to_string()), colour, colored)
}

pub fn status_view(active: Option<&Session>) -> String {
    match active {
        Some(session) => session.tracking_status(),
        None => "No active session".into(),
    }
}

pub fn categories_view() -> String {
    let mut view = String::new();
    for category in ActivityCategory::ALL {
        let range = category.recommended();
        let _ = writeln!(
            view,
            "{:<16}\t{:<16}\t{}-{} minutes\t{:.1}-{:.1} hours",
            category.display_name(),
            category.key(),
            range.min,
            range.max,
            range.min_hours(),
            range.max_hours()
        );
    }
    view
}

pub fn daily_view(summary: &DailySummary, colored: bool) -> String {
    let mut view = String::new();
    let _ = writeln!(view, "{}", format_date(summary.date));
    for comparison in &summary.comparisons {
        let _ = writeln!(
            view,
            "{:<16}\t{:>7}\t{:.1}-{:.1}h\t{}",
            comparison.category.display_name(),
            format_minutes(comparison.actual_minutes),
            comparison.recommended_min_hours(),
            comparison.recommended_max_hours(),
            paint_status(comparison.status, colored),
        );
    }
    let _ = writeln!(
        view,
        "{:<16}\t{:>7}",
        "Total",
        format_minutes(summary.total_minutes)
    );
    let _ = writeln!(view, "Productivity score: {}/100", summary.score);
    view
}

/// Recommendations are expected to be sorted already.
pub fn recommendations_view(
    recommendations: &[Recommendation],
    score: u32,
    colored: bool,
) -> String {
    let mut view = String::new();
    if recommendations.is_empty() {
        let _ = writeln!(view, "Every activity is within its recommended range.");
    }
    for recommendation in recommendations {
        let _ = writeln!(
            view,
            "{}\t{:<14}\t{}",
            paint_priority(recommendation.priority, colored),
            recommendation.kind.to_string(),
            recommendation.text
        );
    }
    let _ = writeln!(view, "Productivity score: {score}/100");
    view
}

pub fn range_view(totals: &RangeTotals) -> String {
    let mut view = String::new();
    let _ = writeln!(
        view,
        "{} to {} ({} days)",
        format_date(totals.span.start),
        format_date(totals.span.end),
        totals.span.days()
    );
    for category in ActivityCategory::ALL {
        let total = totals.total(category);
        let _ = writeln!(
            view,
            "{:<16}\t{:>8}\t{:.1}h/day",
            category.display_name(),
            format_minutes(total),
            totals.average(category) / 60.,
        );
    }
    let _ = writeln!(
        view,
        "{:<16}\t{:>8}\t{:.1}h",
        "Total",
        format_minutes(totals.totals.total_minutes()),
        minutes_to_hours(totals.totals.total_minutes()),
    );
    view
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

    use crate::{
        analysis::{
            aggregation::{range_totals, DailyUsage},
            recommendation::{generate, sort_by_priority, Priority},
            summary::DailySummary,
        },
        catalog::ActivityCategory,
        tracking::session::NewSession,
    };

    use super::{
        categories_view, daily_view, paint_priority, range_view, recommendations_view, status_view,
    };

    const DATE: NaiveDate = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();

    #[test]
    fn test_status_view() {
        assert_eq!(status_view(None), "No active session");

        let start = NaiveDateTime::new(DATE, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        let session = NewSession::new(1, ActivityCategory::Sport, start).into_session(1);
        assert_eq!(
            status_view(Some(&session)),
            "Active - Sport (started at 09:00)"
        );
    }

    #[test]
    fn test_categories_view() {
        let view = categories_view();
        assert_eq!(view.lines().count(), 6);
        assert!(view.contains("Sleep"));
        assert!(view.contains("420-540 minutes\t7.0-9.0 hours"));
    }

    #[test]
    fn test_daily_view() {
        let usage = DailyUsage::from_minutes([(ActivityCategory::Academic, 400)]);
        let view = daily_view(&DailySummary::build(1, DATE, usage), false);

        assert!(view.starts_with("2025-03-15"));
        assert!(view.contains("6h 40m"));
        assert!(view.contains("OPTIMAL"));
        assert!(view.contains("LOW"));
        assert!(view.contains("Productivity score: "));
    }

    #[test]
    fn test_recommendations_view() {
        let mut recommendations = generate(1, &DailyUsage::new(), DATE);
        sort_by_priority(&mut recommendations);
        let view = recommendations_view(&recommendations, 0, false);

        let first = view.lines().next().unwrap();
        assert!(first.starts_with("HIGH"));
        assert!(view.ends_with("Productivity score: 0/100\n"));

        let balanced = recommendations_view(&[], 100, false);
        assert!(balanced.starts_with("Every activity is within its recommended range."));
    }

    #[test]
    fn test_paint_priority() {
        assert_eq!(paint_priority(Priority::Medium, false), "MEDIUM");
        let painted = paint_priority(Priority::High, true);
        assert!(painted.contains("HIGH"));
        assert_ne!(painted, "HIGH  ");
    }

    #[test]
    fn test_range_view() {
        let view = range_view(&range_totals(&[], DATE, DATE));
        assert!(view.starts_with("2025-03-15 to 2025-03-15 (1 days)"));
        assert_eq!(view.lines().count(), 8);
    }
}
