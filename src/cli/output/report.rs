//! Reports over a period of time, either human readable or as CSV for spreadsheets.

use std::fmt::Write;

use chrono::NaiveDate;

use crate::{
    analysis::aggregation::{range_totals, DateSpan},
    tracking::session::{Session, UserId},
    utils::{
        percentage::minutes_percentage,
        time::{format_date, format_minutes, minutes_to_hours},
    },
};

pub const CSV_HEADER: &str =
    "Date,Activity,Start Time,End Time,Duration (minutes),Duration (hours)";

const DOUBLE_RULE: &str =
    "===============================================================";
const RULE: &str = "---------------------------------------------------------------";
const TIME_FORMAT: &str = "%H:%M:%S";

fn end_time(session: &Session) -> String {
    session
        .end_time
        .map(|v| v.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| "Active".into())
}

/// Plain text report of `sessions`. Only completed sessions are listed.
pub fn text_report(
    user_id: UserId,
    span: DateSpan,
    generated: NaiveDate,
    sessions: &[Session],
) -> String {
    let sessions = sessions
        .iter()
        .filter(|v| v.is_completed())
        .collect::<Vec<_>>();

    let mut report = String::new();
    // Writing into a String never fails.
    let _ = write_text_report(&mut report, user_id, span, generated, &sessions);
    report
}

fn write_text_report(
    report: &mut String,
    user_id: UserId,
    span: DateSpan,
    generated: NaiveDate,
    sessions: &[&Session],
) -> std::fmt::Result {
    writeln!(report, "{DOUBLE_RULE}")?;
    writeln!(report, "{:^63}", "DAYBALANCE TIME TRACKING REPORT")?;
    writeln!(report, "{DOUBLE_RULE}")?;
    writeln!(report)?;
    writeln!(report, "User: {user_id}")?;
    writeln!(
        report,
        "Report Period: {} to {}",
        format_date(span.start),
        format_date(span.end)
    )?;
    writeln!(report, "Generated: {}", format_date(generated))?;
    writeln!(report)?;
    writeln!(report, "{RULE}")?;
    writeln!(report)?;

    if sessions.is_empty() {
        writeln!(report, "No activity sessions found for this period.")?;
    } else {
        let totals = range_totals(sessions.iter().copied(), span.start, span.end).totals;
        let grand_total = totals.total_minutes();

        writeln!(report, "SUMMARY STATISTICS:")?;
        writeln!(report, "{RULE}")?;
        writeln!(report, "Total Sessions: {}", sessions.len())?;
        writeln!(
            report,
            "Total Time: {:.1} hours ({grand_total} minutes)",
            minutes_to_hours(grand_total)
        )?;
        writeln!(report)?;
        writeln!(report, "Time by Activity:")?;
        for (category, minutes) in totals.iter() {
            writeln!(
                report,
                "  {:<20}: {:>6.1} hours ({:>6})",
                category.display_name(),
                minutes_to_hours(minutes),
                minutes_percentage(minutes, grand_total).to_string()
            )?;
        }
        writeln!(report)?;
        writeln!(report, "{RULE}")?;
        writeln!(report)?;

        writeln!(report, "DETAILED SESSIONS:")?;
        writeln!(report, "{RULE}")?;
        writeln!(
            report,
            "{:<12} {:<20} {:<10} {:<10} {:<10}",
            "Date", "Activity", "Start", "End", "Duration"
        )?;
        writeln!(report, "{RULE}")?;
        for session in sessions {
            writeln!(
                report,
                "{:<12} {:<20} {:<10} {:<10} {:<10}",
                format_date(session.session_date),
                session.category.display_name(),
                session.start_time.format(TIME_FORMAT).to_string(),
                end_time(session),
                format_minutes(session.duration_minutes)
            )?;
        }
    }

    writeln!(report)?;
    writeln!(report, "{DOUBLE_RULE}")?;
    writeln!(report, "{:^63}", "END OF REPORT")?;
    writeln!(report, "{DOUBLE_RULE}")?;
    Ok(())
}

/// One row per completed session.
pub fn csv_report(sessions: &[Session]) -> String {
    let mut csv = String::new();
    csv.push_str(CSV_HEADER);
    csv.push('\n');
    for session in sessions.iter().filter(|v| v.is_completed()) {
        csv.push_str(&format!(
            "{},{},{},{},{},{:.2}\n",
            format_date(session.session_date),
            session.category.display_name(),
            session.start_time.format(TIME_FORMAT),
            end_time(session),
            session.duration_minutes,
            session.duration_hours()
        ));
    }
    csv
}
