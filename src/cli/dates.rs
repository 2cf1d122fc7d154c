use std::fmt::Display;

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use chrono_english::parse_date_string;
use clap::{CommandFactory, ValueEnum};

use crate::utils::clock::Clock;

use super::Args;

pub const DATE_HELP: &str =
    "Examples are \"today\", \"yesterday\", \"2 days ago\", \"15/03/2025\", \"last friday\"";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

fn validation_error(message: String) -> anyhow::Error {
    Args::command()
        .error(clap::error::ErrorKind::ValueValidation, message)
        .into()
}

/// Parses free form text relative to the wall-clock time of `clock`.
pub fn parse_moment(text: &str, style: DateStyle, now: NaiveDateTime) -> Result<NaiveDateTime> {
    // Times are local wall-clock values, so they are parsed in a zone without offsets.
    parse_date_string(text, now.and_utc(), style.into())
        .map(|v| v.naive_utc())
        .map_err(|e| validation_error(format!("Failed to validate date {text}: {e}")))
}

/// Day referred to by `text`, today when missing.
pub fn parse_day(text: Option<&str>, style: DateStyle, clock: &dyn Clock) -> Result<NaiveDate> {
    match text {
        Some(text) => Ok(parse_moment(text, style, clock.now())?.date()),
        None => Ok(clock.today()),
    }
}

pub fn ensure_ordered(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start > end {
        return Err(validation_error(format!(
            "Start date {start} must be before or equal to end date {end}"
        )));
    }
    Ok(())
}
