pub mod dates;
pub mod output;

use std::{io::IsTerminal, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use dates::{ensure_ordered, parse_day, parse_moment, DateStyle, DATE_HELP};
use serde::Serialize;
use tracing::{debug, level_filters::LevelFilter};

use crate::{
    analysis::{
        aggregation::DateSpan,
        recommendation::{sort_by_priority, Recommendation},
        summary::Coach,
    },
    catalog::ActivityCategory,
    storage::{file_store::FileSessionStore, SessionStore},
    tracking::{session::UserId, SessionTracker},
    utils::{
        clock::{Clock, DefaultClock, FixedClock},
        dir::{create_application_default_path, create_application_path, sessions_dir},
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "daybalance", version, long_about = None)]
#[command(
    about = "Tracks how your day is split between activities and how it compares to a healthy balance",
    long_about = None
)]
pub struct Args {
    #[command(subcommand)]
    command: Commands,
    #[arg(
        long,
        global = true,
        env = "DAYBALANCE_DIR",
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "DAYBALANCE_USER",
        default_value_t = 1,
        help = "User the command acts for"
    )]
    user: UserId,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
    #[arg(long, global = true, help = "Print results as JSON")]
    json: bool,
    #[arg(
        long,
        global = true,
        default_value_t = DateStyle::Uk,
        help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year"
    )]
    date_style: DateStyle,
    #[arg(
        long,
        global = true,
        help = "Pretend the current time is this moment. Useful for entering sessions after the fact, for example \"1 hour ago\""
    )]
    at: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Start tracking an activity. A running activity is stopped first")]
    Start {
        #[arg(help = "Activity category, for example \"sport\" or \"extra-activity\"")]
        category: String,
    },
    #[command(about = "Stop the running activity")]
    Stop {},
    #[command(about = "Show the running activity")]
    Status {},
    #[command(about = "List activity categories with their recommended time per day")]
    Categories {},
    #[command(about = "Usage of a day compared with recommended ranges")]
    Day {
        #[arg(long, help = DATE_HELP)]
        date: Option<String>,
    },
    #[command(about = "Recommendations and productivity score of a day")]
    Recommend {
        #[arg(long, help = DATE_HELP)]
        date: Option<String>,
    },
    #[command(about = "Totals and daily averages of the 7 days ending with a date")]
    Week {
        #[arg(long, help = DATE_HELP)]
        end: Option<String>,
    },
    #[command(about = "Totals and daily averages of a calendar month")]
    Month {
        #[arg(long, help = "Any day of the month. Defaults to the current month")]
        date: Option<String>,
    },
    #[command(about = "Report of every completed session in a period")]
    Report {
        #[arg(long, help = DATE_HELP)]
        start: String,
        #[arg(long, help = DATE_HELP)]
        end: String,
        #[arg(long, default_value_t = ReportFormat::Txt)]
        format: ReportFormat,
        #[arg(long, short, help = "Write the report into a file instead of the console")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Txt,
    Csv,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Txt => write!(f, "txt"),
            ReportFormat::Csv => write!(f, "csv"),
        }
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let application_path = match &args.dir {
        Some(dir) => create_application_path(dir.clone())?,
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &application_path, logging_level, args.log)?;

    let clock: Box<dyn Clock> = match &args.at {
        Some(at) => Box::new(FixedClock(parse_moment(at, args.date_style, DefaultClock.now())?)),
        None => Box::new(DefaultClock),
    };

    let store = Arc::new(FileSessionStore::new(sessions_dir(&application_path))?);
    let colored = !args.json && std::io::stdout().is_terminal();
    let context = CommandContext::new(store, clock, &args, colored);

    let output = context.execute(args.command).await?;
    print!("{output}");
    Ok(())
}

/// Everything a command needs to run.
struct CommandContext<S> {
    user_id: UserId,
    tracker: SessionTracker<S>,
    coach: Coach<S>,
    clock: Box<dyn Clock>,
    date_style: DateStyle,
    json: bool,
    colored: bool,
}

#[derive(Serialize)]
struct RecommendOutput<'a> {
    recommendations: &'a [Recommendation],
    score: u32,
}

fn to_json(value: &impl Serialize) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)? + "\n")
}

impl<S: SessionStore + Clone> CommandContext<S> {
    fn new(store: S, clock: Box<dyn Clock>, args: &Args, colored: bool) -> Self {
        Self {
            user_id: args.user,
            tracker: SessionTracker::new(store.clone()),
            coach: Coach::new(store),
            clock,
            date_style: args.date_style,
            json: args.json,
            colored,
        }
    }

    fn day(&self, text: Option<&str>) -> Result<NaiveDate> {
        parse_day(text, self.date_style, self.clock.as_ref())
    }

    /// Runs a command and returns what should be shown to the user.
    async fn execute(&self, command: Commands) -> Result<String> {
        debug!("Executing {command:?} for user {}", self.user_id);
        let user_id = self.user_id;

        match command {
            Commands::Start { category } => {
                let session = self.tracker.start(user_id, &category, self.clock.now()).await?;
                self.render(&session, |v| format!("{}\n", v.tracking_status()))
            }
            Commands::Stop {} => {
                let session = self.tracker.stop(user_id, self.clock.now()).await?;
                self.render(&session, |v| format!("{}\n", v.tracking_status()))
            }
            Commands::Status {} => {
                let active = self.tracker.active_session(user_id).await?;
                self.render(&active, |v| format!("{}\n", output::status_view(v.as_ref())))
            }
            Commands::Categories {} => {
                if self.json {
                    let categories = ActivityCategory::ALL
                        .into_iter()
                        .map(|v| {
                            let range = v.recommended();
                            serde_json::json!({
                                "category": v,
                                "name": v.display_name(),
                                "min_minutes": range.min,
                                "max_minutes": range.max,
                            })
                        })
                        .collect::<Vec<_>>();
                    to_json(&categories)
                } else {
                    Ok(output::categories_view())
                }
            }
            Commands::Day { date } => {
                let summary = self
                    .coach
                    .daily_summary(user_id, self.day(date.as_deref())?)
                    .await?;
                self.render(&summary, |v| output::daily_view(v, self.colored))
            }
            Commands::Recommend { date } => {
                let summary = self
                    .coach
                    .daily_summary(user_id, self.day(date.as_deref())?)
                    .await?;
                let mut recommendations = summary.recommendations;
                sort_by_priority(&mut recommendations);
                let result = RecommendOutput {
                    recommendations: &recommendations,
                    score: summary.score,
                };
                self.render(&result, |v| {
                    output::recommendations_view(v.recommendations, v.score, self.colored)
                })
            }
            Commands::Week { end } => {
                let span = DateSpan::week_ending(self.day(end.as_deref())?);
                let totals = self.coach.range_summary(user_id, span).await?;
                self.render(&totals, output::range_view)
            }
            Commands::Month { date } => {
                let date = self.day(date.as_deref())?;
                let span = DateSpan::month(date.year(), date.month())
                    .ok_or_else(|| anyhow!("Can't build the month of {date}"))?;
                let totals = self.coach.range_summary(user_id, span).await?;
                self.render(&totals, output::range_view)
            }
            Commands::Report {
                start,
                end,
                format,
                output: destination,
            } => {
                let start = self.day(Some(&start))?;
                let end = self.day(Some(&end))?;
                ensure_ordered(start, end)?;

                let span = DateSpan::new(start, end);
                let sessions = self.coach.sessions(user_id, span).await?;
                let report = match format {
                    ReportFormat::Txt => output::report::text_report(
                        user_id,
                        span,
                        self.clock.today(),
                        &sessions,
                    ),
                    ReportFormat::Csv => output::report::csv_report(&sessions),
                };

                match destination {
                    Some(path) => {
                        tokio::fs::write(&path, report).await?;
                        Ok(format!("Report written to {}\n", path.display()))
                    }
                    None => Ok(report),
                }
            }
        }
    }

    fn render<T: Serialize>(&self, value: &T, view: impl FnOnce(&T) -> String) -> Result<String> {
        if self.json {
            to_json(value)
        } else {
            Ok(view(value))
        }
    }
}
