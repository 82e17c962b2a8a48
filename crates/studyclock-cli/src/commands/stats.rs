use chrono::{Local, NaiveDate};
use clap::Subcommand;
use serde::Serialize;
use studyclock_core::stats::{self, DaySummary};
use studyclock_core::{Database, SessionRecord};

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's summary and sessions
    Today,
    /// Summary and sessions for one day (YYYY-MM-DD)
    Date { date: NaiveDate },
    /// Sessions between two days, inclusive
    Range { from: NaiveDate, to: NaiveDate },
    /// Study time per subject over a trailing window
    Subjects {
        /// Window length in days (default from config)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Study minutes for each of the last seven days
    Week,
    /// Consecutive login days ending today
    Streak,
}

#[derive(Serialize)]
struct DayReport<'a> {
    #[serde(flatten)]
    summary: DaySummary,
    sessions: Vec<&'a SessionRecord>,
}

fn day_report(records: &[SessionRecord], date: NaiveDate) -> DayReport<'_> {
    DayReport {
        summary: stats::day_summary(records, date),
        sessions: stats::by_date(records, date),
    }
}

pub fn run(ctx: &Context, action: StatsAction) -> CmdResult {
    let db = Database::open()?;
    let today = Local::now().date_naive();

    match action {
        StatsAction::Today => {
            let records = db.sessions_on(&ctx.user, today)?;
            print_json(&day_report(&records, today))?;
        }
        StatsAction::Date { date } => {
            let records = db.sessions_on(&ctx.user, date)?;
            print_json(&day_report(&records, date))?;
        }
        StatsAction::Range { from, to } => {
            let records = db.sessions_between(&ctx.user, from, to)?;
            print_json(&records)?;
        }
        StatsAction::Subjects { days } => {
            let days = days.unwrap_or(ctx.config.stats.subject_window_days);
            let records = db.sessions_for_user(&ctx.user)?;
            print_json(&stats::subject_stats(&records, today, days))?;
        }
        StatsAction::Week => {
            let records = db.sessions_for_user(&ctx.user)?;
            print_json(&stats::daily_study_minutes(&records, today, 7))?;
        }
        StatsAction::Streak => {
            let dates = db.login_dates(&ctx.user)?;
            println!("{}", stats::login_streak(&dates, today));
        }
    }
    Ok(())
}
