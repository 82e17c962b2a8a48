//! Session log aggregation.
//!
//! Read-only queries over completed session records: exact day, inclusive
//! date range, per-subject totals, and a few dashboard summaries. Nothing
//! here touches storage; callers pass the records in.

use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::schedule::BlockKind;
use crate::storage::SessionRecord;

/// Study totals for one subject within a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectStat {
    pub subject: String,
    pub sessions: u32,
    pub total_minutes: u64,
}

/// Totals for a single calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub study_minutes: u64,
    pub break_minutes: u64,
    pub study_sessions: u32,
    pub break_sessions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyMinutes {
    pub date: NaiveDate,
    pub minutes: u64,
}

pub fn by_date(records: &[SessionRecord], date: NaiveDate) -> Vec<&SessionRecord> {
    records.iter().filter(|r| r.date == date).collect()
}

/// Records with `start <= date <= end`.
pub fn by_date_range(records: &[SessionRecord], start: NaiveDate, end: NaiveDate) -> Vec<&SessionRecord> {
    records
        .iter()
        .filter(|r| r.date >= start && r.date <= end)
        .collect()
}

/// Per-subject study totals over the last `days` days, largest first.
///
/// The window starts at `today - days` inclusive. Breaks and records
/// without a subject are left out. Ties keep first-seen order.
pub fn subject_stats(records: &[SessionRecord], today: NaiveDate, days: u32) -> Vec<SubjectStat> {
    let cutoff = days_before(today, days);
    let mut stats: Vec<SubjectStat> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in records {
        if record.kind != BlockKind::Study || record.date < cutoff || record.subject.is_empty() {
            continue;
        }
        let slot = *index.entry(record.subject.as_str()).or_insert_with(|| {
            stats.push(SubjectStat {
                subject: record.subject.clone(),
                sessions: 0,
                total_minutes: 0,
            });
            stats.len() - 1
        });
        let stat = &mut stats[slot];
        stat.sessions += 1;
        stat.total_minutes += u64::from(record.actual_minutes);
    }

    stats.sort_by(|a, b| b.total_minutes.cmp(&a.total_minutes));
    stats
}

pub fn day_summary(records: &[SessionRecord], date: NaiveDate) -> DaySummary {
    let mut summary = DaySummary {
        date,
        study_minutes: 0,
        break_minutes: 0,
        study_sessions: 0,
        break_sessions: 0,
    };
    for record in by_date(records, date) {
        let minutes = u64::from(record.actual_minutes);
        match record.kind {
            BlockKind::Study => {
                summary.study_minutes += minutes;
                summary.study_sessions += 1;
            }
            BlockKind::Break => {
                summary.break_minutes += minutes;
                summary.break_sessions += 1;
            }
        }
    }
    summary
}

/// Study minutes per day for the `days` days ending today, oldest first.
/// Days without study are present with zero minutes.
pub fn daily_study_minutes(records: &[SessionRecord], today: NaiveDate, days: u32) -> Vec<DailyMinutes> {
    (0..days)
        .rev()
        .map(|back| {
            let date = days_before(today, back);
            let minutes = records
                .iter()
                .filter(|r| r.date == date && r.kind == BlockKind::Study)
                .map(|r| u64::from(r.actual_minutes))
                .sum();
            DailyMinutes { date, minutes }
        })
        .collect()
}

/// Consecutive login days ending today. Zero if today has no login.
pub fn login_streak(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = today;
    while dates.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

fn days_before(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}
