//! Full JSON backup of one user's data.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use studyclock_core::{Database, Note, Schedule, ScheduleCatalog, SessionRecord};

use super::{CmdResult, Context};

#[derive(Serialize)]
struct Backup {
    exported_at: DateTime<Utc>,
    user_id: String,
    active_schedule_id: Option<String>,
    schedules: Vec<Schedule>,
    sessions: Vec<SessionRecord>,
    notes: Vec<Note>,
    logins: Vec<NaiveDate>,
}

pub fn run(ctx: &Context, output: Option<PathBuf>) -> CmdResult {
    let db = Database::open()?;
    let catalog = ScheduleCatalog::new(&db);

    let backup = Backup {
        exported_at: Utc::now(),
        user_id: ctx.user.clone(),
        active_schedule_id: db.active_schedule_id(&ctx.user)?,
        schedules: catalog.list(&ctx.user)?,
        sessions: db.sessions_for_user(&ctx.user)?,
        notes: db.list_notes(&ctx.user)?,
        logins: db.login_dates(&ctx.user)?,
    };
    let json = serde_json::to_string_pretty(&backup)?;

    match output {
        Some(path) => {
            fs::write(&path, &json)?;
            println!(
                "Exported {} schedules and {} sessions to: {}",
                backup.schedules.len(),
                backup.sessions.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}
