use chrono::Local;
use clap::Subcommand;
use studyclock_core::Database;

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum LoginAction {
    /// Record today as a login day
    Record,
    /// List recorded login days
    List,
}

pub fn run(ctx: &Context, action: LoginAction) -> CmdResult {
    let db = Database::open()?;

    match action {
        LoginAction::Record => {
            let today = Local::now().date_naive();
            if db.record_login(&ctx.user, today)? {
                println!("login recorded for {today}");
            } else {
                println!("already recorded for {today}");
            }
        }
        LoginAction::List => {
            let dates = db.login_dates(&ctx.user)?;
            print_json(&dates)?;
        }
    }
    Ok(())
}
