pub mod config;
pub mod export;
pub mod login;
pub mod note;
pub mod run;
pub mod schedule;
pub mod stats;

use studyclock_core::Config;

/// Resolved global options shared by every subcommand.
pub struct Context {
    pub user: String,
    pub config: Config,
}

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
