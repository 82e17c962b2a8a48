use std::path::PathBuf;

use clap::{Parser, Subcommand};
use studyclock_core::Config;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "studyclock", version, about = "Study schedule player and session log")]
struct Cli {
    /// User id to act for (defaults to `user_id` in config)
    #[arg(long, global = true)]
    user: Option<String>,
    /// Log engine and storage activity to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the active schedule in the foreground
    Run {
        /// Block index to start from
        #[arg(long, default_value = "0")]
        from: usize,
    },
    /// Schedule management
    Schedule {
        #[command(subcommand)]
        action: commands::schedule::ScheduleAction,
    },
    /// Session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Study notes
    Note {
        #[command(subcommand)]
        action: commands::note::NoteAction,
    },
    /// Login history
    Login {
        #[command(subcommand)]
        action: commands::login::LoginAction,
    },
    /// Write a JSON backup of your schedules, sessions, notes and logins
    Export {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = Config::load_or_default();
    let ctx = commands::Context {
        user: cli.user.unwrap_or_else(|| config.user_id.clone()),
        config,
    };

    let result = match cli.command {
        Commands::Run { from } => commands::run::run(&ctx, from),
        Commands::Schedule { action } => commands::schedule::run(&ctx, action),
        Commands::Stats { action } => commands::stats::run(&ctx, action),
        Commands::Note { action } => commands::note::run(&ctx, action),
        Commands::Login { action } => commands::login::run(&ctx, action),
        Commands::Export { output } => commands::export::run(&ctx, output),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
