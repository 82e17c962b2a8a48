use chrono::{Local, Utc};
use studyclock_core::timer::runtime::{self, EngineHandle};
use studyclock_core::{
    Alert, AlertSink, CoreError, Database, Event, MutedSink, Phase, ScheduleCatalog, SessionEngine,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{CmdResult, Context};

/// Prints alerts to stderr.
struct ConsoleSink;

impl AlertSink for ConsoleSink {
    fn notify(&self, alert: &Alert) {
        eprintln!("\x07[{}] {}", alert.title(), alert.body());
    }
}

/// One line typed while a schedule is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineCommand {
    Pause,
    Resume,
    Skip,
    Reset,
    Start(usize),
    Select(usize),
    Adjust(i64),
    Reload,
    Status,
    Quit,
}

fn parse_line(line: &str) -> Option<LineCommand> {
    let line = line.trim();
    let (head, arg) = match line.split_once(char::is_whitespace) {
        Some((head, arg)) => (head, Some(arg.trim())),
        None => (line, None),
    };
    let index = || arg.and_then(|a| a.parse::<usize>().ok());

    match head {
        "p" | "pause" => Some(LineCommand::Pause),
        "r" | "resume" => Some(LineCommand::Resume),
        "s" | "skip" => Some(LineCommand::Skip),
        "x" | "reset" => Some(LineCommand::Reset),
        "g" | "go" => index().map(LineCommand::Start),
        "j" | "jump" => index().map(LineCommand::Select),
        "l" | "reload" => Some(LineCommand::Reload),
        "?" | "status" => Some(LineCommand::Status),
        "q" | "quit" => Some(LineCommand::Quit),
        _ if head.starts_with('+') || head.starts_with('-') => {
            head.parse::<i64>().ok().map(LineCommand::Adjust)
        }
        _ => None,
    }
}

fn is_final(event: &Event) -> bool {
    matches!(
        event,
        Event::BlockCompleted { next_index: None, .. } | Event::BlockSkipped { to_index: None, .. }
    )
}

pub fn run(ctx: &Context, from: usize) -> CmdResult {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = rt.block_on(play(ctx, from));
    // A pending stdin read cannot be cancelled; do not wait for it.
    rt.shutdown_background();
    result
}

async fn play(ctx: &Context, from: usize) -> CmdResult {
    let db = Database::open()?;
    let catalog = ScheduleCatalog::new(&db);
    let schedule = catalog.get_active(&ctx.user)?.ok_or(
        "no active schedule (try `studyclock schedule seed` or `studyclock schedule activate <ID>`)",
    )?;
    if schedule.is_empty() {
        return Err(format!("schedule '{}' has no blocks", schedule.name).into());
    }
    if from >= schedule.len() {
        return Err(format!("block index {from} out of range (schedule has {} blocks)", schedule.len()).into());
    }

    db.record_login(&ctx.user, Local::now().date_naive())?;
    let last_run_key = format!("last_run.{}", ctx.user);
    if let Some(last) = db.kv_get(&last_run_key)? {
        eprintln!("last run started {last}");
    }
    db.kv_set(&last_run_key, &Utc::now().to_rfc3339())?;
    eprintln!(
        "playing '{}' ({} blocks, {} min); p/r/s/x, g N, j N, +N/-N, l, ?, q",
        schedule.name,
        schedule.len(),
        schedule.total_minutes()
    );

    let alerts: Box<dyn AlertSink> = if ctx.config.alerts.enabled {
        Box::new(ConsoleSink)
    } else {
        Box::new(MutedSink)
    };
    let engine = SessionEngine::new(&ctx.user, schedule, Box::new(Database::open()?), alerts)
        .with_options(ctx.config.engine_options());
    let (handle, mut events) = runtime::spawn(engine);
    handle.start(from)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => {
                    if !apply(&handle, &catalog, &ctx.user, &line).await? {
                        break;
                    }
                }
                // Keep playing without input, but only while something can still happen.
                None => {
                    stdin_open = false;
                    if !still_playing(&handle).await? {
                        eprintln!("input closed; playback stopped");
                        break;
                    }
                }
            },
            event = events.recv() => match event {
                Some(event) => {
                    if report(&event)? {
                        eprintln!("schedule complete");
                        break;
                    }
                    if !stdin_open && !still_playing(&handle).await? {
                        eprintln!("input closed; playback stopped");
                        break;
                    }
                }
                None => break,
            },
        }
    }

    let engine = handle.shutdown().await?;
    while let Ok(event) = events.try_recv() {
        report(&event)?;
    }
    tracing::debug!(phase = ?engine.phase(), index = engine.active_index(), "playback ended");
    Ok(())
}

/// Whether the engine can still make progress without another command.
async fn still_playing(handle: &EngineHandle) -> Result<bool, CoreError> {
    let phase = handle.snapshot().await?.phase;
    Ok(matches!(phase, Phase::Running | Phase::Settling))
}

/// Print one event as a JSON line. Returns `true` when playback is over.
fn report(event: &Event) -> Result<bool, serde_json::Error> {
    if let Some(error) = event.log_error() {
        eprintln!("warning: session not saved: {error}");
    }
    println!("{}", serde_json::to_string(event)?);
    Ok(is_final(event))
}

/// Forward one input line to the engine. Returns `false` on quit.
async fn apply(
    handle: &EngineHandle,
    catalog: &ScheduleCatalog<'_>,
    user: &str,
    line: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    if line.trim().is_empty() {
        return Ok(true);
    }
    let Some(command) = parse_line(line) else {
        eprintln!("unknown command: {}", line.trim());
        return Ok(true);
    };
    match command {
        LineCommand::Pause => handle.pause()?,
        LineCommand::Resume => handle.resume()?,
        LineCommand::Skip => handle.skip()?,
        LineCommand::Reset => handle.reset()?,
        LineCommand::Start(index) => handle.start(index)?,
        LineCommand::Select(index) => handle.select_block(index)?,
        LineCommand::Adjust(delta) => handle.adjust_duration(delta)?,
        LineCommand::Reload => match catalog.get_active(user)? {
            Some(schedule) if !schedule.is_empty() => {
                eprintln!("loaded '{}' ({} blocks)", schedule.name, schedule.len());
                handle.load_schedule(schedule)?;
            }
            Some(schedule) => eprintln!("schedule '{}' has no blocks; keeping current", schedule.name),
            None => eprintln!("no active schedule; keeping current"),
        },
        LineCommand::Status => {
            let snapshot = handle.snapshot().await?;
            println!("{}", serde_json::to_string(&snapshot)?);
        }
        LineCommand::Quit => return Ok(false),
    }
    Ok(true)
}
