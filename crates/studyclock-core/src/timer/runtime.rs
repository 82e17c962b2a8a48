//! Tokio host for [`SessionEngine`].
//!
//! One task owns the engine. Commands arrive over a channel and are applied
//! in order; a one-second interval drives `tick()` while the engine is
//! running, and the armed settle ticket is waited out with a sleep. Every
//! event the engine returns is forwarded to the event receiver.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, Sleep};
use tracing::{debug, warn};

use super::engine::{Phase, SessionEngine, Snapshot};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::schedule::Schedule;

const TICK: Duration = Duration::from_secs(1);

enum Command {
    Start(usize),
    Pause,
    Resume,
    Skip,
    Reset,
    Adjust(i64),
    Select(usize),
    Load(Box<Schedule>),
    Snapshot(oneshot::Sender<Snapshot>),
    Shutdown(oneshot::Sender<SessionEngine>),
}

/// Control surface for an engine running on a tokio task.
///
/// Control methods only enqueue; their effect shows up on the event
/// receiver returned by [`spawn`].
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

/// Move `engine` onto a new task and return its handle and event stream.
pub fn spawn(engine: SessionEngine) -> (EngineHandle, mpsc::UnboundedReceiver<Event>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(drive(engine, cmd_rx, event_tx));
    (
        EngineHandle {
            commands: cmd_tx,
            task,
        },
        event_rx,
    )
}

impl EngineHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| CoreError::EngineStopped)
    }

    pub fn start(&self, index: usize) -> Result<()> {
        self.send(Command::Start(index))
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(Command::Resume)
    }

    pub fn skip(&self) -> Result<()> {
        self.send(Command::Skip)
    }

    pub fn reset(&self) -> Result<()> {
        self.send(Command::Reset)
    }

    pub fn adjust_duration(&self, delta_minutes: i64) -> Result<()> {
        self.send(Command::Adjust(delta_minutes))
    }

    pub fn select_block(&self, index: usize) -> Result<()> {
        self.send(Command::Select(index))
    }

    /// Replace the schedule being played. The engine resets to block 0.
    pub fn load_schedule(&self, schedule: Schedule) -> Result<()> {
        self.send(Command::Load(Box::new(schedule)))
    }

    pub async fn snapshot(&self) -> Result<Snapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx))?;
        rx.await.map_err(|_| CoreError::EngineStopped)
    }

    /// Stop the task and take the engine back.
    pub async fn shutdown(self) -> Result<SessionEngine> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown(tx))?;
        let engine = rx.await.map_err(|_| CoreError::EngineStopped)?;
        if let Err(e) = self.task.await {
            warn!(error = %e, "engine task did not exit cleanly");
        }
        Ok(engine)
    }
}

struct Timers {
    ticker: Option<(u64, Interval)>,
    settle: Option<(u64, Pin<Box<Sleep>>)>,
}

impl Timers {
    /// Bring the ticker and settle sleep in line with the engine.
    fn sync(&mut self, engine: &SessionEngine) {
        if engine.phase() == Phase::Running {
            let epoch = engine.countdown_epoch();
            if !matches!(self.ticker, Some((current, _)) if current == epoch) {
                self.ticker = Some((epoch, interval_at(Instant::now() + TICK, TICK)));
            }
        } else {
            self.ticker = None;
        }

        match engine.pending_advance() {
            Some(ticket) => {
                if !matches!(self.settle, Some((id, _)) if id == ticket.id) {
                    debug!(ticket = ticket.id, delay_ms = ticket.delay.as_millis() as u64, "settle armed");
                    self.settle = Some((ticket.id, Box::pin(tokio::time::sleep(ticket.delay))));
                }
            }
            None => self.settle = None,
        }
    }
}

async fn next_tick(ticker: &mut Option<(u64, Interval)>) {
    match ticker {
        Some((_, interval)) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

async fn settle_due(settle: &mut Option<(u64, Pin<Box<Sleep>>)>) -> u64 {
    match settle {
        Some((id, sleep)) => {
            sleep.as_mut().await;
            *id
        }
        None => pending().await,
    }
}

async fn drive(
    mut engine: SessionEngine,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<Event>,
) {
    let mut timers = Timers {
        ticker: None,
        settle: None,
    };
    let emit = |event: Option<Event>| {
        if let Some(event) = event {
            // Nobody listening is fine.
            let _ = events.send(event);
        }
    };

    loop {
        timers.sync(&engine);
        tokio::select! {
            command = commands.recv() => {
                let event = match command {
                    None => break,
                    Some(Command::Shutdown(reply)) => {
                        let _ = reply.send(engine);
                        return;
                    }
                    Some(Command::Snapshot(reply)) => {
                        let _ = reply.send(engine.snapshot());
                        None
                    }
                    Some(Command::Start(index)) => engine.start(index),
                    Some(Command::Pause) => engine.pause(),
                    Some(Command::Resume) => engine.resume(),
                    Some(Command::Skip) => engine.skip(),
                    Some(Command::Reset) => engine.reset(),
                    Some(Command::Adjust(delta)) => engine.adjust_duration(delta),
                    Some(Command::Select(index)) => engine.select_block(index),
                    Some(Command::Load(schedule)) => engine.load_schedule(*schedule),
                };
                emit(event);
            }
            _ = next_tick(&mut timers.ticker) => emit(engine.tick()),
            ticket = settle_due(&mut timers.settle) => {
                timers.settle = None;
                emit(engine.settle_elapsed(ticket));
            }
        }
    }
    debug!("engine handle dropped; runtime exiting");
}
