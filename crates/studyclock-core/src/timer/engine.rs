//! Session execution engine.
//!
//! The engine is a single-owner state machine over one schedule. It has no
//! internal thread: the host calls `tick()` once per second while the phase
//! is `Running`, and calls `settle_elapsed()` when an armed settle ticket
//! comes due. See `timer::runtime` for a tokio host that does both.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//! Running -(countdown hits 0)-> Settling -(settle delay)-> Running (next block)
//!                            \-> Completed (last block)
//! any -(reset)-> Idle
//! ```
//!
//! Calls that are illegal in the current phase return `None` and change
//! nothing. Completed and skipped blocks produce one session record each;
//! a failed write is reported on the returned event and playback goes on.

use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::alerts::{Alert, AlertKind, AlertSink};
use super::clock::{Clock, SystemClock};
use crate::events::Event;
use crate::schedule::{Block, Schedule};
use crate::storage::{SessionLog, SessionRecord};

/// Remaining seconds at which the first warning fires.
const WARN_FIRST_SECS: u64 = 300;
/// Remaining seconds at which the next-block preview fires.
const WARN_SECOND_SECS: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Running,
    Paused,
    /// Current block finished; waiting out the settle delay before the
    /// next block starts.
    Settling,
    /// Every block of the schedule has been played.
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum AlertKey {
    FiveMinutes,
    TwoMinutes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub settle_delay: Duration,
    /// Floor applied by `adjust_duration`.
    pub min_block_minutes: u32,
    pub auto_advance: bool,
    /// Subtract paused time from `actual_minutes`.
    pub exclude_paused_time: bool,
    pub warn_at_5min: bool,
    pub warn_at_2min: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(3500),
            min_block_minutes: 5,
            auto_advance: true,
            exclude_paused_time: false,
            warn_at_5min: true,
            warn_at_2min: true,
        }
    }
}

/// Handle for an armed auto-advance. Only the most recent ticket is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleTicket {
    pub id: u64,
    pub delay: Duration,
}

/// Read-only view of the engine for the host UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub phase: Phase,
    pub active_index: usize,
    /// `None` until a block is started or selected.
    pub remaining_secs: Option<u64>,
    pub current_block: Option<Block>,
    pub block_count: usize,
    pub schedule_id: String,
    /// Time spent paused in the current block instance.
    pub paused_secs: u64,
}

#[derive(Debug, Clone)]
struct RunState {
    active_index: usize,
    remaining_secs: Option<u64>,
    phase: Phase,
    fired_alerts: BTreeSet<AlertKey>,
    started_at: Option<DateTime<Utc>>,
    paused_at: Option<DateTime<Utc>>,
    paused_total: chrono::Duration,
}

impl RunState {
    fn idle() -> Self {
        Self {
            active_index: 0,
            remaining_secs: None,
            phase: Phase::Idle,
            fired_alerts: BTreeSet::new(),
            started_at: None,
            paused_at: None,
            paused_total: chrono::Duration::zero(),
        }
    }

    fn staged(index: usize, block: &Block) -> Self {
        Self {
            active_index: index,
            remaining_secs: Some(block.duration_secs()),
            ..Self::idle()
        }
    }

    fn paused_until(&self, now: DateTime<Utc>) -> chrono::Duration {
        let current = self
            .paused_at
            .map(|at| now - at)
            .unwrap_or_else(chrono::Duration::zero);
        self.paused_total + current
    }
}

/// Plays one schedule block by block.
pub struct SessionEngine {
    user_id: String,
    schedule: Schedule,
    options: EngineOptions,
    run: RunState,
    clock: Box<dyn Clock>,
    log: Box<dyn SessionLog + Send>,
    alerts: Box<dyn AlertSink>,
    pending_advance: Option<SettleTicket>,
    next_ticket: u64,
    countdown_epoch: u64,
}

impl SessionEngine {
    /// Create an idle engine on block 0 with the system clock and default options.
    pub fn new(
        user_id: &str,
        schedule: Schedule,
        log: Box<dyn SessionLog + Send>,
        alerts: Box<dyn AlertSink>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            schedule,
            options: EngineOptions::default(),
            run: RunState::idle(),
            clock: Box::new(SystemClock),
            log,
            alerts,
            pending_advance: None,
            next_ticket: 0,
            countdown_epoch: 0,
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.run.phase
    }

    pub fn active_index(&self) -> usize {
        self.run.active_index
    }

    pub fn remaining_secs(&self) -> Option<u64> {
        self.run.remaining_secs
    }

    pub fn current_block(&self) -> Option<&Block> {
        self.schedule.block(self.run.active_index)
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// The armed auto-advance, if any.
    pub fn pending_advance(&self) -> Option<SettleTicket> {
        self.pending_advance
    }

    /// Bumped whenever a countdown (re)starts; a host replaces its ticker
    /// when this changes.
    pub fn countdown_epoch(&self) -> u64 {
        self.countdown_epoch
    }

    pub fn snapshot(&self) -> Snapshot {
        let paused = self.run.paused_until(self.clock.now());
        Snapshot {
            phase: self.run.phase,
            active_index: self.run.active_index,
            remaining_secs: self.run.remaining_secs,
            current_block: self.current_block().cloned(),
            block_count: self.schedule.len(),
            schedule_id: self.schedule.id.clone(),
            paused_secs: paused.num_seconds().max(0) as u64,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start block `index` from its full duration.
    pub fn start(&mut self, index: usize) -> Option<Event> {
        let block = self.schedule.block(index)?.clone();
        self.cancel_settle();
        let now = self.clock.now();
        self.run = RunState {
            phase: Phase::Running,
            started_at: Some(now),
            ..RunState::staged(index, &block)
        };
        self.countdown_epoch += 1;

        let kind = if block.is_break() {
            AlertKind::BreakStart
        } else {
            AlertKind::SessionStart
        };
        self.raise(kind, &block);
        info!(index, block = %block.id, minutes = block.duration_min, "block started");

        Some(Event::BlockStarted {
            index,
            block_id: block.id.clone(),
            kind: block.kind,
            duration_secs: block.duration_secs(),
            at: now,
        })
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> Option<Event> {
        if self.run.phase != Phase::Running {
            return None;
        }
        let remaining = self.run.remaining_secs?;
        if remaining == 0 {
            return self.complete();
        }

        let next = remaining - 1;
        self.run.remaining_secs = Some(next);
        if next == 0 {
            return self.complete();
        }

        if next == WARN_FIRST_SECS && self.run.fired_alerts.insert(AlertKey::FiveMinutes) {
            return self.warn(AlertKind::Warning5Min, self.options.warn_at_5min);
        }
        if next == WARN_SECOND_SECS && self.run.fired_alerts.insert(AlertKey::TwoMinutes) {
            let kind = match self.schedule.next_block(self.run.active_index) {
                Some(upcoming) => AlertKind::Warning2MinWithNext {
                    next: upcoming.name.clone(),
                },
                None => AlertKind::Warning2MinFinal,
            };
            return self.warn(kind, self.options.warn_at_2min);
        }
        None
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.run.phase != Phase::Running {
            return None;
        }
        let now = self.clock.now();
        self.run.phase = Phase::Paused;
        self.run.paused_at = Some(now);
        let remaining_secs = self.run.remaining_secs.unwrap_or(0);
        debug!(index = self.run.active_index, remaining_secs, "paused");
        Some(Event::TimerPaused {
            index: self.run.active_index,
            remaining_secs,
            at: now,
        })
    }

    /// Continue from the frozen countdown. `started_at` is kept, so the
    /// pause counts toward elapsed time unless `exclude_paused_time` is set.
    pub fn resume(&mut self) -> Option<Event> {
        if self.run.phase != Phase::Paused {
            return None;
        }
        let now = self.clock.now();
        if let Some(at) = self.run.paused_at.take() {
            self.run.paused_total = self.run.paused_total + (now - at);
        }
        self.run.phase = Phase::Running;
        self.countdown_epoch += 1;
        let remaining_secs = self.run.remaining_secs.unwrap_or(0);
        debug!(index = self.run.active_index, remaining_secs, "resumed");
        Some(Event::TimerResumed {
            index: self.run.active_index,
            remaining_secs,
            at: now,
        })
    }

    /// Log the elapsed part of the current block and start the next one.
    pub fn skip(&mut self) -> Option<Event> {
        if !matches!(self.run.phase, Phase::Running | Phase::Paused) {
            return None;
        }
        let from_index = self.run.active_index;
        let block = self.schedule.block(from_index)?.clone();
        let now = self.clock.now();
        let (record, log_error) = self.emit_record(&block, now);
        self.cancel_settle();

        let to_index = if from_index + 1 < self.schedule.len() {
            self.start(from_index + 1);
            Some(from_index + 1)
        } else {
            self.run.phase = Phase::Completed;
            self.run.remaining_secs = Some(0);
            self.run.started_at = None;
            self.run.paused_at = None;
            info!("schedule completed by skip");
            None
        };
        info!(from_index, ?to_index, actual = record.actual_minutes, "block skipped");

        Some(Event::BlockSkipped {
            from_index,
            to_index,
            record,
            log_error,
            at: now,
        })
    }

    /// Back to block 0, idle. In-flight time is discarded without a record.
    pub fn reset(&mut self) -> Option<Event> {
        self.cancel_settle();
        self.run = RunState::idle();
        self.countdown_epoch += 1;
        info!("engine reset");
        Some(Event::TimerReset {
            at: self.clock.now(),
        })
    }

    /// Change the current block's planned minutes by `delta_minutes`.
    ///
    /// The duration never drops below `min_block_minutes`. A live or paused
    /// countdown moves by the same amount, floored at zero; the next tick
    /// then completes the block.
    pub fn adjust_duration(&mut self, delta_minutes: i64) -> Option<Event> {
        let index = self.run.active_index;
        let floor = i64::from(self.options.min_block_minutes.max(1));
        let block = self.schedule.blocks.get_mut(index)?;
        let duration = i64::from(block.duration_min)
            .saturating_add(delta_minutes)
            .clamp(floor, i64::from(u32::MAX));
        block.duration_min = duration as u32;
        let duration_min = block.duration_min;

        match (self.run.phase, self.run.remaining_secs) {
            (Phase::Running | Phase::Paused, Some(remaining)) => {
                let shifted = (remaining as i64).saturating_add(delta_minutes.saturating_mul(60));
                self.run.remaining_secs = Some(shifted.max(0) as u64);
            }
            (Phase::Idle, Some(_)) => {
                self.run.remaining_secs = Some(u64::from(duration_min) * 60);
            }
            _ => {}
        }
        debug!(index, delta_minutes, duration_min, remaining = ?self.run.remaining_secs, "duration adjusted");

        Some(Event::DurationAdjusted {
            index,
            delta_minutes,
            duration_min,
            remaining_secs: self.run.remaining_secs,
            at: self.clock.now(),
        })
    }

    /// Stage block `index` without starting it. Ignored while running.
    pub fn select_block(&mut self, index: usize) -> Option<Event> {
        if self.run.phase == Phase::Running {
            return None;
        }
        let block = self.schedule.block(index)?.clone();
        self.cancel_settle();
        self.run = RunState::staged(index, &block);
        Some(Event::BlockSelected {
            index,
            remaining_secs: block.duration_secs(),
            at: self.clock.now(),
        })
    }

    /// Fire the auto-advance armed under `ticket_id`. Stale tickets are ignored.
    pub fn settle_elapsed(&mut self, ticket_id: u64) -> Option<Event> {
        match self.pending_advance {
            Some(ticket) if ticket.id == ticket_id => {
                self.pending_advance = None;
                self.start(self.run.active_index + 1)
            }
            _ => {
                debug!(ticket_id, "ignoring stale settle ticket");
                None
            }
        }
    }

    /// Swap in another schedule and reset.
    pub fn load_schedule(&mut self, schedule: Schedule) -> Option<Event> {
        self.schedule = schedule;
        self.reset()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete(&mut self) -> Option<Event> {
        let index = self.run.active_index;
        let block = self.schedule.block(index)?.clone();
        let now = self.clock.now();
        let (record, log_error) = self.emit_record(&block, now);
        self.run.remaining_secs = Some(0);

        let end = if block.is_break() {
            AlertKind::BreakEnd
        } else {
            AlertKind::SessionEnd
        };
        self.raise(end, &block);

        let next_index = (index + 1 < self.schedule.len()).then_some(index + 1);
        match next_index {
            Some(_) if self.options.auto_advance => {
                self.run.phase = Phase::Settling;
                self.next_ticket += 1;
                self.pending_advance = Some(SettleTicket {
                    id: self.next_ticket,
                    delay: self.options.settle_delay,
                });
            }
            Some(next) => {
                if let Some(upcoming) = self.schedule.block(next) {
                    self.run = RunState::staged(next, upcoming);
                }
            }
            None => {
                self.run.phase = Phase::Completed;
                info!("schedule completed");
            }
        }
        info!(index, actual = record.actual_minutes, planned = record.planned_minutes, "block completed");

        Some(Event::BlockCompleted {
            index,
            record,
            log_error,
            next_index,
            at: now,
        })
    }

    fn warn(&mut self, kind: AlertKind, enabled: bool) -> Option<Event> {
        if !enabled {
            return None;
        }
        let block = self.current_block()?.clone();
        self.raise(kind.clone(), &block);
        Some(Event::WarningRaised {
            index: self.run.active_index,
            alert: kind,
            at: self.clock.now(),
        })
    }

    fn actual_minutes(&self, now: DateTime<Utc>) -> u32 {
        let Some(started_at) = self.run.started_at else {
            return 0;
        };
        let mut elapsed = now - started_at;
        if self.options.exclude_paused_time {
            elapsed = elapsed - self.run.paused_until(now);
        }
        let ms = elapsed.num_milliseconds().max(0);
        // Round half up to whole minutes.
        u32::try_from((ms + 30_000) / 60_000).unwrap_or(u32::MAX)
    }

    fn emit_record(&mut self, block: &Block, now: DateTime<Utc>) -> (SessionRecord, Option<String>) {
        let record = SessionRecord::for_block(
            &self.user_id,
            &self.schedule.id,
            block,
            self.actual_minutes(now),
            self.clock.today(),
            now,
        );
        match self.log.append_completed_session(&record) {
            Ok(stored) => (stored, None),
            Err(e) => {
                warn!(block = %block.id, error = %e, "failed to store session record");
                (record, Some(e.to_string()))
            }
        }
    }

    fn raise(&self, kind: AlertKind, block: &Block) {
        let alert = Alert {
            kind,
            block: block.clone(),
        };
        let sink = &self.alerts;
        if std::panic::catch_unwind(AssertUnwindSafe(|| sink.notify(&alert))).is_err() {
            warn!(kind = ?alert.kind, "alert sink panicked; ignored");
        }
    }

    fn cancel_settle(&mut self) {
        if let Some(ticket) = self.pending_advance.take() {
            debug!(ticket = ticket.id, "settle cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DatabaseError, Result};
    use crate::schedule::{BlockDraft, ScheduleDraft};
    use crate::storage::MemoryLog;
    use crate::timer::ManualClock;
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingSink {
        seen: Arc<Mutex<Vec<AlertKind>>>,
    }

    impl RecordingSink {
        fn kinds(&self) -> Vec<AlertKind> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl AlertSink for RecordingSink {
        fn notify(&self, alert: &Alert) {
            self.seen.lock().unwrap().push(alert.kind.clone());
        }
    }

    struct PanickingSink;

    impl AlertSink for PanickingSink {
        fn notify(&self, _alert: &Alert) {
            panic!("speaker unplugged");
        }
    }

    struct FailingLog;

    impl SessionLog for FailingLog {
        fn append_completed_session(&mut self, _record: &SessionRecord) -> Result<SessionRecord> {
            Err(DatabaseError::Locked.into())
        }
    }

    struct Rig {
        engine: SessionEngine,
        clock: ManualClock,
        log: MemoryLog,
        sink: RecordingSink,
    }

    impl Rig {
        /// Advance one second and tick, `n` times. Returns the events.
        fn run(&mut self, n: u64) -> Vec<Event> {
            let mut events = Vec::new();
            for _ in 0..n {
                self.clock.advance_secs(1);
                if let Some(e) = self.engine.tick() {
                    events.push(e);
                }
            }
            events
        }

        fn settle(&mut self) -> Option<Event> {
            let ticket = self.engine.pending_advance()?;
            self.clock.advance(chrono::Duration::from_std(ticket.delay).unwrap());
            self.engine.settle_elapsed(ticket.id)
        }
    }

    fn schedule(blocks: Vec<BlockDraft>) -> Schedule {
        Schedule::from_draft(
            "usr",
            ScheduleDraft {
                name: "Plan".into(),
                blocks,
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn rig(blocks: Vec<BlockDraft>) -> Rig {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap());
        let log = MemoryLog::new();
        let sink = RecordingSink::default();
        let engine = SessionEngine::new("usr", schedule(blocks), Box::new(log.clone()), Box::new(sink.clone()))
            .with_clock(Box::new(clock.clone()));
        Rig {
            engine,
            clock,
            log,
            sink,
        }
    }

    fn study(name: &str, min: u32) -> BlockDraft {
        BlockDraft::study(name, "Maths", min)
    }

    #[test]
    fn new_engine_is_idle_on_first_block() {
        let r = rig(vec![study("A", 30)]);
        let snap = r.engine.snapshot();
        assert_eq!(snap.phase, Phase::Idle);
        assert_eq!(snap.active_index, 0);
        assert_eq!(snap.remaining_secs, None);
        assert_eq!(snap.current_block.unwrap().name, "A");
    }

    #[test]
    fn start_sets_countdown_and_announces_kind() {
        let mut r = rig(vec![study("A", 30), BlockDraft::rest("Rest", 10)]);
        assert!(r.engine.start(1).is_some());
        assert_eq!(r.engine.phase(), Phase::Running);
        assert_eq!(r.engine.active_index(), 1);
        assert_eq!(r.engine.remaining_secs(), Some(600));
        r.engine.start(0);
        assert_eq!(r.sink.kinds(), vec![AlertKind::BreakStart, AlertKind::SessionStart]);
    }

    #[test]
    fn start_out_of_range_is_ignored() {
        let mut r = rig(vec![study("A", 30)]);
        assert!(r.engine.start(3).is_none());
        assert_eq!(r.engine.phase(), Phase::Idle);
        assert!(r.sink.kinds().is_empty());
    }

    #[test]
    fn illegal_transitions_are_ignored() {
        let mut r = rig(vec![study("A", 30)]);
        assert!(r.engine.resume().is_none());
        assert!(r.engine.pause().is_none());
        assert!(r.engine.skip().is_none());
        assert!(r.engine.tick().is_none());
        assert_eq!(r.engine.phase(), Phase::Idle);
        assert!(r.log.is_empty());
    }

    #[test]
    fn natural_run_logs_every_block_in_order() {
        let mut r = rig(vec![study("A", 2), BlockDraft::rest("B", 1), study("C", 3)]);
        r.engine.start(0);
        r.run(120);
        assert_eq!(r.engine.phase(), Phase::Settling);
        r.settle();
        r.run(60);
        r.settle();
        r.run(180);

        assert_eq!(r.engine.phase(), Phase::Completed);
        let records = r.log.records();
        let names: Vec<_> = records.iter().map(|rec| rec.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
        for rec in &records {
            assert_eq!(rec.actual_minutes, rec.planned_minutes);
        }
        assert!(r.engine.pending_advance().is_none());
    }

    #[test]
    fn study_then_break_scenario() {
        let mut r = rig(vec![study("Calculus", 45), BlockDraft::rest("Tea Break", 10)]);
        r.engine.start(0);

        let events = r.run(45 * 60 - 300);
        assert_eq!(r.engine.remaining_secs(), Some(300));
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            Event::WarningRaised { alert: AlertKind::Warning5Min, .. }
        ));

        let events = r.run(180);
        assert_eq!(r.engine.remaining_secs(), Some(120));
        assert!(matches!(
            &events[..],
            [Event::WarningRaised { alert: AlertKind::Warning2MinWithNext { next }, .. }] if next == "Tea Break"
        ));

        let events = r.run(120);
        assert_eq!(events.len(), 1);
        let record = events[0].record().unwrap();
        assert_eq!(record.planned_minutes, 45);
        assert_eq!(record.actual_minutes, 45);
        assert_eq!(r.log.len(), 1);
        assert_eq!(r.engine.phase(), Phase::Settling);

        let started = r.settle().unwrap();
        assert!(matches!(started, Event::BlockStarted { index: 1, .. }));
        assert_eq!(r.engine.active_index(), 1);
        assert_eq!(r.engine.remaining_secs(), Some(600));

        assert_eq!(
            r.sink.kinds(),
            vec![
                AlertKind::SessionStart,
                AlertKind::Warning5Min,
                AlertKind::Warning2MinWithNext {
                    next: "Tea Break".into()
                },
                AlertKind::SessionEnd,
                AlertKind::BreakStart,
            ]
        );
    }

    #[test]
    fn final_block_warns_final_and_completes_without_settle() {
        let mut r = rig(vec![study("Only", 6)]);
        r.engine.start(0);
        r.run(360);
        assert_eq!(r.engine.phase(), Phase::Completed);
        assert!(r.engine.pending_advance().is_none());
        assert!(r.sink.kinds().contains(&AlertKind::Warning2MinFinal));
    }

    #[test]
    fn warnings_fire_once_per_block_instance() {
        let mut r = rig(vec![study("A", 10), study("B", 10)]);
        r.engine.start(0);
        r.run(300);
        r.engine.pause();
        r.engine.resume();
        r.run(300);
        let fired = |r: &Rig| {
            r.sink
                .kinds()
                .iter()
                .filter(|k| matches!(k, AlertKind::Warning5Min))
                .count()
        };
        assert_eq!(fired(&r), 1);

        // Restarting the same block is a new instance.
        r.engine.start(0);
        r.run(300);
        assert_eq!(fired(&r), 2);
    }

    #[test]
    fn shrinking_below_thresholds_suppresses_warnings() {
        let mut r = rig(vec![study("A", 10), study("B", 10)]);
        r.engine.start(0);
        r.run(10);
        // 590s left; -8 minutes leaves 110s, below both thresholds.
        r.engine.adjust_duration(-8);
        assert_eq!(r.engine.remaining_secs(), Some(110));
        assert_eq!(r.engine.current_block().unwrap().duration_min, 5);
        r.run(110);
        let kinds = r.sink.kinds();
        assert!(!kinds.iter().any(|k| matches!(
            k,
            AlertKind::Warning5Min | AlertKind::Warning2MinWithNext { .. } | AlertKind::Warning2MinFinal
        )));
        assert_eq!(r.log.len(), 1);
    }

    #[test]
    fn pause_resume_keeps_remaining() {
        let mut r = rig(vec![study("A", 30)]);
        r.engine.start(0);
        r.run(42);
        let before = r.engine.remaining_secs();
        r.engine.pause();
        r.clock.advance_secs(600);
        assert!(r.engine.tick().is_none());
        r.engine.resume();
        assert_eq!(r.engine.remaining_secs(), before);
        assert_eq!(r.engine.phase(), Phase::Running);
    }

    #[test]
    fn pause_time_counts_toward_actual_minutes_by_default() {
        let mut r = rig(vec![study("A", 10), study("B", 10)]);
        r.engine.start(0);
        r.run(300);
        r.engine.pause();
        r.clock.advance_secs(20 * 60);
        r.engine.resume();
        let events = r.run(300);
        let record = events.iter().find_map(Event::record).unwrap();
        assert_eq!(record.planned_minutes, 10);
        assert_eq!(record.actual_minutes, 30);
    }

    #[test]
    fn pause_time_can_be_excluded() {
        let mut r = rig(vec![study("A", 10), study("B", 10)]);
        r.engine = r.engine.with_options(EngineOptions {
            exclude_paused_time: true,
            ..EngineOptions::default()
        });
        r.engine.start(0);
        r.run(300);
        r.engine.pause();
        r.clock.advance_secs(20 * 60);
        assert_eq!(r.engine.snapshot().paused_secs, 20 * 60);
        r.engine.resume();
        let events = r.run(300);
        assert_eq!(events.iter().find_map(Event::record).unwrap().actual_minutes, 10);
    }

    #[test]
    fn reset_discards_in_flight_block() {
        let mut r = rig(vec![study("A", 30), study("B", 30)]);
        r.engine.start(1);
        r.run(600);
        r.engine.pause();
        assert!(r.engine.reset().is_some());
        let snap = r.engine.snapshot();
        assert_eq!(snap.phase, Phase::Idle);
        assert_eq!(snap.active_index, 0);
        assert_eq!(snap.remaining_secs, None);
        assert!(r.log.is_empty());
    }

    #[test]
    fn reset_cancels_armed_settle() {
        let mut r = rig(vec![study("A", 1), study("B", 1)]);
        r.engine.start(0);
        r.run(60);
        let ticket = r.engine.pending_advance().unwrap();
        r.engine.reset();
        assert!(r.engine.pending_advance().is_none());
        assert!(r.engine.settle_elapsed(ticket.id).is_none());
        assert_eq!(r.engine.phase(), Phase::Idle);
        assert_eq!(r.engine.active_index(), 0);
    }

    #[test]
    fn reset_while_running_writes_nothing() {
        let mut r = rig(vec![study("A", 30), study("B", 30)]);
        r.engine.start(1);
        r.run(90);
        assert_eq!(r.engine.phase(), Phase::Running);
        assert!(matches!(r.engine.reset(), Some(Event::TimerReset { .. })));
        assert_eq!(r.engine.phase(), Phase::Idle);
        assert_eq!(r.engine.active_index(), 0);
        assert_eq!(r.engine.remaining_secs(), None);
        assert!(r.log.is_empty());
        assert!(r.run(60).is_empty());
    }

    #[test]
    fn reset_after_completion_keeps_existing_records() {
        let mut r = rig(vec![study("A", 1)]);
        r.engine.start(0);
        r.run(60);
        assert_eq!(r.engine.phase(), Phase::Completed);
        assert_eq!(r.log.len(), 1);

        assert!(r.engine.reset().is_some());
        assert_eq!(r.engine.phase(), Phase::Idle);
        assert_eq!(r.engine.active_index(), 0);
        assert_eq!(r.log.len(), 1);
    }

    #[test]
    fn manual_start_makes_settle_ticket_stale() {
        let mut r = rig(vec![study("A", 1), study("B", 1), study("C", 1)]);
        r.engine.start(0);
        r.run(60);
        let ticket = r.engine.pending_advance().unwrap();
        r.engine.start(2);
        assert!(r.engine.settle_elapsed(ticket.id).is_none());
        assert_eq!(r.engine.active_index(), 2);
        assert_eq!(r.engine.remaining_secs(), Some(60));
    }

    #[test]
    fn skip_logs_partial_time_and_starts_next() {
        let mut r = rig(vec![study("Long", 60), BlockDraft::rest("Rest", 10)]);
        r.engine.start(0);
        r.run(600);
        let event = r.engine.skip().unwrap();
        let record = event.record().unwrap();
        assert_eq!(record.planned_minutes, 60);
        assert_eq!(record.actual_minutes, 10);
        assert!(matches!(event, Event::BlockSkipped { to_index: Some(1), .. }));
        assert_eq!(r.engine.phase(), Phase::Running);
        assert_eq!(r.engine.active_index(), 1);
        assert_eq!(r.engine.remaining_secs(), Some(600));
        assert_eq!(r.log.len(), 1);
    }

    #[test]
    fn skip_while_paused_is_allowed() {
        let mut r = rig(vec![study("A", 30), study("B", 30)]);
        r.engine.start(0);
        r.run(90);
        r.engine.pause();
        assert!(r.engine.skip().is_some());
        assert_eq!(r.log.records()[0].actual_minutes, 2);
    }

    #[test]
    fn skip_last_block_completes_schedule() {
        let mut r = rig(vec![study("A", 30)]);
        r.engine.start(0);
        r.run(30);
        let event = r.engine.skip().unwrap();
        assert!(matches!(event, Event::BlockSkipped { to_index: None, .. }));
        assert_eq!(r.engine.phase(), Phase::Completed);
        assert_eq!(r.log.len(), 1);
        assert!(r.engine.skip().is_none());
    }

    #[test]
    fn large_decrease_completes_on_next_tick_once() {
        let mut r = rig(vec![study("A", 60), study("B", 60)]);
        r.engine.start(0);
        r.run(50 * 60);
        assert_eq!(r.engine.remaining_secs(), Some(600));
        r.engine.adjust_duration(-50);
        assert_eq!(r.engine.remaining_secs(), Some(0));
        assert_eq!(r.engine.current_block().unwrap().duration_min, 10);

        let first = r.engine.tick();
        assert!(matches!(first, Some(Event::BlockCompleted { .. })));
        assert!(r.engine.tick().is_none());
        assert_eq!(r.log.len(), 1);
        assert_eq!(r.log.records()[0].planned_minutes, 10);
    }

    #[test]
    fn adjust_increase_extends_countdown() {
        let mut r = rig(vec![study("A", 30)]);
        r.engine.start(0);
        r.run(60);
        r.engine.adjust_duration(15);
        assert_eq!(r.engine.remaining_secs(), Some(29 * 60 + 15 * 60));
        assert_eq!(r.engine.current_block().unwrap().duration_min, 45);
    }

    #[test]
    fn adjust_while_idle_only_changes_plan() {
        let mut r = rig(vec![study("A", 30)]);
        r.engine.adjust_duration(-10);
        assert_eq!(r.engine.current_block().unwrap().duration_min, 20);
        assert_eq!(r.engine.remaining_secs(), None);
        r.engine.select_block(0);
        r.engine.adjust_duration(5);
        assert_eq!(r.engine.remaining_secs(), Some(25 * 60));
    }

    #[test]
    fn select_block_is_refused_while_running() {
        let mut r = rig(vec![study("A", 30), study("B", 20)]);
        r.engine.start(0);
        assert!(r.engine.select_block(1).is_none());
        r.engine.pause();
        assert!(r.engine.select_block(1).is_some());
        assert_eq!(r.engine.phase(), Phase::Idle);
        assert_eq!(r.engine.active_index(), 1);
        assert_eq!(r.engine.remaining_secs(), Some(1200));
        assert!(r.engine.select_block(9).is_none());
        assert!(r.log.is_empty());
    }

    #[test]
    fn without_auto_advance_next_block_is_staged() {
        let mut r = rig(vec![study("A", 1), study("B", 2)]);
        r.engine = r.engine.with_options(EngineOptions {
            auto_advance: false,
            ..EngineOptions::default()
        });
        r.engine.start(0);
        r.run(60);
        assert_eq!(r.engine.phase(), Phase::Idle);
        assert_eq!(r.engine.active_index(), 1);
        assert_eq!(r.engine.remaining_secs(), Some(120));
        assert!(r.engine.pending_advance().is_none());
    }

    #[test]
    fn disabled_warning_is_not_announced() {
        let mut r = rig(vec![study("A", 10)]);
        r.engine = r.engine.with_options(EngineOptions {
            warn_at_5min: false,
            ..EngineOptions::default()
        });
        r.engine.start(0);
        let events = r.run(300);
        assert!(events.is_empty());
        assert!(!r.sink.kinds().contains(&AlertKind::Warning5Min));
    }

    #[test]
    fn failed_log_write_does_not_stop_playback() {
        let clock = ManualClock::new(Utc::now());
        let mut engine = SessionEngine::new(
            "usr",
            schedule(vec![study("A", 1), study("B", 1)]),
            Box::new(FailingLog),
            Box::new(RecordingSink::default()),
        )
        .with_clock(Box::new(clock.clone()));
        engine.start(0);
        let mut completed = None;
        for _ in 0..60 {
            clock.advance_secs(1);
            if let Some(e) = engine.tick() {
                completed = Some(e);
            }
        }
        let completed = completed.unwrap();
        assert!(completed.log_error().is_some());
        assert_eq!(engine.phase(), Phase::Settling);
        let ticket = engine.pending_advance().unwrap();
        assert!(engine.settle_elapsed(ticket.id).is_some());
        assert_eq!(engine.active_index(), 1);
    }

    #[test]
    fn panicking_sink_is_contained() {
        let clock = ManualClock::new(Utc::now());
        let log = MemoryLog::new();
        let mut engine = SessionEngine::new(
            "usr",
            schedule(vec![study("A", 1)]),
            Box::new(log.clone()),
            Box::new(PanickingSink),
        )
        .with_clock(Box::new(clock.clone()));
        assert!(engine.start(0).is_some());
        for _ in 0..60 {
            clock.advance_secs(1);
            engine.tick();
        }
        assert_eq!(engine.phase(), Phase::Completed);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn load_schedule_resets() {
        let mut r = rig(vec![study("A", 30)]);
        r.engine.start(0);
        r.engine.load_schedule(schedule(vec![study("X", 5), study("Y", 5)]));
        assert_eq!(r.engine.phase(), Phase::Idle);
        assert_eq!(r.engine.schedule().len(), 2);
    }
}
