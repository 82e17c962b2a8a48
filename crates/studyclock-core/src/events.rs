use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::BlockKind;
use crate::storage::SessionRecord;
use crate::timer::AlertKind;

/// Every accepted engine transition produces an Event.
/// Illegal or out-of-range calls produce none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    BlockStarted {
        index: usize,
        block_id: String,
        kind: BlockKind,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        index: usize,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        index: usize,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// A warning threshold was crossed during a tick.
    WarningRaised {
        index: usize,
        alert: AlertKind,
        at: DateTime<Utc>,
    },
    /// The countdown reached zero.
    BlockCompleted {
        index: usize,
        record: SessionRecord,
        /// Set when the record could not be stored. Playback continues.
        log_error: Option<String>,
        next_index: Option<usize>,
        at: DateTime<Utc>,
    },
    BlockSkipped {
        from_index: usize,
        to_index: Option<usize>,
        record: SessionRecord,
        log_error: Option<String>,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    DurationAdjusted {
        index: usize,
        delta_minutes: i64,
        duration_min: u32,
        remaining_secs: Option<u64>,
        at: DateTime<Utc>,
    },
    BlockSelected {
        index: usize,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// The record carried by completion and skip events.
    pub fn record(&self) -> Option<&SessionRecord> {
        match self {
            Event::BlockCompleted { record, .. } | Event::BlockSkipped { record, .. } => Some(record),
            _ => None,
        }
    }

    pub fn log_error(&self) -> Option<&str> {
        match self {
            Event::BlockCompleted { log_error, .. } | Event::BlockSkipped { log_error, .. } => {
                log_error.as_deref()
            }
            _ => None,
        }
    }
}
