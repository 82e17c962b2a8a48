//! Alerts announced by the session engine.
//!
//! The engine hands every alert to an [`AlertSink`] and moves on. Sinks
//! return nothing and a panicking sink is contained by the engine, so
//! delivery problems never change engine state.

use serde::{Deserialize, Serialize};

use crate::schedule::Block;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertKind {
    SessionStart,
    BreakStart,
    SessionEnd,
    BreakEnd,
    Warning5Min,
    /// Two minutes left, with a preview of the block that follows.
    Warning2MinWithNext { next: String },
    /// Two minutes left in the last block of the schedule.
    Warning2MinFinal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    /// The block the alert is about (the current block).
    pub block: Block,
}

impl Alert {
    pub fn title(&self) -> String {
        match &self.kind {
            AlertKind::SessionStart => "Session Starting".into(),
            AlertKind::BreakStart => "Break Time!".into(),
            AlertKind::SessionEnd => format!("{} Done!", self.block.name),
            AlertKind::BreakEnd => "Break Complete".into(),
            AlertKind::Warning5Min => "5 Minutes Left".into(),
            AlertKind::Warning2MinWithNext { .. } | AlertKind::Warning2MinFinal => "2 Minutes".into(),
        }
    }

    pub fn body(&self) -> String {
        match &self.kind {
            AlertKind::SessionStart | AlertKind::BreakStart => {
                format!("{} - {} minutes", self.block.name, self.block.duration_min)
            }
            AlertKind::SessionEnd => "Great focus. Keep it up!".into(),
            AlertKind::BreakEnd => "Ready to study again!".into(),
            AlertKind::Warning5Min => format!("{} ending soon", self.block.name),
            AlertKind::Warning2MinWithNext { next } => format!("Next: {next}"),
            AlertKind::Warning2MinFinal => "Final session ending soon".into(),
        }
    }
}

/// Best-effort announcement channel (sound, speech, notification).
pub trait AlertSink: Send {
    fn notify(&self, alert: &Alert);
}

/// Drops every alert. Used when alerts are disabled in config.
#[derive(Debug, Clone, Copy, Default)]
pub struct MutedSink;

impl AlertSink for MutedSink {
    fn notify(&self, _alert: &Alert) {}
}
