//! # Studyclock Core Library
//!
//! Core logic for studyclock, a personal study-session scheduler. A user
//! keeps named schedules of study and break blocks; the session engine plays
//! the active one block by block, raises alerts at fixed thresholds, and
//! logs every finished or skipped block.
//!
//! ## Architecture
//!
//! - **Session Engine**: a state machine that the host drives by calling
//!   `tick()` once per second; [`timer::runtime`] does this on a tokio task
//! - **Catalog**: schedules per user and the active-schedule pointer
//! - **Storage**: SQLite record store and TOML configuration
//! - **Stats**: read-side aggregation over session records
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: playback state machine
//! - [`ScheduleCatalog`]: schedule CRUD and activation
//! - [`Database`]: schedules, session records, notes and logins
//! - [`Config`]: application configuration management

pub mod catalog;
pub mod error;
pub mod events;
pub mod schedule;
pub mod stats;
pub mod storage;
pub mod timer;

pub use catalog::ScheduleCatalog;
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use schedule::{Block, BlockDraft, BlockKind, Schedule, ScheduleDraft, SchedulePatch};
pub use stats::{DailyMinutes, DaySummary, SubjectStat};
pub use storage::{Config, Database, MemoryLog, Note, SessionLog, SessionRecord};
pub use timer::{
    Alert, AlertKind, AlertSink, Clock, EngineOptions, ManualClock, MutedSink, Phase, SessionEngine,
    Snapshot, SystemClock,
};
