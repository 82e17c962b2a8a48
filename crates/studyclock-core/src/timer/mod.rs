mod alerts;
mod clock;
mod engine;
pub mod runtime;

pub use alerts::{Alert, AlertKind, AlertSink, MutedSink};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{EngineOptions, Phase, SessionEngine, SettleTicket, Snapshot};
