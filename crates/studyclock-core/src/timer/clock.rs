//! Time sources for the session engine.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, NaiveDate, Utc};

/// Wall-clock source. Elapsed time and record dates come from here,
/// never from counting ticks.
pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;

    /// Local calendar day, used for the `date` of session records.
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&Local).date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
///
/// `today()` is the UTC date so results do not depend on the host zone.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(chrono::Duration::seconds(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|p| *p.into_inner())
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}
